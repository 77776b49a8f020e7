use alloy::primitives::Address;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::alert::pagerduty::Severity;
use crate::retry::RetryPolicy;

/// Marker value of `environment` that enables paging.
pub const PRODUCTION: &str = "production";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Deployment environment marker. Pages are only sent when this equals `production`.
    #[serde(default)]
    pub environment: String,
    pub database: DatabaseConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
    pub minter: MinterConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    /// Node endpoint without the credential, e.g. `https://eth-mainnet.alchemyapi.io/v2`.
    pub rpc_http: String,
    #[serde(default)]
    pub rpc_api_key: String,
}

impl ChainConfig {
    /// Full RPC URL with the credential appended as the last path segment.
    pub fn rpc_url(&self) -> String {
        format!("{}/{}", self.rpc_http.trim_end_matches('/'), self.rpc_api_key)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExplorerConfig {
    #[serde(default = "default_explorer_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Maximum number of logs the explorer returns for a single query.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            url: default_explorer_url(),
            api_key: String::new(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_explorer_url() -> String {
    "https://api.etherscan.io/api".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct MinterConfig {
    #[serde(default = "default_minter_name")]
    pub name: String,
    pub address: String,
    /// Block the Minter was deployed in. Log queries start here.
    pub creation_block: u64,
    pub reward_token: TokenConfig,
}

fn default_minter_name() -> String {
    "Minter".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

// ============================================================
// Alert Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    #[serde(default)]
    pub routing_key: String,
    #[serde(default = "default_events_url")]
    pub events_url: String,
    #[serde(default = "default_alert_source")]
    pub source: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            routing_key: String::new(),
            events_url: default_events_url(),
            source: default_alert_source(),
            severity: default_severity(),
        }
    }
}

fn default_events_url() -> String {
    "https://events.pagerduty.com/v2/enqueue".to_string()
}

fn default_alert_source() -> String {
    "minter-runway-monitor".to_string()
}

fn default_severity() -> Severity {
    Severity::Warning
}

// ============================================================
// Retry Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts per upstream call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

// ============================================================
// API & Schedule Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_api_port(),
            host: default_api_host(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// Six-field cron expression (seconds first), evaluated in UTC.
    #[serde(default = "default_cron")]
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
        }
    }
}

fn default_cron() -> String {
    "0 0 0 * * *".to_string()
}

impl Config {
    /// Read the TOML file, overlay secrets from the process environment, and validate.
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment-provided values. Unset or empty variables leave the file value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut String); 5] = [
            ("DATABASE_URL", &mut self.database.url),
            ("RPC_API_KEY", &mut self.chain.rpc_api_key),
            ("EXPLORER_API_KEY", &mut self.explorer.api_key),
            ("PAGERDUTY_ROUTING_KEY", &mut self.alert.routing_key),
            ("APP_ENV", &mut self.environment),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }

    pub fn minter_address(&self) -> eyre::Result<Address> {
        parse_address("minter.address", &self.minter.address)
    }

    pub fn reward_token_address(&self) -> eyre::Result<Address> {
        parse_address("minter.reward_token.address", &self.minter.reward_token.address)
    }

    fn validate(&self) -> eyre::Result<()> {
        let required = [
            ("database.url (DATABASE_URL)", &self.database.url),
            ("chain.rpc_api_key (RPC_API_KEY)", &self.chain.rpc_api_key),
            ("explorer.api_key (EXPLORER_API_KEY)", &self.explorer.api_key),
            ("alert.routing_key (PAGERDUTY_ROUTING_KEY)", &self.alert.routing_key),
            ("environment (APP_ENV)", &self.environment),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(eyre::eyre!("Missing key {} in config", key));
            }
        }

        self.minter_address()?;
        self.reward_token_address()?;

        if self.retry.max_attempts == 0 {
            return Err(eyre::eyre!("retry.max_attempts must be at least 1"));
        }
        if self.explorer.page_size == 0 {
            return Err(eyre::eyre!("explorer.page_size must be at least 1"));
        }
        if self.schedule.cron.trim().is_empty() {
            return Err(eyre::eyre!("schedule.cron must not be empty"));
        }
        Ok(())
    }
}

fn parse_address(key: &str, value: &str) -> eyre::Result<Address> {
    if !value.starts_with("0x") || value.len() != 42 {
        return Err(eyre::eyre!("Invalid address '{}' for {}", value, key));
    }
    Address::from_str(value).map_err(|e| eyre::eyre!("Invalid address '{}' for {}: {}", value, key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const BASE: &str = r#"
environment = "staging"

[database]
url = "postgres://localhost/runway"

[chain]
name = "mainnet"
chain_id = 1
rpc_http = "https://eth-mainnet.alchemyapi.io/v2/"
rpc_api_key = "rpc-key"

[explorer]
api_key = "explorer-key"

[minter]
address = "0x358fE82370a1B9aDaE2E3ad69D6cF9e503c96018"
creation_block = 15000000

[minter.reward_token]
symbol = "SDL"
address = "0xf1Dc500FdE233A4055e25e5BbF516372BC4F6871"

[alert]
routing_key = "routing-key"
"#;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_parse_config() {
        let config = parse(BASE);
        assert_eq!(config.chain.chain_id, 1);
        assert_eq!(config.minter.name, "Minter"); // default
        assert_eq!(config.minter.reward_token.decimals, 18); // default
        assert_eq!(config.explorer.page_size, 1000); // default
        assert_eq!(config.retry.max_attempts, 3); // default
        assert_eq!(config.schedule.cron, "0 0 0 * * *"); // default
        assert_eq!(config.alert.severity, Severity::Warning); // default
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
    }

    #[test]
    fn test_rpc_url_appends_key() {
        let config = parse(BASE);
        assert_eq!(
            config.chain.rpc_url(),
            "https://eth-mainnet.alchemyapi.io/v2/rpc-key"
        );
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = parse(BASE);
        let env: HashMap<&str, &str> = [
            ("APP_ENV", "production"),
            ("EXPLORER_API_KEY", "from-env"),
            ("RPC_API_KEY", ""),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert!(config.is_production());
        assert_eq!(config.explorer.api_key, "from-env");
        // empty variables do not clobber the file value
        assert_eq!(config.chain.rpc_api_key, "rpc-key");
    }

    #[test]
    fn test_validate_missing_secret() {
        let mut config = parse(BASE);
        config.alert.routing_key = String::new();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("PAGERDUTY_ROUTING_KEY"), "{}", err);
    }

    #[test]
    fn test_validate_blank_environment() {
        let mut config = parse(BASE);
        config.environment = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_address() {
        let mut config = parse(BASE);
        config.minter.address = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = parse(BASE);
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
