use alloy::primitives::Address;
use chrono::DateTime;
use num_bigint::BigUint;
use sqlx::PgPool;

use crate::alert::decision::{self, Escalation};
use crate::alert::pagerduty::{PagerDutyClient, Severity};
use crate::config::Config;
use crate::db::repository;
use crate::ledger::chain::ChainClient;
use crate::ledger::explorer::ExplorerClient;
use crate::ledger::types::{Block, BlockSelector};
use crate::runway::calculator::{reward_debt, runway_in_seconds};
use crate::runway::emission::cumulative_used_up;
use crate::runway::inflow::cumulative_filled;
use crate::runway::RunwayError;
use crate::snapshot::{MonitoredContract, RunwayFigures, RunwaySnapshot};
use crate::units::{format_signed_units, format_units};

/// Derive runway and debt from the four measured quantities. A zero emission rate
/// leaves the runway undefined instead of failing the run.
pub fn compute_figures(
    cumulative_used_up: BigUint,
    cumulative_filled: BigUint,
    rate_per_second: BigUint,
    current_balance: BigUint,
) -> Result<RunwayFigures, RunwayError> {
    let runway = match runway_in_seconds(&cumulative_filled, &cumulative_used_up, &rate_per_second) {
        Ok(secs) => Some(secs),
        Err(RunwayError::ZeroEmissionRate) => {
            tracing::warn!("Emission rate is zero, runway is undefined");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(RunwayFigures {
        rate_per_second,
        current_balance,
        runway_in_seconds: runway,
        reward_debt: reward_debt(&cumulative_filled, &cumulative_used_up),
    })
}

/// Everything one run needs: upstream clients, the store, and what is being watched.
/// Holds no state between runs.
pub struct RunwayMonitor {
    chain: ChainClient,
    explorer: ExplorerClient,
    pager: PagerDutyClient,
    pool: PgPool,
    contract: MonitoredContract,
    creation_block: u64,
    is_production: bool,
    severity: Severity,
}

impl RunwayMonitor {
    pub fn init(config: &Config, pool: PgPool) -> eyre::Result<Self> {
        let retry = config.retry.policy();

        let chain = ChainClient::connect(&config.chain.rpc_url(), retry.clone())?;
        let explorer = ExplorerClient::new(&config.explorer, retry.clone())?;
        let pager = PagerDutyClient::new(&config.alert, retry)?;

        let contract = MonitoredContract {
            chain_id: config.chain.chain_id,
            contract_address: config.minter_address()?,
            contract_name: config.minter.name.clone(),
            token_ticker: config.minter.reward_token.symbol.clone(),
            token_address: config.reward_token_address()?,
            token_decimals: config.minter.reward_token.decimals,
        };

        Ok(Self {
            chain,
            explorer,
            pager,
            pool,
            contract,
            creation_block: config.minter.creation_block,
            is_production: config.is_production(),
            severity: config.alert.severity,
        })
    }

    /// Read the chain and explorer and compute this run's figures. Independent reads
    /// are issued together.
    pub async fn measure(&self) -> eyre::Result<(Block, RunwayFigures)> {
        let minter: Address = self.contract.contract_address;
        let token: Address = self.contract.token_address;
        let decimals = self.contract.token_decimals;

        tracing::info!("Get block information");
        let (creation, latest) = tokio::try_join!(
            self.chain.get_block(BlockSelector::Number(self.creation_block)),
            self.chain.get_block(BlockSelector::Latest),
        )?;
        tracing::info!(
            creation = creation.number,
            latest = latest.number,
            latest_time = %DateTime::from_timestamp(latest.timestamp as i64, 0).unwrap_or_default(),
            "Block range resolved"
        );

        tracing::info!("Get explorer and on-chain data");
        let (used_up, filled, rate, balance) = tokio::try_join!(
            async {
                Ok::<_, eyre::Report>(
                    cumulative_used_up(&self.explorer, minter, &creation, &latest).await?,
                )
            },
            async {
                Ok::<_, eyre::Report>(
                    cumulative_filled(&self.explorer, token, minter, &creation, &latest).await?,
                )
            },
            async { Ok::<_, eyre::Report>(self.chain.read_rate(minter).await?) },
            async { Ok::<_, eyre::Report>(self.chain.read_balance(token, minter).await?) },
        )?;

        tracing::info!(
            raw = %used_up,
            amount = %format_units(&used_up, decimals),
            token = %self.contract.token_ticker,
            "Cumulative required by minter"
        );
        tracing::info!(
            raw = %filled,
            amount = %format_units(&filled, decimals),
            token = %self.contract.token_ticker,
            "Cumulative sent to minter"
        );
        tracing::info!(rate = %rate, balance = %balance, "Current minter state");

        let figures = compute_figures(used_up, filled, rate, balance)?;
        tracing::info!(
            runway_in_seconds = ?figures.runway_in_seconds.as_ref().map(|r| r.to_string()),
            reward_debt = %figures.reward_debt,
            reward_debt_amount = %format_signed_units(&figures.reward_debt, decimals),
            "Runway computed"
        );

        Ok((latest, figures))
    }

    /// The scheduled job: measure, alert if the runway is short, persist the snapshot.
    pub async fn run_daily_job(&self) -> eyre::Result<RunwaySnapshot> {
        let (latest, figures) = self.measure().await?;
        let snapshot = RunwaySnapshot::build(&self.contract, &latest, &figures);

        let decision = decision::decide(figures.runway_in_seconds.as_ref(), self.is_production);
        if let Some(runway) = &figures.runway_in_seconds {
            match decision.escalation {
                Escalation::None => {}
                Escalation::LogOnly => {
                    tracing::warn!(
                        runway_in_seconds = %runway,
                        "Runway is less than 1 week, page not sent outside production"
                    );
                }
                Escalation::Page => {
                    tracing::warn!(runway_in_seconds = %runway, "Runway is less than 1 week, sending page");
                    self.pager
                        .trigger(&decision::summary(runway), self.severity)
                        .await?;
                }
            }
        }

        repository::insert_snapshot(&self.pool, &snapshot).await?;
        tracing::info!(timestamp = snapshot.timestamp, "Snapshot saved");

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_traits::Zero;

    use crate::ledger::types::{RateChangeEvent, TransferEvent};
    use crate::runway::emission::RateSchedule;
    use crate::runway::inflow::total_inflow;

    fn u(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_compute_figures() {
        let figures = compute_figures(u(400), u(1_000), u(10), u(600)).unwrap();
        assert_eq!(figures.runway_in_seconds, Some(BigInt::from(60)));
        assert_eq!(figures.reward_debt, BigInt::from(600));
        assert_eq!(figures.current_balance, u(600));
    }

    #[test]
    fn test_zero_rate_leaves_runway_undefined() {
        let figures = compute_figures(u(400), u(1_000), u(0), u(600)).unwrap();
        assert_eq!(figures.runway_in_seconds, None);
        assert_eq!(figures.reward_debt, BigInt::from(600));
    }

    #[test]
    fn test_empty_history_is_all_zero() {
        let latest = Block {
            number: 200,
            timestamp: 5_000,
        };
        let used_up = RateSchedule::from_events(Vec::<RateChangeEvent>::new(), &latest)
            .cumulative_emitted(1_000)
            .unwrap();
        let filled = total_inflow(&Vec::<TransferEvent>::new());

        assert!(used_up.is_zero());
        assert!(filled.is_zero());

        let figures = compute_figures(used_up, filled, u(5), u(0)).unwrap();
        assert!(figures.reward_debt.is_zero());
        assert_eq!(figures.runway_in_seconds, Some(BigInt::from(0)));
    }

    #[test]
    fn test_overspent_minter_alerts() {
        let figures = compute_figures(u(2_000), u(1_000), u(10), u(0)).unwrap();
        assert_eq!(figures.runway_in_seconds, Some(BigInt::from(-100)));
        let decision = decision::decide(figures.runway_in_seconds.as_ref(), true);
        assert_eq!(decision.escalation, Escalation::Page);
    }
}
