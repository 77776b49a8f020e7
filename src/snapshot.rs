use alloy::primitives::Address;
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::ledger::types::Block;

/// The durable record of one run. Quantities are decimal strings so no precision is
/// lost on the way to storage or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RunwaySnapshot {
    /// Latest block time in unix milliseconds. Identity of the record.
    #[sqlx(rename = "timestamp_ms")]
    pub timestamp: i64,
    pub chain_id: i64,
    pub contract_address: String,
    pub contract_name: String,
    pub token_ticker: String,
    pub token_address: String,
    pub rate_per_second: String,
    pub current_balance: String,
    /// `None` when the emission rate is zero.
    pub runway_in_seconds: Option<String>,
    pub reward_debt: String,
}

/// What is being monitored, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct MonitoredContract {
    pub chain_id: u64,
    pub contract_address: Address,
    pub contract_name: String,
    pub token_ticker: String,
    pub token_address: Address,
    pub token_decimals: u8,
}

/// Computed figures for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunwayFigures {
    pub rate_per_second: BigUint,
    pub current_balance: BigUint,
    pub runway_in_seconds: Option<BigInt>,
    pub reward_debt: BigInt,
}

impl RunwaySnapshot {
    pub fn build(contract: &MonitoredContract, latest: &Block, figures: &RunwayFigures) -> Self {
        Self {
            timestamp: latest.timestamp as i64 * 1000,
            chain_id: contract.chain_id as i64,
            contract_address: contract.contract_address.to_string(),
            contract_name: contract.contract_name.clone(),
            token_ticker: contract.token_ticker.clone(),
            token_address: contract.token_address.to_string(),
            rate_per_second: figures.rate_per_second.to_string(),
            current_balance: figures.current_balance.to_string(),
            runway_in_seconds: figures.runway_in_seconds.as_ref().map(|r| r.to_string()),
            reward_debt: figures.reward_debt.to_string(),
        }
    }
}
