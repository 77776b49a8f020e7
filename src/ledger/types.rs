use alloy::primitives::{Address, B256};
use num_bigint::BigUint;
use serde::Deserialize;

/// A point on the chain's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    /// Unix seconds.
    pub timestamp: u64,
}

/// Block selector for `get_block`.
#[derive(Debug, Clone, Copy)]
pub enum BlockSelector {
    Latest,
    Number(u64),
}

impl std::fmt::Display for BlockSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A log record as returned by the explorer's `getLogs` action. Every numeric field is
/// a hex string; `logIndex` and `transactionIndex` are sometimes a bare `0x`. The
/// transaction hash and log index identify the record and must be present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    pub log_index: String,
    pub transaction_hash: String,
}

/// An explorer log after hex validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub timestamp: u64,
    pub log_index: u64,
    pub tx_hash: B256,
}

/// The Minter changed its emission rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateChangeEvent {
    pub timestamp: u64,
    pub new_rate_per_second: BigUint,
}

/// A reward token transfer into the Minter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub amount: BigUint,
    pub tx_hash: B256,
    pub log_index: u64,
}
