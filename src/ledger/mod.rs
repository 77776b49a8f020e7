pub mod chain;
pub mod decoder;
pub mod explorer;
pub mod types;

use crate::retry::{RetryError, Transient};

pub type LedgerResult<T> = Result<T, RetryError<LedgerError>>;

/// Failures talking to the node or the block explorer.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("RPC call failed: {0}")]
    Rpc(String),
    #[error("explorer error ({message}): {result}")]
    Explorer {
        message: String,
        result: String,
        rate_limited: bool,
    },
    #[error("malformed log: {0}")]
    MalformedLog(String),
    #[error("block {0} not found")]
    BlockNotFound(String),
    #[error("block {block} holds at least {page_size} matching logs, cannot paginate further")]
    PageOverflow { block: u64, page_size: usize },
}

impl Transient for LedgerError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Status(_) | Self::Rpc(_) => true,
            Self::Explorer { rate_limited, .. } => *rate_limited,
            Self::MalformedLog(_) | Self::BlockNotFound(_) | Self::PageOverflow { .. } => false,
        }
    }
}

impl LedgerError {
    pub fn rpc(err: impl std::fmt::Display) -> Self {
        Self::Rpc(err.to_string())
    }
}
