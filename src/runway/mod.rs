pub mod calculator;
pub mod emission;
pub mod inflow;

use crate::ledger::LedgerError;
use crate::retry::RetryError;

/// Failures of the runway arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunwayError {
    /// The Minter currently emits nothing, so runway is undefined.
    #[error("emission rate is zero, runway is undefined")]
    ZeroEmissionRate,
    #[error("rate change at {timestamp} precedes the start of the window at {start}")]
    EventBeforeStart { timestamp: u64, start: u64 },
}

/// Failure of one of the aggregate measurements (emitted total or inflow total).
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error(transparent)]
    Ledger(#[from] RetryError<LedgerError>),
    #[error(transparent)]
    Runway(#[from] RunwayError),
}
