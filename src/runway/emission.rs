use alloy::primitives::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use std::collections::BTreeMap;

use crate::ledger::decoder::{decode_rate_change, rate_change_topic};
use crate::ledger::explorer::{ExplorerClient, LogFilter};
use crate::ledger::types::{Block, RateChangeEvent};
use crate::retry::RetryError;

use super::{MeasureError, RunwayError};

/// Piecewise-constant emission rate, keyed by the unix second each rate took effect.
/// The final entry is always a synthetic zero at the latest block: emission is treated
/// as stopped "now" for the purpose of the integral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSchedule {
    points: BTreeMap<u64, BigUint>,
}

impl RateSchedule {
    /// Build the schedule from rate-change events. Same-second events keep the last one
    /// seen; events after `latest` are ignored.
    pub fn from_events<I>(events: I, latest: &Block) -> Self
    where
        I: IntoIterator<Item = RateChangeEvent>,
    {
        let mut points = BTreeMap::new();
        for event in events {
            if event.timestamp > latest.timestamp {
                tracing::warn!(
                    timestamp = event.timestamp,
                    latest = latest.timestamp,
                    "Rate change after latest block, ignoring"
                );
                continue;
            }
            if let Some(previous) = points.insert(event.timestamp, event.new_rate_per_second.clone()) {
                tracing::warn!(
                    timestamp = event.timestamp,
                    %previous,
                    kept = %event.new_rate_per_second,
                    "Multiple rate changes in the same second, keeping the last"
                );
            }
        }

        if points.insert(latest.timestamp, BigUint::zero()).is_some() {
            tracing::debug!(
                timestamp = latest.timestamp,
                "Rate change at the latest block replaced by the closing zero rate"
            );
        }

        Self { points }
    }

    /// Number of rate points, the closing zero included. Never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Integral of the rate from `start` (the Minter's creation time) to the last point.
    pub fn cumulative_emitted(&self, start: u64) -> Result<BigUint, RunwayError> {
        let mut cumulative = BigUint::zero();
        let mut last_timestamp = start;
        let mut prev_rate = BigUint::zero();

        for (&timestamp, rate) in &self.points {
            let elapsed = timestamp
                .checked_sub(last_timestamp)
                .ok_or(RunwayError::EventBeforeStart { timestamp, start })?;
            cumulative += &prev_rate * BigUint::from(elapsed);
            last_timestamp = timestamp;
            prev_rate = rate.clone();
        }

        Ok(cumulative)
    }
}

/// Total reward tokens the Minter's rate schedule implies were emitted between its
/// creation and the latest block.
pub async fn cumulative_used_up(
    explorer: &ExplorerClient,
    minter: Address,
    creation: &Block,
    latest: &Block,
) -> Result<BigUint, MeasureError> {
    let filter = LogFilter {
        address: minter,
        topic0: rate_change_topic(),
        topic2: None,
    };
    let logs = explorer
        .get_logs(&filter, creation.number, latest.number)
        .await?;
    tracing::info!(count = logs.len(), "Queried UpdateMiningParameters events");

    let events = logs
        .iter()
        .map(decode_rate_change)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| RetryError::Permanent {
            operation: "decode UpdateMiningParameters".to_string(),
            error,
        })?;

    let schedule = RateSchedule::from_events(events, latest);
    Ok(schedule.cumulative_emitted(creation.timestamp)?)
}
