use alloy::primitives::{Address, B256};
use num_bigint::BigUint;
use num_traits::Zero;
use std::collections::HashSet;

use crate::ledger::decoder::{decode_transfer_to, transfer_topic};
use crate::ledger::explorer::{ExplorerClient, LogFilter};
use crate::ledger::types::{Block, TransferEvent};
use crate::retry::RetryError;

use super::MeasureError;

/// Sum of transfer amounts. A log seen twice (same tx hash and log index) counts once.
pub fn total_inflow<'a, I>(transfers: I) -> BigUint
where
    I: IntoIterator<Item = &'a TransferEvent>,
{
    let mut seen: HashSet<(B256, u64)> = HashSet::new();
    let mut total = BigUint::zero();

    for transfer in transfers {
        if !seen.insert((transfer.tx_hash, transfer.log_index)) {
            tracing::warn!(
                tx_hash = %transfer.tx_hash,
                log_index = transfer.log_index,
                "Duplicate transfer log, skipping"
            );
            continue;
        }
        total += &transfer.amount;
    }

    total
}

/// Total reward tokens transferred into `recipient` between creation and the latest block.
pub async fn cumulative_filled(
    explorer: &ExplorerClient,
    token: Address,
    recipient: Address,
    creation: &Block,
    latest: &Block,
) -> Result<BigUint, MeasureError> {
    let filter = LogFilter {
        address: token,
        topic0: transfer_topic(),
        topic2: Some(recipient.into_word()),
    };
    let logs = explorer
        .get_logs(&filter, creation.number, latest.number)
        .await?;
    tracing::info!(count = logs.len(), %recipient, "Queried reward token Transfer events");

    let transfers = logs
        .iter()
        .map(|log| decode_transfer_to(log, recipient))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| RetryError::Permanent {
            operation: "decode Transfer".to_string(),
            error,
        })?;

    Ok(total_inflow(&transfers))
}
