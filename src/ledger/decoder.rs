use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use num_bigint::BigUint;
use std::str::FromStr;

use super::types::{ExplorerLog, RateChangeEvent, RawLog, TransferEvent};
use super::LedgerError;

// Typed event ABIs; used for their topic0 signature hashes.
sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
    event UpdateMiningParameters(uint256 time, uint256 rate);
}

const WORD: usize = 32;

pub fn transfer_topic() -> B256 {
    Transfer::SIGNATURE_HASH
}

pub fn rate_change_topic() -> B256 {
    UpdateMiningParameters::SIGNATURE_HASH
}

pub fn u256_to_biguint(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}

/// Validate the hex-encoded fields of an explorer log.
pub fn parse_explorer_log(log: &ExplorerLog) -> Result<RawLog, LedgerError> {
    let address = Address::from_str(&log.address)
        .map_err(|e| LedgerError::MalformedLog(format!("address '{}': {}", log.address, e)))?;

    let topics = log
        .topics
        .iter()
        .map(|t| {
            B256::from_str(t).map_err(|e| LedgerError::MalformedLog(format!("topic '{}': {}", t, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let data = hex::decode(strip_0x(&log.data))
        .map_err(|e| LedgerError::MalformedLog(format!("data: {}", e)))?;

    if strip_0x(&log.transaction_hash).is_empty() {
        return Err(LedgerError::MalformedLog(format!(
            "log in block {} has no transactionHash",
            log.block_number
        )));
    }
    let tx_hash = B256::from_str(&log.transaction_hash).map_err(|e| {
        LedgerError::MalformedLog(format!("transactionHash '{}': {}", log.transaction_hash, e))
    })?;

    Ok(RawLog {
        address,
        topics,
        data,
        block_number: parse_hex_u64("blockNumber", &log.block_number)?,
        timestamp: parse_hex_u64("timeStamp", &log.time_stamp)?,
        log_index: parse_hex_u64("logIndex", &log.log_index)?,
        tx_hash,
    })
}

/// Decode an `UpdateMiningParameters` log. The payload is two uint256 words; the
/// second is the new rate per second.
pub fn decode_rate_change(log: &RawLog) -> Result<RateChangeEvent, LedgerError> {
    if log.topics.first() != Some(&rate_change_topic()) {
        return Err(LedgerError::MalformedLog(format!(
            "tx {} log {} is not an UpdateMiningParameters event",
            log.tx_hash, log.log_index
        )));
    }
    if log.data.len() < 2 * WORD {
        return Err(LedgerError::MalformedLog(format!(
            "UpdateMiningParameters payload is {} bytes, expected {}",
            log.data.len(),
            2 * WORD
        )));
    }

    Ok(RateChangeEvent {
        timestamp: log.timestamp,
        new_rate_per_second: BigUint::from_bytes_be(&log.data[WORD..2 * WORD]),
    })
}

/// Decode an ERC-20 `Transfer` log and check that it is directed at `recipient`.
pub fn decode_transfer_to(log: &RawLog, recipient: Address) -> Result<TransferEvent, LedgerError> {
    // signature + from + to
    if log.topics.len() != 3 || log.topics[0] != transfer_topic() {
        return Err(LedgerError::MalformedLog(format!(
            "tx {} log {} is not a Transfer event",
            log.tx_hash, log.log_index
        )));
    }

    let to = Address::from_word(log.topics[2]);
    if to != recipient {
        return Err(LedgerError::MalformedLog(format!(
            "tx {} log {} transfers to {}, expected {}",
            log.tx_hash, log.log_index, to, recipient
        )));
    }

    if log.data.len() < WORD {
        return Err(LedgerError::MalformedLog(format!(
            "Transfer payload is {} bytes, expected {}",
            log.data.len(),
            WORD
        )));
    }

    Ok(TransferEvent {
        amount: BigUint::from_bytes_be(&log.data[..WORD]),
        tx_hash: log.tx_hash,
        log_index: log.log_index,
    })
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

fn parse_hex_u64(field: &str, value: &str) -> Result<u64, LedgerError> {
    let digits = strip_0x(value);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::MalformedLog(format!("{} '{}': {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINTER: &str = "0x358fE82370a1B9aDaE2E3ad69D6cF9e503c96018";

    fn word(n: u64) -> String {
        format!("{:064x}", n)
    }

    fn explorer_log(topics: Vec<String>, data: String) -> ExplorerLog {
        ExplorerLog {
            address: "0xbd3531da5cf5857e7cfaa92426877b022e612cf8".to_string(),
            topics,
            data,
            block_number: "0xc48174".to_string(),
            time_stamp: "0x60f9ce56".to_string(),
            log_index: "0x".to_string(),
            transaction_hash: "0x4ffd22d986913d33927a392fe4319bcd2b62f3afe1c15a2c59f77fc2cc4c20a9"
                .to_string(),
        }
    }

    fn transfer_log(to: Address, amount: u64) -> RawLog {
        let log = explorer_log(
            vec![
                transfer_topic().to_string(),
                B256::ZERO.to_string(),
                to.into_word().to_string(),
            ],
            format!("0x{}", word(amount)),
        );
        parse_explorer_log(&log).unwrap()
    }

    #[test]
    fn test_parse_explorer_log_hex_fields() {
        let log = explorer_log(vec![transfer_topic().to_string()], "0x".to_string());
        let raw = parse_explorer_log(&log).unwrap();
        assert_eq!(raw.block_number, 0xc48174);
        assert_eq!(raw.timestamp, 0x60f9ce56);
        // bare "0x" log index decodes as zero
        assert_eq!(raw.log_index, 0);
        assert!(raw.data.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_tx_hash() {
        let mut log = explorer_log(vec![transfer_topic().to_string()], "0x".to_string());
        log.transaction_hash = "0x".to_string();
        assert!(matches!(
            parse_explorer_log(&log),
            Err(LedgerError::MalformedLog(_))
        ));
    }

    #[test]
    fn test_explorer_record_without_identity_is_rejected() {
        let minter = Address::from_str(MINTER).unwrap();
        let record = |block: &str, amount: u64| {
            serde_json::json!({
                "address": "0xbd3531da5cf5857e7cfaa92426877b022e612cf8",
                "topics": [
                    transfer_topic().to_string(),
                    B256::ZERO.to_string(),
                    minter.into_word().to_string(),
                ],
                "data": format!("0x{}", word(amount)),
                "blockNumber": block,
                "timeStamp": "0x60f9ce56",
            })
        };

        // two distinct transfers that would otherwise share a zero identity
        for value in [record("0x10", 100), record("0x20", 250)] {
            assert!(serde_json::from_value::<ExplorerLog>(value).is_err());
        }
    }

    #[test]
    fn test_distinct_transfers_keep_distinct_identity() {
        let minter = Address::from_str(MINTER).unwrap();
        let mut first = explorer_log(
            vec![
                transfer_topic().to_string(),
                B256::ZERO.to_string(),
                minter.into_word().to_string(),
            ],
            format!("0x{}", word(100)),
        );
        let mut second = first.clone();
        first.log_index = "0x".to_string();
        second.log_index = "0x1".to_string();
        second.data = format!("0x{}", word(250));

        let transfers = [first, second]
            .iter()
            .map(|l| decode_transfer_to(&parse_explorer_log(l).unwrap(), minter).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            crate::runway::inflow::total_inflow(&transfers),
            BigUint::from(350u32)
        );
    }

    #[test]
    fn test_parse_rejects_bad_topic() {
        let log = explorer_log(vec!["0xnothex".to_string()], "0x".to_string());
        assert!(matches!(
            parse_explorer_log(&log),
            Err(LedgerError::MalformedLog(_))
        ));
    }

    #[test]
    fn test_decode_rate_change_takes_second_word() {
        let log = explorer_log(
            vec![rate_change_topic().to_string()],
            format!("0x{}{}", word(1_656_000_000), word(42)),
        );
        let event = decode_rate_change(&parse_explorer_log(&log).unwrap()).unwrap();
        assert_eq!(event.timestamp, 0x60f9ce56);
        assert_eq!(event.new_rate_per_second, BigUint::from(42u32));
    }

    #[test]
    fn test_decode_rate_change_short_payload() {
        let log = explorer_log(
            vec![rate_change_topic().to_string()],
            format!("0x{}", word(1)),
        );
        assert!(decode_rate_change(&parse_explorer_log(&log).unwrap()).is_err());
    }

    #[test]
    fn test_decode_transfer_to_minter() {
        let minter = Address::from_str(MINTER).unwrap();
        let event = decode_transfer_to(&transfer_log(minter, 1_000), minter).unwrap();
        assert_eq!(event.amount, BigUint::from(1_000u32));
    }

    #[test]
    fn test_decode_transfer_wrong_recipient() {
        let minter = Address::from_str(MINTER).unwrap();
        let log = transfer_log(Address::ZERO, 1_000);
        assert!(decode_transfer_to(&log, minter).is_err());
    }

    #[test]
    fn test_u256_conversion_keeps_full_width() {
        let value = U256::MAX;
        assert_eq!(u256_to_biguint(value).to_string(), value.to_string());
    }
}
