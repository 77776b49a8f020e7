use alloy::primitives::{Address, B256};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::config::ExplorerConfig;
use crate::retry::{with_retry, RetryError, RetryPolicy};

use super::decoder::parse_explorer_log;
use super::types::{ExplorerLog, RawLog};
use super::{LedgerError, LedgerResult};

/// Explorer `getLogs` envelope. `result` is an array of logs on success and a plain
/// string describing the problem on failure.
//
// {
//     "status": "1",
//     "message": "OK",
//     "result": [ { "address": "0x…", "topics": [...], "data": "0x", "blockNumber": "0xc48174", ... } ]
// }
#[derive(Debug, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

/// Address plus topic filters for a log search. `topic2`, when set, is combined with
/// `topic0` using `and`.
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: B256,
    pub topic2: Option<B256>,
}

/// Client for an Etherscan-compatible log-search API.
pub struct ExplorerClient {
    http: Client,
    url: String,
    api_key: String,
    page_size: usize,
    retry: RetryPolicy,
}

impl ExplorerClient {
    pub fn new(config: &ExplorerConfig, retry: RetryPolicy) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
            retry,
        })
    }

    /// Every log matching `filter` in `[from_block, to_block]`, following the block cursor
    /// until a page comes back short.
    pub async fn get_logs(
        &self,
        filter: &LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> LedgerResult<Vec<RawLog>> {
        paginate_by_block(from_block, to_block, self.page_size, |from, to| {
            self.get_logs_page(filter, from, to)
        })
        .await
    }

    /// One retried `getLogs` request.
    async fn get_logs_page(
        &self,
        filter: &LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> LedgerResult<Vec<RawLog>> {
        let operation = format!("getLogs {} [{}..={}]", filter.address, from_block, to_block);
        let logs = with_retry(&self.retry, &operation, || {
            self.request_logs(filter, from_block, to_block)
        })
        .await?;

        logs.iter()
            .map(parse_explorer_log)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| RetryError::Permanent { operation, error })
    }

    async fn request_logs(
        &self,
        filter: &LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ExplorerLog>, LedgerError> {
        let mut params = vec![
            ("module", "logs".to_string()),
            ("action", "getLogs".to_string()),
            ("fromBlock", from_block.to_string()),
            ("toBlock", to_block.to_string()),
            ("address", filter.address.to_string()),
            ("topic0", filter.topic0.to_string()),
            ("apikey", self.api_key.clone()),
        ];
        if let Some(topic2) = filter.topic2 {
            params.push(("topic2", topic2.to_string()));
            params.push(("topic0_2_opr", "and".to_string()));
        }

        let response = self.http.get(&self.url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(LedgerError::Status(response.status()));
        }

        let body: ExplorerResponse = response.json().await?;
        interpret_response(body, &filter.address)
    }
}

/// Apply the explorer's status conventions: `"1"` carries logs, `"0"` with no records
/// is an empty result, anything else is an error.
pub fn interpret_response(
    body: ExplorerResponse,
    address: &Address,
) -> Result<Vec<ExplorerLog>, LedgerError> {
    if body.status == "1" {
        return serde_json::from_value(body.result)
            .map_err(|e| LedgerError::MalformedLog(format!("explorer result: {}", e)));
    }

    let empty_result = match &body.result {
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Null => true,
        _ => false,
    };
    if body.status == "0" && (empty_result || body.message.starts_with("No records found")) {
        tracing::warn!(%address, "No event logs were found");
        return Ok(Vec::new());
    }

    let result = match body.result {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    let rate_limited = result.to_ascii_lowercase().contains("rate limit");
    Err(LedgerError::Explorer {
        message: body.message,
        result,
        rate_limited,
    })
}

/// Walk `[from_block, to_block]` with a block cursor. A full page means the explorer
/// may have truncated, so the last (possibly partial) block is dropped and becomes the
/// next cursor. Logs must arrive in block order.
pub async fn paginate_by_block<F, Fut>(
    from_block: u64,
    to_block: u64,
    page_size: usize,
    mut fetch: F,
) -> LedgerResult<Vec<RawLog>>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = LedgerResult<Vec<RawLog>>>,
{
    let mut all = Vec::new();
    let mut cursor = from_block;

    loop {
        let page = fetch(cursor, to_block).await?;
        if page.len() < page_size {
            all.extend(page);
            break;
        }

        let last_block = page.last().map(|l| l.block_number).unwrap_or(cursor);
        if last_block <= cursor {
            return Err(RetryError::Permanent {
                operation: format!("getLogs [{}..={}]", cursor, to_block),
                error: LedgerError::PageOverflow {
                    block: cursor,
                    page_size,
                },
            });
        }

        tracing::debug!(
            from = cursor,
            next = last_block,
            logs = page.len(),
            "Explorer page full, advancing cursor"
        );
        all.extend(page.into_iter().filter(|l| l.block_number < last_block));
        cursor = last_block;
    }

    Ok(all)
}
