use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AlertConfig;
use crate::retry::{with_retry, RetryError, RetryPolicy, Transient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("PagerDuty rejected the event with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl Transient for AlertError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            // 4xx other than throttling means the payload or key is wrong
            Self::Rejected { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

/// Events API v2 trigger body.
#[derive(Debug, Serialize)]
pub struct TriggerEvent<'a> {
    pub routing_key: &'a str,
    pub event_action: &'static str,
    pub payload: TriggerPayload<'a>,
}

#[derive(Debug, Serialize)]
pub struct TriggerPayload<'a> {
    pub summary: &'a str,
    pub severity: Severity,
    pub source: &'a str,
}

pub struct PagerDutyClient {
    http: Client,
    events_url: String,
    routing_key: String,
    source: String,
    retry: RetryPolicy,
}

impl PagerDutyClient {
    pub fn new(config: &AlertConfig, retry: RetryPolicy) -> Result<Self, AlertError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            events_url: config.events_url.clone(),
            routing_key: config.routing_key.clone(),
            source: config.source.clone(),
            retry,
        })
    }

    pub fn trigger_event<'a>(&'a self, summary: &'a str, severity: Severity) -> TriggerEvent<'a> {
        TriggerEvent {
            routing_key: &self.routing_key,
            event_action: "trigger",
            payload: TriggerPayload {
                summary,
                severity,
                source: &self.source,
            },
        }
    }

    /// Open an incident. Retried under the shared policy.
    pub async fn trigger(
        &self,
        summary: &str,
        severity: Severity,
    ) -> Result<(), RetryError<AlertError>> {
        let event = self.trigger_event(summary, severity);
        let event = &event;

        let status = with_retry(&self.retry, "PagerDuty enqueue", || async move {
            let response = self.http.post(&self.events_url).json(event).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AlertError::Rejected { status, body });
            }
            Ok::<_, AlertError>(status)
        })
        .await?;

        tracing::info!(%status, "PagerDuty Event API response");
        Ok(())
    }
}
