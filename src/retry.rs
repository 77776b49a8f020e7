use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether repeating the same request could succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Bounded retry with exponential backoff between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: E,
    },
    #[error("{operation} failed: {error}")]
    Permanent { operation: String, error: E },
}

impl<E> RetryError<E> {
    /// The underlying upstream error, whichever way the call gave up.
    pub fn inner(&self) -> &E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent { error, .. } => error,
        }
    }
}

/// Run `f` until it succeeds, fails with a non-transient error, or the policy's
/// attempt cap is reached. Every failed attempt is logged as a warning.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.base_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match f().await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };

        if !error.is_transient() {
            tracing::warn!(operation, attempt, error = %error, "Upstream call failed, not retrying");
            return Err(RetryError::Permanent {
                operation: operation.to_string(),
                error,
            });
        }

        tracing::warn!(
            operation,
            attempt,
            max_attempts,
            error = %error,
            "Upstream call failed"
        );

        if attempt >= max_attempts {
            return Err(RetryError::Exhausted {
                operation: operation.to_string(),
                attempts: attempt,
                last: error,
            });
        }

        tokio::time::sleep(delay).await;
        delay = std::cmp::min(delay * 2, policy.max_delay);
    }
}
