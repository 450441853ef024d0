//! Retryable request sender.
//!
//! Re-issues the identical request immediately while the response status is
//! classified transient, up to [`MAX_RETRIES`] retries (four total
//! attempts). The predicate is injectable so tests and embedders can widen
//! or narrow the transient set.

use crate::transport::NetworkStrategy;
use edgekit_types::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of retries after the initial attempt.
pub const MAX_RETRIES: u32 = 3;

/// Default transient-status classification: throttling or any server error.
pub fn is_retryable_http_status_code(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

type RetryPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Outcome of a settled (possibly retried) network call.
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    pub status_code: u16,
    pub body: String,
    /// Present when the body parses as JSON.
    pub parsed_body: Option<Value>,
}

/// Sends requests through a strategy with bounded retry.
pub struct NetworkRequester {
    strategy: Arc<dyn NetworkStrategy>,
    is_retryable: RetryPredicate,
}

impl NetworkRequester {
    pub fn new(strategy: Arc<dyn NetworkStrategy>) -> Self {
        Self {
            strategy,
            is_retryable: Arc::new(is_retryable_http_status_code),
        }
    }

    /// Replaces the transient-status predicate.
    pub fn with_retry_predicate(
        mut self,
        is_retryable: impl Fn(u16) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_retryable = Arc::new(is_retryable);
        self
    }

    /// Sends the request, retrying on transient statuses. Transport-level
    /// failures are terminal immediately; the last response wins once the
    /// status is non-transient or retries are exhausted.
    pub async fn send(&self, url: &str, body: &str, request_id: &str) -> Result<NetworkResponse> {
        debug!(request_id, %body, "sending request");
        let mut retries = 0;
        let raw = loop {
            let raw = self.strategy.send(url, body).await?;
            if (self.is_retryable)(raw.status) && retries < MAX_RETRIES {
                retries += 1;
                debug!(
                    request_id,
                    status = raw.status,
                    retries,
                    "transient status; retrying request"
                );
                continue;
            }
            break raw;
        };
        let parsed_body = serde_json::from_str::<Value>(&raw.body).ok();
        if raw.body.is_empty() {
            debug!(
                request_id,
                status = raw.status,
                "received response with no response body"
            );
        } else {
            debug!(
                request_id,
                status = raw.status,
                body = %raw.body,
                "received response"
            );
        }
        Ok(NetworkResponse {
            status_code: raw.status,
            body: raw.body,
            parsed_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_predicate_retries_throttling_and_server_errors() {
        assert!(is_retryable_http_status_code(429));
        assert!(is_retryable_http_status_code(500));
        assert!(is_retryable_http_status_code(599));
        assert!(!is_retryable_http_status_code(200));
        assert!(!is_retryable_http_status_code(204));
        assert!(!is_retryable_http_status_code(400));
        assert!(!is_retryable_http_status_code(403));
    }
}
