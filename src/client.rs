//! HTTP transport for the batch sync endpoint.
//!
//! One POST per synchronize pass, body `{"events": [...]}`. The transport
//! does not retry internally — connectivity failures are reported as-is and
//! the queue resends the unchanged batch on a later pass.
//!
//! Reply classification:
//! - 2xx with a well-formed body → [`BatchResponse`] (including `ok: false`,
//!   which the queue treats as a whole-batch rejection)
//! - non-2xx carrying a well-formed `ok: false` body → still a structured
//!   rejection, not a transport fault
//! - everything else (connect error, timeout, unparseable body) →
//!   connectivity-class error, queue untouched

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::SyncError;
use crate::types::{BatchResponse, QueuedAction, SyncBatch};

/// Sends one batch of queued actions to the server.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn send_batch(&self, events: &[QueuedAction]) -> Result<BatchResponse, SyncError>;
}

/// Production transport over reqwest.
#[derive(Debug)]
pub struct HttpSyncClient {
    client: reqwest::Client,
    endpoint: Url,
    timeout_secs: u64,
}

impl HttpSyncClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, SyncError> {
        let endpoint = Url::parse(endpoint).map_err(|e| SyncError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SyncError::Connectivity(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            timeout_secs,
        })
    }
}

#[async_trait]
impl SyncTransport for HttpSyncClient {
    async fn send_batch(&self, events: &[QueuedAction]) -> Result<BatchResponse, SyncError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&SyncBatch { events })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Timeout(self.timeout_secs)
                } else {
                    SyncError::Connectivity(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Connectivity(e.to_string()))?;

        classify_reply(status.as_u16(), &body)
    }
}

/// Map an HTTP status and body onto the queue's failure taxonomy.
fn classify_reply(status: u16, body: &str) -> Result<BatchResponse, SyncError> {
    let parsed: Result<BatchResponse, _> = serde_json::from_str(body);

    if (200..300).contains(&status) {
        return parsed.map_err(|e| SyncError::MalformedResponse(e.to_string()));
    }

    // A non-2xx reply still counts as a structured rejection when the server
    // managed to say so in the expected shape. Anything else never reached
    // business logic.
    match parsed {
        Ok(resp) if !resp.ok => Ok(resp),
        _ => Err(SyncError::Connectivity(format!("HTTP {}", status))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_reply() {
        let resp = classify_reply(200, r#"{"ok": true, "processed": [{"id": "a"}]}"#).unwrap();
        assert!(resp.ok);
        assert_eq!(resp.processed[0].id, "a");
    }

    #[test]
    fn test_structured_rejection_on_2xx() {
        let resp = classify_reply(200, r#"{"ok": false, "error": "validation"}"#).unwrap();
        assert!(!resp.ok);
    }

    #[test]
    fn test_structured_rejection_on_422() {
        let resp = classify_reply(422, r#"{"ok": false, "failed": [{"id": "a"}]}"#).unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.failed.len(), 1);
    }

    #[test]
    fn test_malformed_2xx_is_connectivity() {
        let err = classify_reply(200, "<html>proxy login</html>").unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_server_error_is_connectivity() {
        let err = classify_reply(502, "Bad Gateway").unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_ok_true_on_non_2xx_is_connectivity() {
        // An "ok" body behind an error status is ambiguous; never mutate the
        // queue on ambiguous replies.
        let err = classify_reply(500, r#"{"ok": true}"#).unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_invalid_endpoint_rejected_at_construction() {
        let err = HttpSyncClient::new("not a url", 15).unwrap_err();
        assert!(matches!(err, SyncError::InvalidEndpoint { .. }));
    }
}
