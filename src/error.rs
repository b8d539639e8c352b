//! Error types for queue persistence and batch synchronization.
//!
//! Errors are classified by what they mean for the queue:
//! - Connectivity: transport failed or the reply was unusable; retry freely,
//!   never mutate retry counters.
//! - Rejected: the server understood the batch and refused it; bounded
//!   retries, then the affected entries are dropped.
//! - Store: the durable copy could not be written; non-fatal, the in-memory
//!   queue stays authoritative for the session.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the durable state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("State directory unavailable: {0}")]
    StateDirUnavailable(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors surfaced by the sync transport and queue internals.
#[derive(Debug, Error)]
pub enum SyncError {
    // Connectivity-class: the batch never took effect server-side
    #[error("Connectivity: {0}")]
    Connectivity(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Malformed server reply: {0}")]
    MalformedResponse(String),

    // The server processed the request and said no
    #[error("Batch rejected by server: {0}")]
    Rejected(String),

    // Local durability
    #[error(transparent)]
    Store(#[from] StoreError),

    // Wiring mistakes, reported at construction time
    #[error("Invalid sync endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl SyncError {
    /// True when the failure is connectivity-shaped: the batch may simply be
    /// resent unchanged on the next pass.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            SyncError::Connectivity(_) | SyncError::Timeout(_) | SyncError::MalformedResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(SyncError::Connectivity("dns".into()).is_connectivity());
        assert!(SyncError::Timeout(15).is_connectivity());
        assert!(SyncError::MalformedResponse("not json".into()).is_connectivity());
        assert!(!SyncError::Rejected("bad payload".into()).is_connectivity());
    }

    #[test]
    fn test_store_error_displays_path() {
        let err = StoreError::Write {
            path: PathBuf::from("/tmp/state/offline_queue.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("offline_queue.json"));
        assert!(msg.contains("denied"));
    }
}
