//! Persisted and wire-level types for the offline action queue.
//!
//! The persisted record layout is fixed — it is what older sessions wrote to
//! disk and what the batch endpoint expects inside `events`:
//!
//! ```json
//! { "id": "...", "type": "tasks", "data": {...}, "created_at": "2026-08-06T09:14:00Z", "retries": 0 }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One pending mutating operation, durable until the server confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Client-generated UUID, stable for the lifetime of the entry. The
    /// server deduplicates re-delivered actions by this id.
    pub id: String,
    /// Operation category, derived from the target endpoint ("tasks",
    /// "hours", "checkins", ...).
    #[serde(rename = "type")]
    pub action_type: String,
    /// The request body needed to replay the action, verbatim.
    pub data: serde_json::Value,
    /// RFC 3339 UTC timestamp of enqueue.
    pub created_at: String,
    /// Failed replay attempts so far. Only business-logic rejections count;
    /// connectivity failures leave this untouched.
    #[serde(default)]
    pub retries: u32,
}

impl QueuedAction {
    /// Build a fresh entry with a new id and zero retries.
    pub fn new(action_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action_type: action_type.into(),
            data,
            created_at: Utc::now().to_rfc3339(),
            retries: 0,
        }
    }
}

// ============================================================================
// Batch endpoint wire types
// ============================================================================

/// Request body for the batch sync endpoint.
#[derive(Debug, Serialize)]
pub struct SyncBatch<'a> {
    pub events: &'a [QueuedAction],
}

/// An id reference inside `processed` / `failed`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    #[serde(default)]
    pub id: String,
}

/// Success-shaped reply from the batch endpoint.
///
/// `processed` and `failed` may each be empty; ids present in neither list
/// are still pending server-side and stay queued unchanged. Any body that
/// does not deserialize into this shape is treated as a transport-level
/// failure for the whole batch.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    pub ok: bool,
    #[serde(default)]
    pub processed: Vec<IdRef>,
    #[serde(default)]
    pub failed: Vec<IdRef>,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    /// Server-supplied reason on `ok: false` replies.
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_queued_action_wire_layout() {
        let action = QueuedAction {
            id: "a1".to_string(),
            action_type: "tasks".to_string(),
            data: json!({"title": "Objednat material"}),
            created_at: "2026-08-06T09:14:00+00:00".to_string(),
            retries: 2,
        };

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["id"], "a1");
        assert_eq!(value["type"], "tasks");
        assert_eq!(value["data"]["title"], "Objednat material");
        assert_eq!(value["retries"], 2);
        // The Rust field name must not leak into the wire format
        assert!(value.get("action_type").is_none());
    }

    #[test]
    fn test_queued_action_roundtrip() {
        let action = QueuedAction::new("hours", json!({"employee": "jn", "hours": 8}));
        let text = serde_json::to_string(&action).unwrap();
        let parsed: QueuedAction = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, action);
        assert_eq!(parsed.retries, 0);
    }

    #[test]
    fn test_queued_action_retries_defaults_to_zero() {
        // Entries written before the retry counter existed
        let legacy = r#"{
            "id": "old-1",
            "type": "tasks",
            "data": {},
            "created_at": "2025-11-02T08:00:00Z"
        }"#;
        let parsed: QueuedAction = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.retries, 0);
    }

    #[test]
    fn test_batch_response_full() {
        let body = r#"{
            "ok": true,
            "processed": [{"id": "a"}, {"id": "b"}],
            "failed": [{"id": "c"}],
            "success_count": 2,
            "failed_count": 1
        }"#;
        let resp: BatchResponse = serde_json::from_str(body).unwrap();
        assert!(resp.ok);
        assert_eq!(resp.processed.len(), 2);
        assert_eq!(resp.failed[0].id, "c");
        assert_eq!(resp.success_count, 2);
        assert_eq!(resp.failed_count, 1);
    }

    #[test]
    fn test_batch_response_minimal() {
        // Lists and counts are optional; only `ok` is required
        let resp: BatchResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(resp.ok);
        assert!(resp.processed.is_empty());
        assert!(resp.failed.is_empty());
    }

    #[test]
    fn test_batch_response_rejection_with_error() {
        let resp: BatchResponse =
            serde_json::from_str(r#"{"ok": false, "error": "schema mismatch"}"#).unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.error.as_deref(), Some("schema mismatch"));
    }

    #[test]
    fn test_sync_batch_body_shape() {
        let actions = vec![QueuedAction::new("tasks", json!({"title": "X"}))];
        let body = serde_json::to_value(SyncBatch { events: &actions }).unwrap();
        assert!(body["events"].is_array());
        assert_eq!(body["events"][0]["type"], "tasks");
    }
}
