//! Offline action queue.
//!
//! Buffers user-initiated mutating actions while the backend is unreachable,
//! persists them through the injected [`StateStore`], and replays them as a
//! single ordered batch per synchronize pass. Per-entry reconciliation:
//! server-confirmed entries are removed, rejected entries retry up to
//! `max_retries` times and are then dropped with a user-visible signal,
//! entries the server has not seen yet stay queued unchanged.
//!
//! Delivery is at-least-once: a batch whose success reply is lost will be
//! resent, and the server deduplicates by the client-generated entry id.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};

use crate::client::SyncTransport;
use crate::connectivity::ConnectivityHandle;
use crate::journal::{PassRecord, SyncJournal};
use crate::store::{StateStore, QUEUE_STATE_KEY};
use crate::types::{BatchResponse, QueuedAction};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// UI-facing queue signals (badge counts, drop notifications).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueueEvent {
    /// The number of pending entries changed.
    #[serde(rename_all = "camelCase")]
    LengthChanged { length: usize },
    /// Entries were permanently dropped after exhausting their retries.
    /// The single case the user must be told about.
    #[serde(rename_all = "camelCase")]
    Dropped { count: usize },
}

/// Result of one synchronize pass. Never an error — connectivity failures
/// resolve to [`SyncOutcome::Unreachable`] with the queue untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another pass holds the in-flight guard; this call was dropped.
    Busy,
    /// The connectivity observer reports offline; nothing was attempted.
    Offline,
    /// Nothing queued.
    Idle,
    /// Transport-level failure; the batch stays queued with unchanged
    /// retry counters.
    Unreachable,
    /// The server replied; counters reflect per-entry reconciliation.
    Completed {
        processed: usize,
        retried: usize,
        dropped: usize,
    },
}

/// The queue. One instance per session, shared behind `Arc`.
pub struct OfflineQueue {
    entries: Mutex<Vec<QueuedAction>>,
    store: Arc<dyn StateStore>,
    transport: Arc<dyn SyncTransport>,
    connectivity: ConnectivityHandle,
    journal: Option<Mutex<SyncJournal>>,
    max_retries: u32,
    /// Held across the network await of a pass; `try_lock` gives re-entrancy
    /// rejection without queueing callers.
    in_flight: tokio::sync::Mutex<()>,
    wake: Arc<Notify>,
    events: broadcast::Sender<QueueEvent>,
}

impl OfflineQueue {
    /// Build a queue, restoring any entries a previous session persisted.
    ///
    /// A missing, unreadable, or corrupt state document yields an empty
    /// queue — restoring nothing is safe, inventing entries is not.
    pub fn new(
        store: Arc<dyn StateStore>,
        transport: Arc<dyn SyncTransport>,
        connectivity: ConnectivityHandle,
        max_retries: u32,
    ) -> Self {
        let entries = match store.load(QUEUE_STATE_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<Vec<QueuedAction>>(&text) {
                Ok(list) => {
                    if !list.is_empty() {
                        log::info!("Offline queue: restored {} pending entries", list.len());
                    }
                    list
                }
                Err(e) => {
                    log::warn!("Offline queue: discarding corrupt state document: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Offline queue: failed to read state: {}", e);
                Vec::new()
            }
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            entries: Mutex::new(entries),
            store,
            transport,
            connectivity,
            journal: None,
            max_retries,
            in_flight: tokio::sync::Mutex::new(()),
            wake: Arc::new(Notify::new()),
            events,
        }
    }

    /// Attach a sync journal; passes are then recorded best-effort.
    pub fn with_journal(mut self, journal: SyncJournal) -> Self {
        self.journal = Some(Mutex::new(journal));
        self
    }

    /// Append a new action and return its id immediately.
    ///
    /// The entry is persisted right away; a store failure is logged and
    /// swallowed, leaving the in-memory queue authoritative for the session.
    /// When the observer reports online, the sync runner is signalled —
    /// fire-and-forget, the caller never waits on network activity.
    pub fn enqueue(&self, action_type: impl Into<String>, data: serde_json::Value) -> String {
        let action = QueuedAction::new(action_type, data);
        let id = action.id.clone();

        let length = {
            let mut entries = self.entries.lock();
            entries.push(action);
            entries.len()
        };

        log::info!("Offline queue: enqueued {} (length {})", id, length);
        self.persist();
        self.emit(QueueEvent::LengthChanged { length });

        if self.connectivity.is_online() {
            self.wake.notify_one();
        }

        id
    }

    /// Number of pending entries. Read-only, for UI badges.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unconditionally empty the queue. No server interaction; idempotent.
    pub fn clear(&self) {
        {
            let mut entries = self.entries.lock();
            entries.clear();
        }
        self.persist();
        self.emit(QueueEvent::LengthChanged { length: 0 });
        log::info!("Offline queue: cleared");
    }

    /// Signal handle the sync runner sleeps on.
    pub fn wake_handle(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Subscribe to queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Run one synchronize pass.
    ///
    /// Sends the current queue as a single ordered batch and reconciles the
    /// reply per entry. Entries enqueued while the request is in flight are
    /// not part of the snapshot and go in the next pass only.
    pub async fn synchronize(&self) -> SyncOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            log::debug!("Offline queue: pass already in flight, dropping call");
            return SyncOutcome::Busy;
        };

        if !self.connectivity.is_online() {
            return SyncOutcome::Offline;
        }

        let snapshot: Vec<QueuedAction> = self.entries.lock().clone();
        if snapshot.is_empty() {
            return SyncOutcome::Idle;
        }

        let started_at = chrono::Utc::now().to_rfc3339();
        log::info!("Offline queue: sending batch of {}", snapshot.len());

        // An explicit rejection from the transport is the same situation as
        // an `ok: false` reply: the server saw the batch and refused it.
        let reply = match self.transport.send_batch(&snapshot).await {
            Err(crate::error::SyncError::Rejected(reason)) => Ok(BatchResponse {
                ok: false,
                processed: vec![],
                failed: vec![],
                success_count: 0,
                failed_count: 0,
                error: Some(reason),
            }),
            other => other,
        };

        match reply {
            Ok(response) => {
                if !response.ok {
                    log::warn!(
                        "Offline queue: server rejected batch: {}",
                        response.error.as_deref().unwrap_or("no reason given")
                    );
                }

                let (processed, retried, dropped) = self.apply_reply(&snapshot, &response);
                self.persist();

                let length = self.len();
                self.emit(QueueEvent::LengthChanged { length });
                if dropped > 0 {
                    log::warn!(
                        "Offline queue: dropped {} entries after {} rejections",
                        dropped,
                        self.max_retries
                    );
                    self.emit(QueueEvent::Dropped { count: dropped });
                }

                self.record_pass(PassRecord {
                    started_at,
                    batch_size: snapshot.len(),
                    processed,
                    retried,
                    dropped,
                    outcome: "completed".to_string(),
                    error: response.error.clone(),
                });

                SyncOutcome::Completed {
                    processed,
                    retried,
                    dropped,
                }
            }
            Err(e) => {
                // Connectivity-shaped failure: the batch never took effect,
                // so nothing is mutated and nothing counts as a retry.
                log::warn!("Offline queue: batch not delivered: {}", e);
                self.record_pass(PassRecord {
                    started_at,
                    batch_size: snapshot.len(),
                    processed: 0,
                    retried: 0,
                    dropped: 0,
                    outcome: "unreachable".to_string(),
                    error: Some(e.to_string()),
                });
                SyncOutcome::Unreachable
            }
        }
    }

    /// Reconcile a server reply against the live queue.
    ///
    /// Only entries that were part of `snapshot` are touched. On `ok: false`
    /// the whole snapshot takes the failed path, lists ignored.
    fn apply_reply(
        &self,
        snapshot: &[QueuedAction],
        response: &BatchResponse,
    ) -> (usize, usize, usize) {
        let snapshot_ids: HashSet<&str> = snapshot.iter().map(|a| a.id.as_str()).collect();

        let (processed_ids, failed_ids): (HashSet<&str>, HashSet<&str>) = if response.ok {
            (
                response.processed.iter().map(|r| r.id.as_str()).collect(),
                response.failed.iter().map(|r| r.id.as_str()).collect(),
            )
        } else {
            (HashSet::new(), snapshot_ids.clone())
        };

        let mut processed = 0;
        let mut retried = 0;
        let mut dropped = 0;

        let mut entries = self.entries.lock();
        entries.retain_mut(|entry| {
            if !snapshot_ids.contains(entry.id.as_str()) {
                // Enqueued while the request was in flight; next pass.
                return true;
            }
            if processed_ids.contains(entry.id.as_str()) {
                processed += 1;
                return false;
            }
            if failed_ids.contains(entry.id.as_str()) {
                entry.retries += 1;
                if entry.retries >= self.max_retries {
                    log::warn!(
                        "Offline queue: giving up on {} ({} rejections)",
                        entry.id,
                        entry.retries
                    );
                    dropped += 1;
                    return false;
                }
                retried += 1;
            }
            // In neither list: still pending server-side, unchanged.
            true
        });

        (processed, retried, dropped)
    }

    /// Write the current queue to the durable store. Failures are logged and
    /// swallowed; the in-memory queue stays authoritative.
    fn persist(&self) {
        let document = {
            let entries = self.entries.lock();
            serde_json::to_string_pretty(&*entries)
        };
        let document = match document {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Offline queue: failed to serialize state: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.save(QUEUE_STATE_KEY, &document) {
            log::warn!("Offline queue: failed to persist state: {}", e);
        }
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn record_pass(&self, record: PassRecord) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.lock().record_pass(&record) {
                log::warn!("Offline queue: failed to journal pass: {}", e);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
