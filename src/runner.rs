//! Background sync runner.
//!
//! A single long-lived task that runs one synchronize pass per wake. Wakes
//! come from three places: the enqueue signal (an entry was added while
//! online), an offline-to-online transition, and a periodic interval for
//! anything the other two miss.

use std::sync::Arc;
use std::time::Duration;

use crate::connectivity::ConnectivityHandle;
use crate::queue::OfflineQueue;

/// Drive `queue` until the process exits.
///
/// Runs one pass immediately on start (the on-load trigger), then sleeps
/// until the next wake. Passes that overlap an in-flight one are dropped by
/// the queue itself, so spurious wakes are harmless.
pub async fn run_sync_loop(
    queue: Arc<OfflineQueue>,
    mut connectivity: ConnectivityHandle,
    interval_secs: u64,
) {
    let wake = queue.wake_handle();
    log::info!("Sync runner: started (interval {}s)", interval_secs);

    let outcome = queue.synchronize().await;
    log::debug!("Sync runner: startup pass: {:?}", outcome);

    loop {
        tokio::select! {
            _ = wake.notified() => {
                log::debug!("Sync runner: woken by enqueue");
            }
            online = connectivity.changed() => {
                if !online {
                    continue;
                }
                log::info!("Sync runner: back online, draining queue");
            }
            _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {
                log::debug!("Sync runner: periodic pass");
            }
        }

        let outcome = queue.synchronize().await;
        log::debug!("Sync runner: pass finished: {:?}", outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::client::SyncTransport;
    use crate::connectivity::Connectivity;
    use crate::error::SyncError;
    use crate::store::MemoryStore;
    use crate::types::{BatchResponse, QueuedAction};

    /// Accepts every batch and counts requests.
    struct CountingTransport {
        requests: Mutex<VecDeque<Vec<QueuedAction>>>,
    }

    impl CountingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(VecDeque::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl SyncTransport for CountingTransport {
        async fn send_batch(&self, events: &[QueuedAction]) -> Result<BatchResponse, SyncError> {
            self.requests.lock().push_back(events.to_vec());
            Ok(BatchResponse {
                ok: true,
                processed: events
                    .iter()
                    .map(|a| crate::types::IdRef { id: a.id.clone() })
                    .collect(),
                failed: vec![],
                success_count: events.len() as u64,
                failed_count: 0,
                error: None,
            })
        }
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 1s");
    }

    #[tokio::test]
    async fn test_enqueue_wake_drains_queue() {
        let transport = CountingTransport::new();
        let source = Connectivity::new(true);
        let queue = Arc::new(OfflineQueue::new(
            Arc::new(MemoryStore::new()),
            transport.clone(),
            source.handle(),
            3,
        ));

        // Long interval so only the wake can trigger a pass
        let runner = tokio::spawn(run_sync_loop(queue.clone(), source.handle(), 3600));

        queue.enqueue("tasks", json!({"title": "X"}));
        wait_for(|| queue.is_empty()).await;
        assert!(transport.request_count() >= 1);

        runner.abort();
    }

    #[tokio::test]
    async fn test_online_transition_drains_queue() {
        let transport = CountingTransport::new();
        let source = Connectivity::new(false);
        let queue = Arc::new(OfflineQueue::new(
            Arc::new(MemoryStore::new()),
            transport.clone(),
            source.handle(),
            3,
        ));
        queue.enqueue("tasks", json!({"title": "X"}));

        let runner = tokio::spawn(run_sync_loop(queue.clone(), source.handle(), 3600));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.request_count(), 0);

        source.set_online(true);
        wait_for(|| queue.is_empty()).await;
        assert_eq!(transport.request_count(), 1);

        runner.abort();
    }

    #[tokio::test]
    async fn test_startup_pass_drains_existing_entries() {
        let transport = CountingTransport::new();
        let source = Connectivity::new(true);
        let queue = Arc::new(OfflineQueue::new(
            Arc::new(MemoryStore::new()),
            transport.clone(),
            source.handle(),
            3,
        ));
        queue.enqueue("tasks", json!({"title": "left over"}));

        let runner = tokio::spawn(run_sync_loop(queue.clone(), source.handle(), 3600));
        wait_for(|| queue.is_empty()).await;
        assert_eq!(transport.request_count(), 1);

        runner.abort();
    }
}
