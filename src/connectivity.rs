//! Online/offline detection.
//!
//! The queue never talks to the network layer directly; it reads a
//! [`ConnectivityHandle`] backed by a watch channel. Production feeds the
//! channel from [`run_probe`], a background task that HEADs a lightweight
//! URL on an interval. Tests flip a [`Connectivity`] source by hand.

use std::time::Duration;

use tokio::sync::watch;

/// Writable side of the connectivity state.
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Connectivity {
    /// Create a source with an initial assumption.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Update the state. Subscribers are only woken on actual transitions.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current != online {
                log::info!(
                    "Connectivity: {}",
                    if online { "online" } else { "offline" }
                );
                *current = online;
                true
            } else {
                false
            }
        });
    }

    /// A read handle for the queue and the sync runner.
    pub fn handle(&self) -> ConnectivityHandle {
        ConnectivityHandle {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side: current snapshot plus a transition stream.
#[derive(Clone)]
pub struct ConnectivityHandle {
    rx: watch::Receiver<bool>,
}

impl ConnectivityHandle {
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the next transition and return the new state. If the source
    /// is gone the state can never change again, so this pends forever
    /// rather than spinning.
    pub async fn changed(&mut self) -> bool {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        *self.rx.borrow_and_update()
    }
}

/// Background connectivity prober.
///
/// Issues a HEAD request to `probe_url` every `interval_secs` and feeds the
/// result into `source`. Any response at all counts as online — a captive
/// portal returning 511 still proves the link is up, and the batch endpoint
/// will sort out the rest.
pub async fn run_probe(
    source: Connectivity,
    probe_url: String,
    interval_secs: u64,
    timeout_secs: u64,
) {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Connectivity probe disabled, client build failed: {}", e);
            return;
        }
    };

    log::info!("Connectivity probe: started ({})", probe_url);

    loop {
        let online = client.head(&probe_url).send().await.is_ok();
        source.set_online(online);
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_source() {
        let source = Connectivity::new(false);
        let handle = source.handle();
        assert!(!handle.is_online());

        source.set_online(true);
        assert!(handle.is_online());
    }

    #[tokio::test]
    async fn test_changed_sees_transition() {
        let source = Connectivity::new(false);
        let mut handle = source.handle();

        let waiter = tokio::spawn(async move { handle.changed().await });
        tokio::task::yield_now().await;
        source.set_online(true);

        let seen = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(seen);
    }

    #[tokio::test]
    async fn test_no_wake_without_transition() {
        let source = Connectivity::new(true);
        let mut handle = source.handle();

        // Same value again must not count as a transition
        source.set_online(true);
        let res = tokio::time::timeout(Duration::from_millis(50), handle.changed()).await;
        assert!(res.is_err(), "changed() should still be pending");
    }
}
