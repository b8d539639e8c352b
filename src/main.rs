//! Headless sync agent.
//!
//! Wires the production pieces together: file-backed queue state, the batch
//! HTTP client, the connectivity prober, and the sync journal, then runs the
//! sync loop until killed. Log level via RUST_LOG (default info).

use std::sync::Arc;

use davka::{
    config, connectivity, runner, Connectivity, FileStore, HttpSyncClient, OfflineQueue,
    SyncJournal,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    if config.sync_endpoint.is_empty() {
        log::error!(
            "No sync_endpoint configured; set it in {}",
            config::config_path().unwrap_or_default().display()
        );
        std::process::exit(1);
    }

    let state_dir = match config::state_dir(&config) {
        Ok(dir) => dir,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let store = match FileStore::open(state_dir.clone()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            log::error!("Failed to open state store: {}", e);
            std::process::exit(1);
        }
    };

    let transport = match HttpSyncClient::new(&config.sync_endpoint, config.request_timeout_secs) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            log::error!("Failed to build sync client: {}", e);
            std::process::exit(1);
        }
    };

    // Assume online until the first probe result lands
    let source = Connectivity::new(true);

    let mut queue = OfflineQueue::new(store, transport, source.handle(), config.max_retries);
    match SyncJournal::open(state_dir.join("journal.db")) {
        Ok(journal) => queue = queue.with_journal(journal),
        Err(e) => log::warn!("Sync journal disabled: {}", e),
    }
    let queue = Arc::new(queue);

    // Surface drop notifications in the agent log; a UI shell would listen
    // on the same channel.
    let mut events = queue.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let davka::QueueEvent::Dropped { count } = event {
                log::warn!("{} queued action(s) permanently dropped", count);
            }
        }
    });

    let probe_handle = source.handle();
    tokio::spawn(connectivity::run_probe(
        source,
        config.probe_url.clone(),
        config.probe_interval_secs,
        config.request_timeout_secs,
    ));

    log::info!(
        "davka agent: queue length {}, endpoint {}",
        queue.len(),
        config.sync_endpoint
    );

    runner::run_sync_loop(queue, probe_handle, config.sync_interval_secs).await;
}
