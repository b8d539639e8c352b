//! Offline action queue and batch sync engine for field-operations clients.
//!
//! Mutating user actions (create task, log hours, check in) performed while
//! the backend is unreachable are buffered in a durable local queue and
//! replayed in ordered batches once connectivity returns. Delivery is
//! at-least-once; the server deduplicates by client-generated entry ids.
//!
//! The queue takes its storage, transport, and connectivity source as
//! injected dependencies; `main.rs` wires the production implementations.

pub mod client;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod journal;
mod migrations;
pub mod queue;
pub mod runner;
pub mod store;
pub mod types;

pub use client::{HttpSyncClient, SyncTransport};
pub use config::Config;
pub use connectivity::{Connectivity, ConnectivityHandle};
pub use error::{StoreError, SyncError};
pub use journal::SyncJournal;
pub use queue::{OfflineQueue, QueueEvent, SyncOutcome};
pub use store::{FileStore, MemoryStore, StateStore, QUEUE_STATE_KEY};
pub use types::QueuedAction;
