//! # GeoSync Sync
//!
//! Subscription tracking and update fan-out for GeoSync datasets.
//!
//! ## Overview
//!
//! Clients watch one dataset each. When a write changes a dataset, the
//! [`SyncHub`] queues the new state for every current watcher. When a client
//! connects it reports the hash it last saw, and the hub resends the dataset
//! only if that hash is stale.
//!
//! ## Key Properties
//!
//! - **Change-only fan-out**: unchanged writes broadcast nothing
//! - **Partial-failure tolerant**: a dead or slow subscriber is pruned, the rest still receive
//! - **No missed updates on connect**: attach and broadcast for one dataset are serialized
//! - **Actor sessions**: each connection owns its queue; the hub never blocks on a socket
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use geosync_core::DatasetId;
//! use geosync_store::MemoryStore;
//! use geosync_sync::{run_session, SyncConfig, SyncHub};
//! use geosync_sync::transport::memory;
//!
//! async fn example() -> geosync_sync::Result<()> {
//!     let store: MemoryStore = MemoryStore::new();
//!     let hub = Arc::new(SyncHub::new(store, SyncConfig::default()));
//!
//!     let attachment = hub.attach(DatasetId::new("region"), None)?;
//!     let (transport, _client) = memory::pair();
//!     tokio::spawn(run_session(Arc::clone(&hub), attachment, transport));
//!
//!     let report = hub.submit(&DatasetId::new("region"), serde_json::json!([[0, 0]]))?;
//!     println!("delivered to {} clients", report.delivered());
//!     Ok(())
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Client                    Session                     Hub
//!   |--- connect ?hash=h ---->|                          |
//!   |                         |------- attach ---------->|  register + resync
//!   |<------ update ----------|<------ outbox -----------|  (only if h is stale)
//!   |                         |                          |
//!   |                         |                          |<-- submit (changed)
//!   |<------ update ----------|<------ outbox -----------|
//!   |--- close -------------->|------- detach ---------->|
//! ```

pub mod error;
pub mod hub;
pub mod registry;
pub mod session;
pub mod transport;

pub use error::{Result, SyncError};
pub use hub::{
    Attachment, BroadcastReport, DisconnectReason, ResyncDecision, SubmitReport, SyncConfig,
    SyncHub,
};
pub use registry::{ConnectionId, DeliveryFailure, Subscriber, SubscriptionRegistry};
pub use session::run_session;
pub use transport::{memory::MemoryClient, memory::MemoryTransport, Inbound, SessionTransport};
