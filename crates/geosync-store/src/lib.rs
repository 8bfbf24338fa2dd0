//! # GeoSync Store
//!
//! Storage abstraction for GeoSync datasets. Provides the [`DatasetStore`]
//! trait and an in-memory implementation, [`MemoryStore`].
//!
//! ## Overview
//!
//! The store owns the authoritative mapping from dataset id to
//! `(content hash, payload)`. Every write recomputes the canonical hash and
//! reports whether content actually changed, so callers only fan out real
//! changes.
//!
//! ## Usage
//!
//! ```rust
//! use geosync_store::{DatasetStore, MemoryStore};
//! use geosync_core::DatasetId;
//! use serde_json::json;
//!
//! let store: MemoryStore = MemoryStore::new();
//! let id = DatasetId::new("region");
//!
//! let first = store.upsert(&id, json!([[0, 0], [1, 0], [1, 1]])).unwrap();
//! assert!(first.is_changed());
//!
//! // Same content, different formatting: no change.
//! let again = store.upsert(&id, json!([[0.0, 0], [1, 0.0], [1, 1]])).unwrap();
//! assert!(!again.is_changed());
//! assert_eq!(first.hash(), again.hash());
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic pairs**: hash and payload are replaced together under one lock
//! - **Hash outside the lock**: canonicalization runs before the write lock is taken
//! - **No deletion**: datasets live for the lifetime of the process

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{DatasetStore, UpsertOutcome};
