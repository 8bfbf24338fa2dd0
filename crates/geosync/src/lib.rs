//! # GeoSync
//!
//! Named datasets held by a server and pushed to every client watching
//! them, without resending data a client already has.
//!
//! ## Overview
//!
//! - **Content hashing**: every write is hashed over its canonical JSON
//!   form, so a write that only reorders keys or reformats numbers is not a
//!   change
//! - **Broadcast on change**: real changes are queued to each subscriber's
//!   own outbox; a dead subscriber never blocks the rest
//! - **Resync on connect**: a client reports the hash it last saw and gets
//!   the full dataset only if that hash is stale
//!
//! ## Usage
//!
//! ```rust
//! use geosync::{canonicalize_document, hash_document, HashAlgorithm};
//!
//! let a = hash_document(r#"{"y": 2, "x": 1.0}"#, HashAlgorithm::Sha256).unwrap();
//! let b = hash_document(r#"{"x":1,"y":2}"#, HashAlgorithm::Sha256).unwrap();
//! assert_eq!(a, b);
//!
//! assert_eq!(canonicalize_document(r#"{ "y": 2, "x": 1.0 }"#).unwrap(), r#"{"x":1,"y":2}"#);
//! ```
//!
//! ## Re-exports
//!
//! - `geosync::core` - dataset ids, hashes, canonical form, update message
//! - `geosync::store` - the dataset store
//! - `geosync::sync` - registry, hub and session actor
//! - `geosync::server` - the axum server, gateway and configuration

pub mod error;

pub use geosync_core as core;
pub use geosync_server as server;
pub use geosync_store as store;
pub use geosync_sync as sync;

pub use error::{GeoSyncError, Result};

pub use geosync_core::{
    canonical_string, ContentHash, Dataset, DatasetId, HashAlgorithm, Payload, UpdateMessage,
};
pub use geosync_server::{GeoSyncServer, PointsPayload, ServerConfig};
pub use geosync_store::{DatasetStore, MemoryStore, UpsertOutcome};
pub use geosync_sync::{ResyncDecision, SubmitReport, SyncConfig, SyncHub};

use serde_json::Value;

/// Parse a JSON document and hash its canonical form.
pub fn hash_document(text: &str, algorithm: HashAlgorithm) -> Result<ContentHash> {
    let value = parse_document(text)?;
    Ok(value.content_hash(algorithm))
}

/// Parse a JSON document and return its canonical form.
pub fn canonicalize_document(text: &str) -> Result<String> {
    let value = parse_document(text)?;
    Ok(canonical_string(&value))
}

fn parse_document(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| GeoSyncError::Core(e.into()))
}
