//! # GeoSync Core
//!
//! Pure primitives for GeoSync: dataset identifiers, content hashes, the
//! canonical JSON form, and the update message clients receive.
//!
//! This crate contains no I/O, no locking, no networking.
//!
//! ## Key Types
//!
//! - [`DatasetId`] - Stable string key of one dataset
//! - [`ContentHash`] - 32-byte digest of a payload's canonical form
//! - [`HashAlgorithm`] - Which digest produces content hashes (SHA-256 or BLAKE3)
//! - [`Payload`] - A serializable value with a canonical form
//! - [`Dataset`] - A payload paired with its content hash
//! - [`UpdateMessage`] - The wire representation of a dataset's current state
//!
//! ## Canonicalization
//!
//! JSON payloads are hashed over their canonical form: sorted object keys, no
//! insignificant whitespace, normalized numbers. See the [`canonical`] module.

pub mod canonical;
pub mod error;
pub mod hash;
pub mod message;
pub mod payload;
pub mod types;

pub use canonical::{canonical_json, canonical_string};
pub use error::{CoreError, Result};
pub use hash::{ContentHash, HashAlgorithm};
pub use message::UpdateMessage;
pub use payload::Payload;
pub use types::{Dataset, DatasetId};
