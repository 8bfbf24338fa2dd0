//! The payload abstraction.
//!
//! The synchronization core never inspects payloads. It only needs to
//! serialize them for the wire and derive a canonical form to hash.

use serde::Serialize;
use serde_json::Value;

use crate::canonical::canonical_json;
use crate::hash::{ContentHash, HashAlgorithm};

/// An opaque dataset payload.
///
/// `canonical_bytes` must be a pure function of the payload's logical
/// content: structurally equal payloads yield identical bytes.
pub trait Payload: Serialize + Send + Sync + 'static {
    /// Deterministic byte encoding of the payload's content.
    fn canonical_bytes(&self) -> Vec<u8>;

    /// Content hash of the payload under the given algorithm.
    fn content_hash(&self, algorithm: HashAlgorithm) -> ContentHash {
        algorithm.digest(&self.canonical_bytes())
    }
}

impl Payload for Value {
    fn canonical_bytes(&self) -> Vec<u8> {
        canonical_json(self)
    }
}
