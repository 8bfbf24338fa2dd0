//! Strong type definitions for GeoSync.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::message::UpdateMessage;

/// Stable string key identifying one logical dataset.
///
/// Any string is a valid id at this layer; length limits and similar policy
/// belong to whoever accepts ids from the outside world.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    /// Create a new dataset id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the id in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the id is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatasetId({:?})", self.0)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DatasetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for DatasetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DatasetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A dataset's current state: the payload and the hash of its canonical form.
///
/// The pair is only ever replaced as a unit by the store, so `hash` always
/// matches `payload`.
#[derive(Debug)]
pub struct Dataset<P> {
    pub id: DatasetId,
    pub hash: ContentHash,
    pub payload: Arc<P>,
}

impl<P> Dataset<P> {
    /// Build the update message that carries this dataset to clients.
    pub fn to_update(&self) -> UpdateMessage<P> {
        UpdateMessage {
            dataset_id: self.id.clone(),
            hash: self.hash,
            data: Arc::clone(&self.payload),
        }
    }
}

impl<P> Clone for Dataset<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            hash: self.hash,
            payload: Arc::clone(&self.payload),
        }
    }
}
