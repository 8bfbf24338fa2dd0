//! Store trait: the abstract interface for dataset storage.

use std::sync::Arc;

use geosync_core::{ContentHash, Dataset, DatasetId, HashAlgorithm, Payload};

use crate::error::Result;

/// Result of writing a payload to a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was unseen; the dataset was created.
    Created { hash: ContentHash },
    /// The content changed; the entry was replaced.
    Updated {
        previous: ContentHash,
        hash: ContentHash,
    },
    /// Same content as stored (idempotent, not an error).
    Unchanged { hash: ContentHash },
}

impl UpsertOutcome {
    /// Whether the write changed the stored content.
    pub fn is_changed(&self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged { .. })
    }

    /// The dataset's hash after the write.
    pub fn hash(&self) -> ContentHash {
        match self {
            UpsertOutcome::Created { hash }
            | UpsertOutcome::Updated { hash, .. }
            | UpsertOutcome::Unchanged { hash } => *hash,
        }
    }
}

/// The dataset store: authoritative id -> (hash, payload) mapping.
///
/// Implementations must replace hash and payload atomically, and must hash
/// the payload's canonical form so that logically equal payloads compare
/// equal regardless of key order or formatting.
pub trait DatasetStore: Send + Sync {
    /// Payload type held by this store.
    type Payload: Payload;

    /// Write a payload, replacing the entry only if its content changed.
    fn upsert(&self, id: &DatasetId, payload: Self::Payload) -> Result<UpsertOutcome>;

    /// Get a dataset by id.
    fn get(&self, id: &DatasetId) -> Result<Option<Dataset<Self::Payload>>>;

    /// Get only the current hash of a dataset.
    fn hash_of(&self, id: &DatasetId) -> Result<Option<ContentHash>>;

    /// All known dataset ids, sorted.
    fn ids(&self) -> Result<Vec<DatasetId>>;

    /// Number of datasets.
    fn len(&self) -> Result<usize>;

    /// Whether the store holds no datasets.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Algorithm used for content hashes.
    fn hash_algorithm(&self) -> HashAlgorithm;
}

impl<S: DatasetStore + ?Sized> DatasetStore for Arc<S> {
    type Payload = S::Payload;

    fn upsert(&self, id: &DatasetId, payload: Self::Payload) -> Result<UpsertOutcome> {
        (**self).upsert(id, payload)
    }

    fn get(&self, id: &DatasetId) -> Result<Option<Dataset<Self::Payload>>> {
        (**self).get(id)
    }

    fn hash_of(&self, id: &DatasetId) -> Result<Option<ContentHash>> {
        (**self).hash_of(id)
    }

    fn ids(&self) -> Result<Vec<DatasetId>> {
        (**self).ids()
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        (**self).hash_algorithm()
    }
}
