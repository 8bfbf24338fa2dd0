//! In-memory implementation of the DatasetStore trait.
//!
//! All data is lost when the store is dropped. Thread-safe via a single
//! coarse `RwLock`: reads (hash lookups on every connect) proceed in
//! parallel, writes hold the lock only for the map update since hashing is
//! done beforehand.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use geosync_core::{ContentHash, Dataset, DatasetId, HashAlgorithm, Payload};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::traits::{DatasetStore, UpsertOutcome};

/// In-memory dataset store.
pub struct MemoryStore<P = Value> {
    algorithm: HashAlgorithm,
    datasets: RwLock<HashMap<DatasetId, StoredDataset<P>>>,
}

struct StoredDataset<P> {
    hash: ContentHash,
    payload: Arc<P>,
}

impl<P: Payload> MemoryStore<P> {
    /// Create a new empty store hashing with SHA-256.
    pub fn new() -> Self {
        Self::with_algorithm(HashAlgorithm::default())
    }

    /// Create a new empty store with the given hash algorithm.
    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            datasets: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<DatasetId, StoredDataset<P>>>> {
        self.datasets.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<DatasetId, StoredDataset<P>>>> {
        self.datasets.write().map_err(|_| StoreError::Poisoned)
    }
}

impl<P: Payload> Default for MemoryStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload> DatasetStore for MemoryStore<P> {
    type Payload = P;

    fn upsert(&self, id: &DatasetId, payload: P) -> Result<UpsertOutcome> {
        let hash = payload.content_hash(self.algorithm);
        let mut datasets = self.write()?;

        let outcome = match datasets.entry(id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(StoredDataset {
                    hash,
                    payload: Arc::new(payload),
                });
                UpsertOutcome::Created { hash }
            }
            Entry::Occupied(slot) if slot.get().hash == hash => UpsertOutcome::Unchanged { hash },
            Entry::Occupied(mut slot) => {
                let previous = slot.get().hash;
                slot.insert(StoredDataset {
                    hash,
                    payload: Arc::new(payload),
                });
                UpsertOutcome::Updated { previous, hash }
            }
        };
        drop(datasets);

        match &outcome {
            UpsertOutcome::Created { hash } => {
                tracing::debug!(dataset = %id, hash = %hash, "dataset created");
            }
            UpsertOutcome::Updated { previous, hash } => {
                tracing::debug!(dataset = %id, previous = %previous, hash = %hash, "dataset updated");
            }
            UpsertOutcome::Unchanged { hash } => {
                tracing::trace!(dataset = %id, hash = %hash, "dataset unchanged");
            }
        }

        Ok(outcome)
    }

    fn get(&self, id: &DatasetId) -> Result<Option<Dataset<P>>> {
        let datasets = self.read()?;
        Ok(datasets.get(id).map(|stored| Dataset {
            id: id.clone(),
            hash: stored.hash,
            payload: Arc::clone(&stored.payload),
        }))
    }

    fn hash_of(&self, id: &DatasetId) -> Result<Option<ContentHash>> {
        let datasets = self.read()?;
        Ok(datasets.get(id).map(|stored| stored.hash))
    }

    fn ids(&self) -> Result<Vec<DatasetId>> {
        let datasets = self.read()?;
        let mut ids: Vec<DatasetId> = datasets.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}
