//! Subscription registry: which connections watch which dataset.
//!
//! The registry is a pair of maps kept consistent under one lock:
//! dataset id -> connections, and connection -> dataset id. Every mutation
//! leaves both maps valid, so a poisoned lock is recovered instead of
//! surfaced; registry operations never fail.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use geosync_core::{DatasetId, UpdateMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identity of one live client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw connection number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw connection number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why an update could not be queued for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The outbox is at capacity; the client is not keeping up.
    OutboxFull,
    /// The session has ended and dropped its receiver.
    OutboxClosed,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryFailure::OutboxFull => f.write_str("outbox full"),
            DeliveryFailure::OutboxClosed => f.write_str("outbox closed"),
        }
    }
}

/// One registered connection and the sending half of its outbox.
pub struct Subscriber<P> {
    pub id: ConnectionId,
    pub dataset_id: DatasetId,
    /// Hash the client reported when it connected, if any.
    pub last_known_hash: Option<String>,
    outbox: mpsc::Sender<UpdateMessage<P>>,
}

impl<P> Subscriber<P> {
    pub fn new(
        id: ConnectionId,
        dataset_id: DatasetId,
        last_known_hash: Option<String>,
        outbox: mpsc::Sender<UpdateMessage<P>>,
    ) -> Self {
        Self {
            id,
            dataset_id,
            last_known_hash,
            outbox,
        }
    }

    /// Queue a message without waiting.
    pub fn deliver(&self, message: UpdateMessage<P>) -> Result<(), DeliveryFailure> {
        self.outbox.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::OutboxFull,
            TrySendError::Closed(_) => DeliveryFailure::OutboxClosed,
        })
    }

    /// Whether the session side has gone away.
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}

impl<P> Clone for Subscriber<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            dataset_id: self.dataset_id.clone(),
            last_known_hash: self.last_known_hash.clone(),
            outbox: self.outbox.clone(),
        }
    }
}

impl<P> fmt::Debug for Subscriber<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("dataset_id", &self.dataset_id)
            .field("last_known_hash", &self.last_known_hash)
            .finish_non_exhaustive()
    }
}

struct RegistryInner<P> {
    by_dataset: HashMap<DatasetId, HashMap<ConnectionId, Subscriber<P>>>,
    owners: HashMap<ConnectionId, DatasetId>,
}

impl<P> RegistryInner<P> {
    fn remove(&mut self, id: ConnectionId) -> Option<Subscriber<P>> {
        let dataset_id = self.owners.remove(&id)?;
        let set = self.by_dataset.get_mut(&dataset_id)?;
        let removed = set.remove(&id);
        if set.is_empty() {
            self.by_dataset.remove(&dataset_id);
        }
        removed
    }
}

/// Live subscribers grouped by dataset id.
pub struct SubscriptionRegistry<P> {
    inner: RwLock<RegistryInner<P>>,
}

impl<P> SubscriptionRegistry<P> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                by_dataset: HashMap::new(),
                owners: HashMap::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner<P>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner<P>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a subscriber under its dataset id.
    ///
    /// Registering an id that is already present replaces the old entry,
    /// moving it if the dataset differs. Returns `true` if the id was new.
    pub fn register(&self, subscriber: Subscriber<P>) -> bool {
        let mut inner = self.write();
        let id = subscriber.id;
        let dataset_id = subscriber.dataset_id.clone();

        let previous = inner.remove(id);
        inner.owners.insert(id, dataset_id.clone());
        inner
            .by_dataset
            .entry(dataset_id.clone())
            .or_default()
            .insert(id, subscriber);
        let watchers = inner.by_dataset.get(&dataset_id).map_or(0, HashMap::len);
        drop(inner);

        match &previous {
            Some(old) if old.dataset_id != dataset_id => {
                tracing::debug!(connection = %id, from = %old.dataset_id, to = %dataset_id, "subscriber moved");
            }
            Some(_) => {
                tracing::debug!(connection = %id, dataset = %dataset_id, "subscriber re-registered");
            }
            None => {
                tracing::debug!(connection = %id, dataset = %dataset_id, watchers, "subscriber registered");
            }
        }

        previous.is_none()
    }

    /// Remove a subscriber wherever it is registered. No-op if absent.
    pub fn unregister(&self, id: ConnectionId) -> Option<Subscriber<P>> {
        let removed = self.write().remove(id);
        if let Some(sub) = &removed {
            tracing::debug!(connection = %id, dataset = %sub.dataset_id, "subscriber unregistered");
        }
        removed
    }

    /// Point-in-time snapshot of the subscribers of a dataset, in connection order.
    pub fn connections_for(&self, dataset_id: &DatasetId) -> Vec<Subscriber<P>> {
        let inner = self.read();
        let mut subs: Vec<Subscriber<P>> = inner
            .by_dataset
            .get(dataset_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();
        drop(inner);
        subs.sort_by_key(|s| s.id);
        subs
    }

    /// Dataset a connection is bound to.
    pub fn dataset_of(&self, id: ConnectionId) -> Option<DatasetId> {
        self.read().owners.get(&id).cloned()
    }

    /// Total number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.read().owners.len()
    }

    /// Datasets with at least one subscriber and their subscriber counts, sorted by id.
    pub fn watched_datasets(&self) -> Vec<(DatasetId, usize)> {
        let inner = self.read();
        let mut watched: Vec<(DatasetId, usize)> = inner
            .by_dataset
            .iter()
            .map(|(id, set)| (id.clone(), set.len()))
            .collect();
        drop(inner);
        watched.sort();
        watched
    }
}

impl<P> Default for SubscriptionRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_core::ContentHash;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn subscriber(
        id: u64,
        dataset: &str,
    ) -> (Subscriber<Value>, mpsc::Receiver<UpdateMessage<Value>>) {
        let (tx, rx) = mpsc::channel(4);
        (
            Subscriber::new(ConnectionId::new(id), DatasetId::new(dataset), None, tx),
            rx,
        )
    }

    fn message(dataset: &str) -> UpdateMessage<Value> {
        UpdateMessage {
            dataset_id: DatasetId::new(dataset),
            hash: ContentHash::from_bytes([7; 32]),
            data: Arc::new(json!([1])),
        }
    }

    #[test]
    fn test_register_and_snapshot() {
        let registry = SubscriptionRegistry::new();
        let (a, _ra) = subscriber(2, "region");
        let (b, _rb) = subscriber(1, "region");
        let (c, _rc) = subscriber(3, "other");

        assert!(registry.register(a));
        assert!(registry.register(b));
        assert!(registry.register(c));

        let ids: Vec<u64> = registry
            .connections_for(&DatasetId::new("region"))
            .iter()
            .map(|s| s.id.get())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(registry.connection_count(), 3);
        assert!(registry.connections_for(&DatasetId::new("nobody")).is_empty());
    }

    #[test]
    fn test_reregister_replaces_instead_of_duplicating() {
        let registry = SubscriptionRegistry::new();
        let (a, _ra) = subscriber(1, "region");
        assert!(registry.register(a.clone()));
        assert!(!registry.register(a));

        assert_eq!(registry.connections_for(&DatasetId::new("region")).len(), 1);
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_reregister_moves_between_datasets() {
        let registry = SubscriptionRegistry::new();
        let (a, _ra) = subscriber(1, "first");
        let (moved, _rm) = subscriber(1, "second");
        registry.register(a);
        registry.register(moved);

        assert!(registry.connections_for(&DatasetId::new("first")).is_empty());
        assert_eq!(registry.connections_for(&DatasetId::new("second")).len(), 1);
        assert_eq!(
            registry.dataset_of(ConnectionId::new(1)),
            Some(DatasetId::new("second"))
        );
        assert_eq!(registry.watched_datasets(), vec![(DatasetId::new("second"), 1)]);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let (a, _ra) = subscriber(1, "region");
        registry.register(a);

        assert!(registry.unregister(ConnectionId::new(1)).is_some());
        assert!(registry.unregister(ConnectionId::new(1)).is_none());
        assert!(registry.unregister(ConnectionId::new(99)).is_none());
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.watched_datasets().is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_unregister() {
        let registry = SubscriptionRegistry::new();
        let (a, mut ra) = subscriber(1, "region");
        registry.register(a);

        let snapshot = registry.connections_for(&DatasetId::new("region"));
        registry.unregister(ConnectionId::new(1));

        assert_eq!(snapshot.len(), 1);
        snapshot[0].deliver(message("region")).unwrap();
        assert_eq!(ra.try_recv().unwrap().dataset_id, DatasetId::new("region"));
    }

    #[test]
    fn test_deliver_reports_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        let sub = Subscriber::new(ConnectionId::new(1), DatasetId::new("d"), None, tx);

        sub.deliver(message("d")).unwrap();
        assert_eq!(sub.deliver(message("d")), Err(DeliveryFailure::OutboxFull));

        drop(rx);
        assert!(sub.is_closed());
        assert_eq!(sub.deliver(message("d")), Err(DeliveryFailure::OutboxClosed));
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(42).to_string(), "conn-42");
    }
}
