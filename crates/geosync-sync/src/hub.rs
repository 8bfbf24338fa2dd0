//! The sync hub: broadcast on change, resync on connect.
//!
//! All state-changing paths for one dataset (`submit`, `broadcast`,
//! `attach`) run under that dataset's lane lock. A connection attaching
//! while a write is in flight is therefore either in the broadcast snapshot
//! or sees the new hash during resync, never neither. Lanes are plain
//! `std::sync::Mutex`es; nothing awaits while holding one because delivery
//! uses `try_send`. A lane is dropped from the table as soon as no caller
//! holds it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use geosync_core::{ContentHash, DatasetId, UpdateMessage};
use geosync_store::{DatasetStore, UpsertOutcome};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::registry::{ConnectionId, Subscriber, SubscriptionRegistry};

/// Tunables for the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Per-connection queue depth. A subscriber whose queue is full is pruned.
    pub outbox_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { outbox_capacity: 64 }
    }
}

/// What connect-time resync decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncDecision {
    /// The client already has the current content (or neither side has any).
    UpToDate,
    /// The client is stale; the current update was queued.
    Resent { hash: ContentHash },
    /// The client reported a hash but the dataset has never been written.
    NothingToSend,
}

impl ResyncDecision {
    /// Compare a client-reported hash with the server's.
    ///
    /// A blank client hash counts as absent. A hash that does not parse can
    /// never match, so it leads to a resend.
    pub fn evaluate(client_hash: Option<&str>, server_hash: Option<&ContentHash>) -> Self {
        let client_hash = client_hash.map(str::trim).filter(|h| !h.is_empty());
        match (client_hash, server_hash) {
            (None, None) => ResyncDecision::UpToDate,
            (Some(_), None) => ResyncDecision::NothingToSend,
            (Some(client), Some(server)) if server.matches_hex(client) => ResyncDecision::UpToDate,
            (_, Some(server)) => ResyncDecision::Resent { hash: *server },
        }
    }

    /// Whether an update was queued.
    pub fn sends_update(&self) -> bool {
        matches!(self, ResyncDecision::Resent { .. })
    }
}

/// Outcome of fanning one update out to a dataset's subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub dataset_id: DatasetId,
    /// Hash that was sent; `None` if the dataset has never been written.
    pub hash: Option<ContentHash>,
    /// Subscribers whose outbox accepted the update.
    pub delivered: usize,
    /// Subscribers dropped because their outbox was full or closed.
    pub pruned: Vec<ConnectionId>,
}

impl BroadcastReport {
    fn empty(dataset_id: &DatasetId) -> Self {
        Self {
            dataset_id: dataset_id.clone(),
            hash: None,
            delivered: 0,
            pruned: Vec::new(),
        }
    }
}

/// Outcome of an ingestion: the store write and, if it changed content, the broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub dataset_id: DatasetId,
    pub outcome: UpsertOutcome,
    pub broadcast: Option<BroadcastReport>,
}

impl SubmitReport {
    pub fn changed(&self) -> bool {
        self.outcome.is_changed()
    }

    pub fn hash(&self) -> ContentHash {
        self.outcome.hash()
    }

    pub fn delivered(&self) -> usize {
        self.broadcast.as_ref().map_or(0, |b| b.delivered)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client closed the connection or the stream ended.
    ClientClosed,
    /// Reading from the client failed.
    ReceiveFailed(String),
    /// Writing to the client failed.
    SendFailed(String),
    /// The hub dropped the subscriber after a failed delivery.
    Pruned,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientClosed => f.write_str("client closed"),
            DisconnectReason::ReceiveFailed(e) => write!(f, "receive failed: {}", e),
            DisconnectReason::SendFailed(e) => write!(f, "send failed: {}", e),
            DisconnectReason::Pruned => f.write_str("pruned"),
        }
    }
}

/// A freshly attached connection: its identity, its outbox receiver and
/// what resync decided.
#[derive(Debug)]
pub struct Attachment<P> {
    pub connection_id: ConnectionId,
    pub dataset_id: DatasetId,
    pub resync: ResyncDecision,
    pub outbox: mpsc::Receiver<UpdateMessage<P>>,
}

/// Coordinates the store and the registry.
pub struct SyncHub<S: DatasetStore> {
    store: S,
    registry: SubscriptionRegistry<S::Payload>,
    lanes: Mutex<HashMap<DatasetId, Arc<Mutex<()>>>>,
    next_connection: AtomicU64,
    config: SyncConfig,
}

impl<S: DatasetStore> SyncHub<S> {
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self {
            store,
            registry: SubscriptionRegistry::new(),
            lanes: Mutex::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &SubscriptionRegistry<S::Payload> {
        &self.registry
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run `f` while holding the dataset's lane.
    ///
    /// A lane lives in the table only while some caller holds it, so ids
    /// that clients merely probe leave nothing behind.
    fn with_lane<T>(&self, dataset_id: &DatasetId, f: impl FnOnce() -> T) -> T {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(lanes.entry(dataset_id.clone()).or_default())
        };
        let result = {
            let _guard = lane.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lane);

        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        if lanes.get(dataset_id).is_some_and(|lane| Arc::strong_count(lane) == 1) {
            lanes.remove(dataset_id);
        }
        result
    }

    /// Number of lanes currently held.
    pub fn active_lanes(&self) -> usize {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Write a payload and, if it changed the dataset, broadcast it.
    pub fn submit(&self, dataset_id: &DatasetId, payload: S::Payload) -> Result<SubmitReport> {
        self.with_lane(dataset_id, || -> Result<SubmitReport> {
            let outcome = self.store.upsert(dataset_id, payload)?;
            let broadcast = if outcome.is_changed() {
                Some(self.broadcast_locked(dataset_id)?)
            } else {
                tracing::debug!(dataset = %dataset_id, hash = %outcome.hash(), "content unchanged, nothing to broadcast");
                None
            };

            Ok(SubmitReport {
                dataset_id: dataset_id.clone(),
                outcome,
                broadcast,
            })
        })
    }

    /// Send the current state of a dataset to every subscriber.
    pub fn broadcast(&self, dataset_id: &DatasetId) -> Result<BroadcastReport> {
        self.with_lane(dataset_id, || self.broadcast_locked(dataset_id))
    }

    fn broadcast_locked(&self, dataset_id: &DatasetId) -> Result<BroadcastReport> {
        let Some(dataset) = self.store.get(dataset_id)? else {
            tracing::debug!(dataset = %dataset_id, "broadcast for unknown dataset ignored");
            return Ok(BroadcastReport::empty(dataset_id));
        };

        let message = dataset.to_update();
        let mut report = BroadcastReport {
            hash: Some(dataset.hash),
            ..BroadcastReport::empty(dataset_id)
        };

        for subscriber in self.registry.connections_for(dataset_id) {
            match subscriber.deliver(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    tracing::warn!(
                        dataset = %dataset_id,
                        connection = %subscriber.id,
                        reason = %failure,
                        "delivery failed, pruning subscriber"
                    );
                    self.registry.unregister(subscriber.id);
                    report.pruned.push(subscriber.id);
                }
            }
        }

        tracing::info!(
            dataset = %dataset_id,
            hash = %dataset.hash,
            delivered = report.delivered,
            pruned = report.pruned.len(),
            "update broadcast"
        );

        Ok(report)
    }

    /// Register a new connection and resync it against the current state.
    pub fn attach(
        &self,
        dataset_id: DatasetId,
        client_hash: Option<String>,
    ) -> Result<Attachment<S::Payload>> {
        let connection_id = ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.outbox_capacity.max(1));
        let client_hash = client_hash.filter(|h| !h.trim().is_empty());
        let subscriber = Subscriber::new(connection_id, dataset_id.clone(), client_hash, tx);

        let resync = self.with_lane(&dataset_id, || {
            self.registry.register(subscriber.clone());
            self.resync_locked(&subscriber).map_err(|e| {
                self.registry.unregister(connection_id);
                e
            })
        })?;

        tracing::info!(
            connection = %connection_id,
            dataset = %dataset_id,
            resync = ?resync,
            "connection attached"
        );

        Ok(Attachment {
            connection_id,
            dataset_id,
            resync,
            outbox: rx,
        })
    }

    /// Queue the current update for a subscriber whose hash is stale.
    pub fn resync_if_stale(&self, subscriber: &Subscriber<S::Payload>) -> Result<ResyncDecision> {
        self.with_lane(&subscriber.dataset_id, || self.resync_locked(subscriber))
    }

    fn resync_locked(&self, subscriber: &Subscriber<S::Payload>) -> Result<ResyncDecision> {
        let dataset = self.store.get(&subscriber.dataset_id)?;
        let decision = ResyncDecision::evaluate(
            subscriber.last_known_hash.as_deref(),
            dataset.as_ref().map(|d| &d.hash),
        );

        match (&decision, dataset) {
            (ResyncDecision::Resent { hash }, Some(dataset)) => {
                if let Err(failure) = subscriber.deliver(dataset.to_update()) {
                    tracing::warn!(
                        dataset = %subscriber.dataset_id,
                        connection = %subscriber.id,
                        reason = %failure,
                        "resync delivery failed, pruning subscriber"
                    );
                    self.registry.unregister(subscriber.id);
                } else {
                    tracing::debug!(
                        dataset = %subscriber.dataset_id,
                        connection = %subscriber.id,
                        hash = %hash,
                        "stale client resynced"
                    );
                }
            }
            (ResyncDecision::NothingToSend, _) => {
                tracing::debug!(
                    dataset = %subscriber.dataset_id,
                    connection = %subscriber.id,
                    "client reported a hash for an unwritten dataset"
                );
            }
            _ => {}
        }

        Ok(decision)
    }

    /// Drop a connection from the registry after its session ended.
    ///
    /// Returns `false` if it was already gone (e.g. pruned by a broadcast).
    pub fn detach(&self, connection_id: ConnectionId, reason: &DisconnectReason) -> bool {
        match self.registry.unregister(connection_id) {
            Some(subscriber) => {
                tracing::info!(
                    connection = %connection_id,
                    dataset = %subscriber.dataset_id,
                    reason = %reason,
                    "connection detached"
                );
                true
            }
            None => {
                tracing::debug!(connection = %connection_id, reason = %reason, "connection already detached");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_store::MemoryStore;
    use serde_json::{json, Value};

    fn hub() -> SyncHub<MemoryStore> {
        SyncHub::new(MemoryStore::new(), SyncConfig::default())
    }

    fn points(coords: &[(f64, f64)]) -> Value {
        Value::Array(coords.iter().map(|(x, y)| json!({"x": x, "y": y})).collect())
    }

    fn drain(rx: &mut mpsc::Receiver<UpdateMessage<Value>>) -> Vec<UpdateMessage<Value>> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_evaluate_table() {
        let server = ContentHash::from_bytes([0x11; 32]);
        let hex = server.to_hex();

        assert_eq!(ResyncDecision::evaluate(None, None), ResyncDecision::UpToDate);
        assert_eq!(ResyncDecision::evaluate(Some("   "), None), ResyncDecision::UpToDate);
        assert_eq!(ResyncDecision::evaluate(Some("abc"), None), ResyncDecision::NothingToSend);
        assert_eq!(ResyncDecision::evaluate(Some(&hex), Some(&server)), ResyncDecision::UpToDate);
        assert_eq!(
            ResyncDecision::evaluate(Some(&hex.to_uppercase()), Some(&server)),
            ResyncDecision::UpToDate
        );
        assert_eq!(
            ResyncDecision::evaluate(None, Some(&server)),
            ResyncDecision::Resent { hash: server }
        );
        assert_eq!(
            ResyncDecision::evaluate(Some(""), Some(&server)),
            ResyncDecision::Resent { hash: server }
        );
        assert_eq!(
            ResyncDecision::evaluate(Some("not-a-hash"), Some(&server)),
            ResyncDecision::Resent { hash: server }
        );

        assert!(ResyncDecision::Resent { hash: server }.sends_update());
        assert!(!ResyncDecision::UpToDate.sends_update());
        assert!(!ResyncDecision::NothingToSend.sends_update());
    }

    #[test]
    fn test_submit_unchanged_does_not_broadcast() {
        let hub = hub();
        let id = DatasetId::new("region");
        let first = hub.submit(&id, points(&[(0.0, 0.0)])).unwrap();
        let mut attached = hub.attach(id.clone(), Some(first.hash().to_hex())).unwrap();

        let second = hub.submit(&id, points(&[(0.0, 0.0)])).unwrap();
        assert!(!second.changed());
        assert_eq!(second.hash(), first.hash());
        assert!(second.broadcast.is_none());
        assert_eq!(second.delivered(), 0);
        assert!(drain(&mut attached.outbox).is_empty());
    }

    #[test]
    fn test_broadcast_reaches_only_watchers_of_that_dataset() {
        let hub = hub();
        let region = DatasetId::new("region");
        let other = DatasetId::new("other");

        let mut a = hub.attach(region.clone(), None).unwrap();
        let mut b = hub.attach(region.clone(), None).unwrap();
        let mut c = hub.attach(other.clone(), None).unwrap();

        let report = hub.submit(&region, points(&[(1.0, 2.0)])).unwrap();
        assert!(report.changed());
        assert_eq!(report.delivered(), 2);

        for attachment in [&mut a, &mut b] {
            let got = drain(&mut attachment.outbox);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].hash, report.hash());
            assert_eq!(*got[0].data, points(&[(1.0, 2.0)]));
        }
        assert!(drain(&mut c.outbox).is_empty());
    }

    #[test]
    fn test_broadcast_survives_disconnected_subscriber() {
        let hub = hub();
        let id = DatasetId::new("region");
        let gone = hub.attach(id.clone(), None).unwrap();
        let mut stays = hub.attach(id.clone(), None).unwrap();
        let gone_id = gone.connection_id;
        drop(gone);

        let report = hub.submit(&id, points(&[(3.0, 4.0)])).unwrap();
        let broadcast = report.broadcast.unwrap();
        assert_eq!(broadcast.delivered, 1);
        assert_eq!(broadcast.pruned, vec![gone_id]);
        assert_eq!(drain(&mut stays.outbox).len(), 1);
        assert_eq!(hub.registry().connection_count(), 1);
    }

    #[test]
    fn test_full_outbox_is_pruned() {
        let hub: SyncHub<MemoryStore> = SyncHub::new(MemoryStore::new(), SyncConfig { outbox_capacity: 1 });
        let id = DatasetId::new("region");
        let mut slow = hub.attach(id.clone(), None).unwrap();

        hub.submit(&id, points(&[(1.0, 1.0)])).unwrap();
        let report = hub.submit(&id, points(&[(2.0, 2.0)])).unwrap();
        assert_eq!(report.broadcast.unwrap().pruned, vec![slow.connection_id]);
        assert!(hub.registry().dataset_of(slow.connection_id).is_none());

        // The queued update still drains, then the outbox reports closed.
        assert_eq!(drain(&mut slow.outbox).len(), 1);
        assert!(slow.outbox.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_unknown_dataset_is_noop() {
        let hub = hub();
        let report = hub.broadcast(&DatasetId::new("never")).unwrap();
        assert_eq!(report.hash, None);
        assert_eq!(report.delivered, 0);
        assert!(report.pruned.is_empty());
    }

    #[test]
    fn test_attach_with_current_hash_sends_nothing() {
        let hub = hub();
        let id = DatasetId::new("region");
        let hash = hub.submit(&id, points(&[(0.0, 0.0)])).unwrap().hash();

        let mut attached = hub.attach(id, Some(hash.to_hex())).unwrap();
        assert_eq!(attached.resync, ResyncDecision::UpToDate);
        assert!(drain(&mut attached.outbox).is_empty());
    }

    #[test]
    fn test_attach_with_stale_or_missing_hash_sends_once() {
        let hub = hub();
        let id = DatasetId::new("region");
        let hash = hub.submit(&id, points(&[(0.0, 0.0)])).unwrap().hash();

        for client_hash in [None, Some("0".repeat(64)), Some("garbage".to_string())] {
            let mut attached = hub.attach(id.clone(), client_hash).unwrap();
            assert_eq!(attached.resync, ResyncDecision::Resent { hash });
            let got = drain(&mut attached.outbox);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].hash, hash);
        }
    }

    #[test]
    fn test_attach_to_unwritten_dataset() {
        let hub = hub();
        let id = DatasetId::new("later");

        let mut silent = hub.attach(id.clone(), None).unwrap();
        assert_eq!(silent.resync, ResyncDecision::UpToDate);
        let mut hopeful = hub.attach(id.clone(), Some("ab".repeat(32))).unwrap();
        assert_eq!(hopeful.resync, ResyncDecision::NothingToSend);
        assert!(drain(&mut silent.outbox).is_empty());
        assert!(drain(&mut hopeful.outbox).is_empty());

        // Both stay registered and receive the first write.
        hub.submit(&id, points(&[(5.0, 5.0)])).unwrap();
        assert_eq!(drain(&mut silent.outbox).len(), 1);
        assert_eq!(drain(&mut hopeful.outbox).len(), 1);
    }

    #[test]
    fn test_detach() {
        let hub = hub();
        let attached = hub.attach(DatasetId::new("region"), None).unwrap();
        let id = attached.connection_id;

        assert!(hub.detach(id, &DisconnectReason::ClientClosed));
        assert!(!hub.detach(id, &DisconnectReason::ClientClosed));
        assert_eq!(hub.registry().connection_count(), 0);
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let hub = hub();
        let a = hub.attach(DatasetId::new("x"), None).unwrap();
        let b = hub.attach(DatasetId::new("x"), None).unwrap();
        assert_ne!(a.connection_id, b.connection_id);
    }

    #[test]
    fn test_attach_racing_writes_never_misses_an_update() {
        let hub = Arc::new(hub());
        let id = DatasetId::new("race");

        let writer = {
            let hub = Arc::clone(&hub);
            let id = id.clone();
            std::thread::spawn(move || {
                (0..50)
                    .map(|i| hub.submit(&id, json!({ "step": i })).unwrap().hash())
                    .collect::<Vec<_>>()
            })
        };

        let mut attachments = Vec::new();
        for _ in 0..20 {
            attachments.push(hub.attach(id.clone(), None).unwrap());
        }
        let written = writer.join().unwrap();

        let final_hash = hub.store().hash_of(&id).unwrap().unwrap();
        assert_eq!(written.last(), Some(&final_hash));
        for mut attachment in attachments {
            // Drain everything; capacity 64 is enough for 50 writes plus resync.
            let got: Vec<ContentHash> = drain(&mut attachment.outbox).iter().map(|m| m.hash).collect();
            assert_eq!(got.last(), Some(&final_hash));

            // Updates arrive in write order: each one is a later write than the last.
            let mut remaining = written.iter();
            for hash in &got {
                assert!(
                    remaining.any(|w| w == hash),
                    "update {} arrived out of write order",
                    hash
                );
            }
        }
        assert_eq!(hub.active_lanes(), 0);
    }

    #[test]
    fn test_lanes_released_after_use() {
        let hub = hub();
        for i in 0..1_000 {
            let attached = hub.attach(DatasetId::new(format!("junk-{}", i)), None).unwrap();
            hub.detach(attached.connection_id, &DisconnectReason::ClientClosed);
        }
        assert_eq!(hub.registry().connection_count(), 0);
        assert_eq!(hub.active_lanes(), 0);

        let id = DatasetId::new("region");
        hub.submit(&id, points(&[(1.0, 1.0)])).unwrap();
        hub.broadcast(&id).unwrap();
        assert_eq!(hub.active_lanes(), 0);
    }

    #[test]
    fn test_disconnect_reason_display() {
        assert_eq!(DisconnectReason::Pruned.to_string(), "pruned");
        assert_eq!(
            DisconnectReason::SendFailed("broken pipe".into()).to_string(),
            "send failed: broken pipe"
        );
    }
}
