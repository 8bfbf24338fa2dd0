//! Test fixtures and helpers.
//!
//! Common setup for end-to-end scenarios: a hub over a memory store and
//! clients connected to it through in-memory transports.

use std::sync::Arc;
use std::time::Duration;

use geosync_core::{ContentHash, DatasetId};
use geosync_server::{Point, PointsPayload, SharedHub};
use geosync_store::MemoryStore;
use geosync_sync::transport::memory::{self, MemoryClient};
use geosync_sync::{run_session, ConnectionId, DisconnectReason, SubmitReport, SyncConfig, SyncHub};
use serde_json::Value;
use tokio::task::JoinHandle;

/// How long a client waits for an expected update before failing.
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a client waits before concluding nothing is coming.
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);

/// The polygon served as `example_dataset_id` by the sample configuration.
pub fn example_polygon() -> Vec<Point> {
    [
        (13.534254900484356, 59.36163702557852),
        (13.553743899236425, 59.35326638347115),
        (13.545203776187767, 59.33897571908756),
        (13.523962957323153, 59.3386407095081),
        (13.529875350202992, 59.34902447016282),
        (13.523525002295015, 59.3541593503185),
        (13.534254900484356, 59.36163702557852),
    ]
    .into_iter()
    .map(|(x, y)| Point::new(x, y))
    .collect()
}

/// Build a stored-form point list from coordinate pairs.
pub fn points(coords: &[(f64, f64)]) -> Value {
    PointsPayload::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect()).into_value()
}

/// A hub with helpers to connect clients and write datasets.
pub struct HubFixture {
    pub hub: SharedHub,
}

impl HubFixture {
    /// Create a hub with default settings.
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create a hub with the given sync settings.
    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            hub: Arc::new(SyncHub::new(MemoryStore::new(), config)),
        }
    }

    /// Write a payload through the hub.
    pub fn write(&self, dataset: &str, payload: Value) -> SubmitReport {
        self.hub
            .submit(&DatasetId::new(dataset), payload)
            .expect("submit failed")
    }

    /// Attach a client and run its session on the current tokio runtime.
    pub fn connect(&self, dataset: &str, hash: Option<&str>) -> TestClient {
        let attachment = self
            .hub
            .attach(DatasetId::new(dataset), hash.map(str::to_string))
            .expect("attach failed");
        let id = attachment.connection_id;
        let (transport, client) = memory::pair();
        let session = tokio::spawn(run_session(Arc::clone(&self.hub), attachment, transport));

        TestClient {
            id,
            client,
            session,
        }
    }
}

impl Default for HubFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The remote end of one connected session.
pub struct TestClient {
    pub id: ConnectionId,
    pub client: MemoryClient,
    session: JoinHandle<DisconnectReason>,
}

impl TestClient {
    /// Wait for the next update message, parsed as JSON.
    pub async fn next_update(&mut self) -> Value {
        let text = tokio::time::timeout(UPDATE_TIMEOUT, self.client.next_text())
            .await
            .expect("timed out waiting for an update")
            .expect("session ended");
        serde_json::from_str(&text).expect("update is not JSON")
    }

    /// Wait for the next update and return its hash.
    pub async fn next_hash(&mut self) -> ContentHash {
        let update = self.next_update().await;
        update["hash"]
            .as_str()
            .and_then(|h| ContentHash::from_hex(h).ok())
            .expect("update carries no valid hash")
    }

    /// Assert that no update arrives within the quiet period.
    pub async fn assert_quiet(&mut self) {
        tokio::time::sleep(QUIET_PERIOD).await;
        if let Some(text) = self.client.try_next_text() {
            panic!("expected no update, got {}", text);
        }
    }

    /// Close the connection and wait for the session to finish.
    pub async fn close(self) -> DisconnectReason {
        self.client.close();
        self.session.await.expect("session panicked")
    }

    /// Wait for the session to end on its own.
    pub async fn finished(self) -> DisconnectReason {
        tokio::time::timeout(UPDATE_TIMEOUT, self.session)
            .await
            .expect("session did not end")
            .expect("session panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_points_helper() {
        assert_eq!(
            points(&[(0.0, 1.0)]),
            json!([{"x": 0.0, "y": 1.0}])
        );
    }

    #[test]
    fn test_example_polygon_is_closed() {
        let polygon = example_polygon();
        assert_eq!(polygon.len(), 7);
        assert_eq!(polygon.first(), polygon.last());
    }

    #[tokio::test]
    async fn test_fixture_roundtrip() {
        let fixture = HubFixture::new();
        let mut client = fixture.connect("region", None);
        let report = fixture.write("region", points(&[(1.0, 1.0)]));
        assert_eq!(client.next_hash().await, report.hash());
        assert_eq!(client.close().await, DisconnectReason::ClientClosed);
        assert_eq!(fixture.hub.registry().connection_count(), 0);
    }
}
