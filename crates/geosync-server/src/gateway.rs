//! The ingestion boundary.
//!
//! Payloads arrive here already shaped by serde: a `{"points": [...]}` body
//! that did not deserialize never reaches the gateway. The gateway turns it
//! into the stored form (the bare point list) and hands it to the hub.

use std::sync::Arc;

use geosync_core::{DatasetId, UpdateMessage};
use geosync_store::{DatasetStore, MemoryStore};
use geosync_sync::{SubmitReport, SyncHub};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};

/// Hub shared by every handler and session.
pub type SharedHub = Arc<SyncHub<MemoryStore>>;

/// Message returned by the update endpoint whether or not anything changed.
pub const UPDATE_ACK: &str = "Data checked and updated if necessary";

/// One point of a polygon or point set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Body of `POST /update_data/{dataset_id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointsPayload {
    pub points: Vec<Point>,
}

impl PointsPayload {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// The stored form: `[{"x": .., "y": ..}, ...]`.
    pub fn into_value(self) -> Value {
        Value::Array(
            self.points
                .into_iter()
                .map(|p| json!({ "x": p.x, "y": p.y }))
                .collect(),
        )
    }
}

/// Response of the update endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub message: String,
    pub changed: bool,
    pub hash: String,
    pub delivered: usize,
}

impl From<&SubmitReport> for UpdateResponse {
    fn from(report: &SubmitReport) -> Self {
        Self {
            message: UPDATE_ACK.to_string(),
            changed: report.changed(),
            hash: report.hash().to_hex(),
            delivered: report.delivered(),
        }
    }
}

/// Entry of the dataset listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub hash: String,
}

/// Validates ids and payloads, then forwards writes to the hub.
#[derive(Clone)]
pub struct UpdateGateway {
    hub: SharedHub,
    max_dataset_id_len: usize,
}

impl UpdateGateway {
    pub fn new(hub: SharedHub, max_dataset_id_len: usize) -> Self {
        Self {
            hub,
            max_dataset_id_len,
        }
    }

    pub fn hub(&self) -> &SharedHub {
        &self.hub
    }

    /// Check a raw path segment and turn it into a dataset id.
    pub fn dataset_id(&self, raw: &str) -> ServerResult<DatasetId> {
        if raw.is_empty() {
            return Err(ServerError::InvalidDatasetId("empty".into()));
        }
        if raw.len() > self.max_dataset_id_len {
            return Err(ServerError::InvalidDatasetId(format!(
                "{} bytes exceeds limit of {}",
                raw.len(),
                self.max_dataset_id_len
            )));
        }
        Ok(DatasetId::new(raw))
    }

    /// Store a point set and broadcast it if it changed the dataset.
    pub fn submit(&self, dataset_id: &DatasetId, payload: PointsPayload) -> ServerResult<SubmitReport> {
        let points = payload.points.len();
        let report = self.hub.submit(dataset_id, payload.into_value())?;

        tracing::info!(
            dataset = %dataset_id,
            points,
            changed = report.changed(),
            hash = %report.hash(),
            delivered = report.delivered(),
            "update ingested"
        );

        Ok(report)
    }

    /// The update message a new subscriber without a hash would receive.
    pub fn current(&self, dataset_id: &DatasetId) -> ServerResult<UpdateMessage<Value>> {
        self.hub
            .store()
            .get(dataset_id)?
            .map(|dataset| dataset.to_update())
            .ok_or_else(|| ServerError::DatasetNotFound(dataset_id.to_string()))
    }

    /// All datasets with their current hashes, sorted by id.
    pub fn summaries(&self) -> ServerResult<Vec<DatasetSummary>> {
        let store = self.hub.store();
        let mut summaries = Vec::new();
        for id in store.ids()? {
            if let Some(hash) = store.hash_of(&id)? {
                summaries.push(DatasetSummary {
                    id: id.into_string(),
                    hash: hash.to_hex(),
                });
            }
        }
        Ok(summaries)
    }
}
