//! Startup datasets.

use crate::config::SeedDataset;
use crate::error::ServerResult;
use crate::gateway::{PointsPayload, UpdateGateway};

/// Write every seed dataset through the gateway. Returns how many changed a dataset.
pub fn apply_seeds(gateway: &UpdateGateway, seeds: &[SeedDataset]) -> ServerResult<usize> {
    let mut changed = 0;
    for seed in seeds {
        let id = gateway.dataset_id(&seed.id)?;
        let report = gateway.submit(&id, PointsPayload::new(seed.points.clone()))?;
        if report.changed() {
            changed += 1;
        }
    }
    tracing::info!(seeds = seeds.len(), changed, "seed datasets loaded");
    Ok(changed)
}
