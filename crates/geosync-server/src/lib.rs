//! HTTP and WebSocket server for GeoSync.
//!
//! Clients watch a dataset over `GET /ws/{dataset_id}?hash=..`; producers
//! write point sets with `POST /update_data/{dataset_id}`. Everything behind
//! those endpoints lives in `geosync-sync`.

pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod router;
pub mod seed;
pub mod server;
pub mod ws;

pub use config::{SeedDataset, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use gateway::{
    DatasetSummary, Point, PointsPayload, SharedHub, UpdateGateway, UpdateResponse, UPDATE_ACK,
};
pub use router::{build_router, AppState};
pub use server::GeoSyncServer;
pub use ws::WsTransport;
