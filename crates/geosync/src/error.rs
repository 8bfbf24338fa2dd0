//! Error types for the GeoSync umbrella crate.

use geosync_core::CoreError;
use geosync_server::ServerError;
use geosync_store::StoreError;
use geosync_sync::SyncError;
use thiserror::Error;

/// Errors from any GeoSync layer.
#[derive(Debug, Error)]
pub enum GeoSyncError {
    /// Hashing or canonical encoding failed, or a document did not parse.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Server or configuration error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// Reading input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for GeoSync operations.
pub type Result<T> = std::result::Result<T, GeoSyncError>;
