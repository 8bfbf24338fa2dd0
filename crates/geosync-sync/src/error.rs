//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur during sync operations.
///
/// Per-subscriber delivery problems are not errors: they are handled inside
/// the hub by pruning the subscriber. What propagates is a store fault.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Store operation failed.
    #[error("store error: {0}")]
    StoreError(#[from] geosync_store::StoreError),

    /// Message could not be encoded.
    #[error("encoding error: {0}")]
    EncodingError(#[from] geosync_core::CoreError),

    /// Transport-level error on a session.
    #[error("transport error: {0}")]
    TransportError(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
