//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Unknown dataset ids are reported as `None`, never as errors. What remains
/// are faults of the storage itself, which are fatal to the write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
