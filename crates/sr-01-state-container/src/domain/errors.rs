//! Error types for the state container.

use thiserror::Error;

/// Errors from state container operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store behind a handle has been dropped.
    #[error("State container has been dropped")]
    Dropped,

    /// State could not be serialized into a snapshot.
    #[error("Snapshot serialization failed: {0}")]
    Snapshot(String),

    /// A snapshot could not be turned back into state.
    #[error("Snapshot could not be decoded: {0}")]
    Hydrate(String),
}
