//! Error types for the sync layer.

use crate::mutations::MutationKind;
use colsync_model::ModelError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure (network, RPC status).
    #[error("transport error: {0}")]
    Transport(String),

    /// A message or input failed schema validation.
    #[error("validation error: {0}")]
    Validation(#[from] ModelError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The schema declares no method for this mutation.
    #[error("{collection} does not support {operation}")]
    UnsupportedOperation {
        collection: String,
        operation: MutationKind,
    },

    /// A write tried to change an item's key fields.
    #[error("key fields of {0} cannot change")]
    KeyChanged(String),

    /// The snapshot could not be loaded; the collection never becomes ready.
    #[error("initial sync failed: {0}")]
    InitialSyncFailed(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// The collection was disposed.
    #[error("collection disposed")]
    Disposed,

    /// No Tokio runtime to run the sync tasks on.
    #[error("runtime unavailable: {0}")]
    Runtime(String),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}
