//! Core type definitions for colsync.
//!
//! This crate defines the small, schema-agnostic types the sync engine is
//! built on:
//! - Item identifiers (16-byte binary ids and their canonical text form)
//! - Hybrid Logical Clock timestamps used as the sync watermark
//!
//! Everything that depends on a collection's schema lives in `colsync-model`.

mod ids;
mod timestamp;

pub use ids::{ItemId, ITEM_ID_LEN};
pub use timestamp::{SyncClock, SyncTimestamp};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid identifier length: expected 16 bytes, got {0}")]
    InvalidLength(usize),
}
