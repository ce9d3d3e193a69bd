//! Error types for the item model.

use crate::schema::FieldKind;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating, keying or merging items.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A value that must be a JSON object was something else.
    #[error("expected an object for {0}")]
    NotAnObject(String),

    /// A declared key field is absent or null.
    #[error("missing key field: {0}")]
    MissingKeyField(String),

    /// An identifier field does not hold a 16-byte id.
    #[error("invalid identifier in field {field}: {source}")]
    InvalidIdentifier {
        field: String,
        #[source]
        source: colsync_types::Error,
    },

    /// A field that the item schema does not declare.
    #[error("unknown field {field} on {type_name}")]
    UnknownField { type_name: String, field: String },

    /// A field value does not match its declared kind.
    #[error("field {field} is not a valid {expected:?} value")]
    WrongKind { field: String, expected: FieldKind },

    /// A message's `$typeName` does not match the expected type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A collection key string that cannot be decoded.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// The schema itself is inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// JSON decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
