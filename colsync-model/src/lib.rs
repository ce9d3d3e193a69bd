//! Schema-driven item model for colsync collections.
//!
//! - [`CollectionSchema`] describes one synced entity: its item fields, key
//!   fields, snapshot/stream/mutation methods and the unset sentinel type.
//! - [`get_key`] / [`parse_key`] derive the canonical string key of an item.
//! - [`merge`] / [`merge_into`] rebuild a full item from a partial delta.
//! - [`SyncFrame`], [`SnapshotResponse`] and [`MutationRequest`] are the
//!   decoded, schema-validated shapes of the messages the transport carries.
//!
//! Items are JSON objects. Unions use the `{"case": ..., "value": ...}` shape
//! and the unset sentinel is a union whose payload is a message tagged with
//! the schema's [`UnsetTag`] as its `$typeName`.

mod envelope;
mod error;
mod item;
mod key;
mod merge;
mod schema;

pub use envelope::{EnvelopeKind, MutationRequest, SnapshotResponse, SyncEnvelope, SyncFrame};
pub use error::{ModelError, ModelResult};
pub use item::{
    as_union, identifier_from_value, identifier_to_value, union_value, unset_value, Item,
    UnionRef, TYPE_NAME_FIELD,
};
pub use key::{get_key, parse_key, ItemKey};
pub use merge::{merge, merge_into, merge_value};
pub use schema::{
    CollectionSchema, FieldDescriptor, FieldKind, ItemSchema, MethodDescriptor, MethodKind,
    MutationMethods, SyncMethods, UnsetTag,
};
