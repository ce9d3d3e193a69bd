//! Messages exchanged with the transport, decoded and validated against a
//! collection schema.

use crate::error::ModelResult;
use crate::item::Item;
use crate::schema::CollectionSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One change inside a stream frame.
///
/// On the wire: `{"case": "insert" | "update" | "delete", "value": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case", content = "value", rename_all = "snake_case")]
pub enum SyncEnvelope {
    /// A full item.
    Insert(Item),
    /// A partial item: key fields plus changed fields.
    Update(Item),
    /// Key fields of the removed item.
    Delete(Item),
}

/// Discriminant of a [`SyncEnvelope`], for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Insert,
    Update,
    Delete,
}

impl SyncEnvelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Insert(_) => EnvelopeKind::Insert,
            Self::Update(_) => EnvelopeKind::Update,
            Self::Delete(_) => EnvelopeKind::Delete,
        }
    }

    /// The payload, whatever the kind.
    pub fn payload(&self) -> &Item {
        match self {
            Self::Insert(item) | Self::Update(item) | Self::Delete(item) => item,
        }
    }

    fn validate(self, schema: &CollectionSchema) -> ModelResult<Self> {
        Ok(match self {
            Self::Insert(item) => Self::Insert(schema.validate_insert(Value::Object(item))?),
            Self::Update(delta) => Self::Update(schema.validate_delta(Value::Object(delta))?),
            Self::Delete(keys) => Self::Delete(schema.validate_key_fields(Value::Object(keys))?),
        })
    }
}

/// One server-pushed stream message. Applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncFrame {
    #[serde(default)]
    pub items: Vec<SyncEnvelope>,
}

impl SyncFrame {
    pub fn new(items: Vec<SyncEnvelope>) -> Self {
        Self { items }
    }

    /// Decodes a raw stream message and validates every envelope.
    pub fn decode(schema: &CollectionSchema, message: Value) -> ModelResult<Self> {
        let frame: SyncFrame = serde_json::from_value(message)?;
        let items = frame
            .items
            .into_iter()
            .map(|envelope| envelope.validate(schema))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_value(&self) -> ModelResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Response of the snapshot method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    #[serde(default)]
    pub items: Vec<Item>,
}

impl SnapshotResponse {
    /// Decodes a raw snapshot response and validates every item.
    pub fn decode(schema: &CollectionSchema, message: Value) -> ModelResult<Self> {
        let response: SnapshotResponse = serde_json::from_value(message)?;
        let items = response
            .items
            .into_iter()
            .map(|item| schema.validate_item(Value::Object(item)))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self { items })
    }

    pub fn to_value(&self) -> ModelResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Request body of every mutation method: `{"items": [input]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub items: Vec<Item>,
}

impl MutationRequest {
    pub fn single(item: Item) -> Self {
        Self { items: vec![item] }
    }

    pub fn to_value(&self) -> ModelResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
