//! Canonical collection keys.
//!
//! A key is the compact JSON array of the item's key field values in schema
//! order. Identifier fields are first canonicalized to lowercase hyphenated
//! UUID text, so the binary and text forms of one id produce the same key.

use crate::error::{ModelError, ModelResult};
use crate::item::{identifier_from_value, identifier_to_value, Item};
use crate::schema::{CollectionSchema, FieldKind};
use colsync_types::ItemId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Canonical string key of an item within its collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Wraps an already-encoded key string. Use [`get_key`] to build one.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the canonical key of `item` from the schema's key fields.
pub fn get_key(schema: &CollectionSchema, item: &Item) -> ModelResult<ItemKey> {
    let mut parts = Vec::with_capacity(schema.keys.len());
    for field in schema.key_fields() {
        let field = field?;
        let value = match item.get(&field.name) {
            None | Some(Value::Null) => {
                return Err(ModelError::MissingKeyField(field.name.clone()));
            }
            Some(value) => value,
        };
        let canonical = match field.kind {
            FieldKind::Identifier => {
                let id = identifier_from_value(value).map_err(|source| {
                    ModelError::InvalidIdentifier {
                        field: field.name.clone(),
                        source,
                    }
                })?;
                Value::String(id.canonical())
            }
            _ => value.clone(),
        };
        parts.push(canonical);
    }
    Ok(ItemKey(serde_json::to_string(&parts)?))
}

/// Recovers the identity fields encoded in `key`. Identifier fields come
/// back in binary form.
pub fn parse_key(schema: &CollectionSchema, key: &ItemKey) -> ModelResult<Item> {
    let parts: Vec<Value> = serde_json::from_str(key.as_str())
        .map_err(|e| ModelError::MalformedKey(format!("{key}: {e}")))?;
    if parts.len() != schema.keys.len() {
        return Err(ModelError::MalformedKey(format!(
            "{key}: expected {} parts, found {}",
            schema.keys.len(),
            parts.len()
        )));
    }

    let mut item = Item::new();
    for (field, part) in schema.key_fields().zip(parts) {
        let field = field?;
        let value = match (field.kind, part) {
            (FieldKind::Identifier, Value::String(text)) => {
                let id = ItemId::parse(&text).map_err(|source| ModelError::InvalidIdentifier {
                    field: field.name.clone(),
                    source,
                })?;
                identifier_to_value(id)
            }
            (FieldKind::Identifier, _) => {
                return Err(ModelError::MalformedKey(format!(
                    "{key}: identifier {} is not text",
                    field.name
                )));
            }
            (_, part) => part,
        };
        item.insert(field.name.clone(), value);
    }
    Ok(item)
}
