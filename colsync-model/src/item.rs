//! Item representation and union helpers.

use crate::schema::UnsetTag;
use colsync_types::{ItemId, ITEM_ID_LEN};
use serde_json::{json, Map, Value};

/// A synced record: a JSON object whose fields follow the item schema.
pub type Item = Map<String, Value>;

/// Member carrying a message's type name.
pub const TYPE_NAME_FIELD: &str = "$typeName";

const CASE: &str = "case";
const VALUE: &str = "value";

/// A borrowed view of a union value `{"case": ..., "value": ...}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnionRef<'a> {
    pub case: &'a str,
    pub value: &'a Value,
}

/// Interprets `value` as a union if it has exactly the `case` and `value`
/// members and `case` is a string.
pub fn as_union(value: &Value) -> Option<UnionRef<'_>> {
    let object = value.as_object()?;
    if object.len() != 2 {
        return None;
    }
    let case = object.get(CASE)?.as_str()?;
    let value = object.get(VALUE)?;
    Some(UnionRef { case, value })
}

/// Builds a union value.
pub fn union_value(case: &str, value: Value) -> Value {
    json!({ CASE: case, VALUE: value })
}

/// Builds the union that clears a field in a delta.
pub fn unset_value(tag: &UnsetTag) -> Value {
    union_value("unset", json!({ TYPE_NAME_FIELD: tag.as_str() }))
}

/// Reads a binary identifier, given either as an array of 16 bytes or as
/// UUID text.
pub fn identifier_from_value(value: &Value) -> colsync_types::Result<ItemId> {
    match value {
        Value::String(text) => ItemId::parse(text),
        Value::Array(elements) => {
            let bytes: Vec<u8> = elements
                .iter()
                .map(|e| e.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect::<Option<_>>()
                .ok_or(colsync_types::Error::InvalidLength(elements.len()))?;
            ItemId::from_slice(&bytes)
        }
        _ => Err(colsync_types::Error::InvalidLength(0)),
    }
}

/// Renders an identifier in its binary wire form.
pub fn identifier_to_value(id: ItemId) -> Value {
    let bytes: [u8; ITEM_ID_LEN] = id.to_bytes();
    Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
}
