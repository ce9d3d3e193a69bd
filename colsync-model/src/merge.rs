//! Delta merge: rebuilds a full item from a base item and a partial delta.
//!
//! Deltas carry only changed fields. To tell "unchanged" from "cleared" a
//! delta field may be wrapped in a two-variant union, one variant holding the
//! new value and the other holding the unset sentinel. Per declared field:
//!
//! | delta field                         | target kind | result               |
//! |-------------------------------------|-------------|----------------------|
//! | absent                              | any         | base value kept      |
//! | union with unset payload            | any         | field removed        |
//! | union, other payload                | not union   | payload unwrapped    |
//! | union, other payload                | union       | delta union verbatim |
//! | plain value                         | any         | replaced             |
//!
//! Fields present in the delta but not declared on the item schema are
//! ignored.

use crate::error::{ModelError, ModelResult};
use crate::item::{as_union, Item};
use crate::schema::{FieldKind, ItemSchema, UnsetTag};
use serde_json::Value;

enum FieldUpdate {
    Keep,
    Clear,
    Set(Value),
}

fn resolve(kind: FieldKind, delta_field: Option<&Value>, unset: &UnsetTag) -> FieldUpdate {
    let Some(delta_field) = delta_field else {
        return FieldUpdate::Keep;
    };
    match as_union(delta_field) {
        Some(union) if unset.matches(union.value) => FieldUpdate::Clear,
        Some(union) if kind != FieldKind::Union => FieldUpdate::Set(union.value.clone()),
        _ => FieldUpdate::Set(delta_field.clone()),
    }
}

/// Merges `delta` into a copy of `value`.
pub fn merge(schema: &ItemSchema, value: &Item, delta: &Item, unset: &UnsetTag) -> Item {
    let mut merged = value.clone();
    merge_into(schema, &mut merged, delta, unset);
    merged
}

/// Merges `delta` into `draft` in place.
///
/// Every field is resolved before the draft is touched.
pub fn merge_into(schema: &ItemSchema, draft: &mut Item, delta: &Item, unset: &UnsetTag) {
    let updates: Vec<(&str, FieldUpdate)> = schema
        .fields
        .iter()
        .map(|field| {
            (
                field.name.as_str(),
                resolve(field.kind, delta.get(&field.name), unset),
            )
        })
        .collect();

    for (name, update) in updates {
        match update {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => {
                draft.remove(name);
            }
            FieldUpdate::Set(value) => {
                draft.insert(name.to_string(), value);
            }
        }
    }
}

/// Merges two untyped values. Fails closed if either is not an object.
pub fn merge_value(
    schema: &ItemSchema,
    value: &Value,
    delta: &Value,
    unset: &UnsetTag,
) -> ModelResult<Value> {
    let base = value
        .as_object()
        .ok_or_else(|| ModelError::NotAnObject(schema.type_name.clone()))?;
    let delta = delta
        .as_object()
        .ok_or_else(|| ModelError::NotAnObject(format!("delta of {}", schema.type_name)))?;
    Ok(Value::Object(merge(schema, base, delta, unset)))
}
