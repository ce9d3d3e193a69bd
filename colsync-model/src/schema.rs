//! Collection schema descriptors and validation of items, deltas and key
//! messages against them.

use crate::error::{ModelError, ModelResult};
use crate::item::{as_union, identifier_from_value, Item, TYPE_NAME_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Describes one synced entity: item shape, identity, and the RPC methods
/// used to load, stream and mutate it.
///
/// Produced once per entity by code generation and shared by `Arc`; never
/// modified at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub item: ItemSchema,
    /// Identity fields, in the order they are encoded into the key.
    pub keys: Vec<String>,
    /// Unary method returning the full snapshot.
    pub collection: MethodDescriptor,
    pub sync: SyncMethods,
    #[serde(default)]
    pub operations: MutationMethods,
    pub unset: UnsetTag,
}

impl CollectionSchema {
    /// The item type name, which also names the collection.
    pub fn name(&self) -> &str {
        &self.item.type_name
    }

    /// Checks that the schema is internally consistent.
    ///
    /// Every key must be a declared, non-union field and there must be at
    /// least one key.
    pub fn check(&self) -> ModelResult<()> {
        if self.keys.is_empty() {
            return Err(ModelError::InvalidSchema(format!(
                "{} declares no key fields",
                self.name()
            )));
        }
        for key in &self.keys {
            match self.item.field(key) {
                None => {
                    return Err(ModelError::InvalidSchema(format!(
                        "key field {key} is not declared on {}",
                        self.name()
                    )));
                }
                Some(field) if field.kind == FieldKind::Union => {
                    return Err(ModelError::InvalidSchema(format!(
                        "key field {key} cannot be a union"
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Iterates the key field descriptors in key order.
    pub fn key_fields(&self) -> impl Iterator<Item = ModelResult<&FieldDescriptor>> {
        self.keys.iter().map(|key| {
            self.item
                .field(key)
                .ok_or_else(|| ModelError::InvalidSchema(format!("undeclared key field {key}")))
        })
    }

    /// Validates a full item against the item schema.
    pub fn validate_item(&self, value: Value) -> ModelResult<Item> {
        self.validate_full(value, &self.item.type_name)
    }

    /// Validates the payload of an insert envelope, which is a full item
    /// tagged with the stream's insert message type.
    pub fn validate_insert(&self, value: Value) -> ModelResult<Item> {
        self.validate_full(value, &self.sync.insert)
    }

    fn validate_full(&self, value: Value, type_name: &str) -> ModelResult<Item> {
        let item = into_object(value, type_name)?;
        check_type_name(&item, type_name)?;
        self.require_keys(&item)?;
        for (name, field_value) in &item {
            if name == TYPE_NAME_FIELD {
                continue;
            }
            let field = self.item.declared(name)?;
            field.check(field_value)?;
        }
        Ok(item)
    }

    /// Validates a delta: keys present, only declared fields, and every
    /// non-union field value matching its kind.
    pub fn validate_delta(&self, value: Value) -> ModelResult<Item> {
        let delta = into_object(value, &self.sync.update)?;
        check_type_name(&delta, &self.sync.update)?;
        self.require_keys(&delta)?;
        for (name, field_value) in &delta {
            if name == TYPE_NAME_FIELD {
                continue;
            }
            let field = self.item.declared(name)?;
            if as_union(field_value).is_none() {
                field.check(field_value)?;
            }
        }
        Ok(delta)
    }

    /// Validates a message that only needs to carry the identity fields.
    pub fn validate_key_fields(&self, value: Value) -> ModelResult<Item> {
        let keys = into_object(value, &self.sync.delete)?;
        check_type_name(&keys, &self.sync.delete)?;
        self.require_keys(&keys)?;
        Ok(keys)
    }

    fn require_keys(&self, item: &Item) -> ModelResult<()> {
        for field in self.key_fields() {
            let field = field?;
            match item.get(&field.name) {
                None | Some(Value::Null) => {
                    return Err(ModelError::MissingKeyField(field.name.clone()));
                }
                Some(value) => field.check(value)?,
            }
        }
        Ok(())
    }
}

fn into_object(value: Value, what: &str) -> ModelResult<Item> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ModelError::NotAnObject(what.to_string())),
    }
}

fn check_type_name(item: &Item, expected: &str) -> ModelResult<()> {
    match item.get(TYPE_NAME_FIELD) {
        None => Ok(()),
        Some(Value::String(found)) if found == expected => Ok(()),
        Some(found) => Err(ModelError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }),
    }
}

/// Field table of one item type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSchema {
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ItemSchema {
    pub fn new(type_name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Looks up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn declared(&self, name: &str) -> ModelResult<&FieldDescriptor> {
        self.field(name).ok_or_else(|| ModelError::UnknownField {
            type_name: self.type_name.clone(),
            field: name.to_string(),
        })
    }
}

/// One declared field of an item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    fn simple(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a plain value field (string, number, bool, list).
    pub fn scalar(name: &str) -> Self {
        Self::simple(name, FieldKind::Scalar)
    }

    /// Shorthand for a 16-byte binary identifier field.
    pub fn identifier(name: &str) -> Self {
        Self::simple(name, FieldKind::Identifier)
    }

    /// Shorthand for a nested message field.
    pub fn message(name: &str) -> Self {
        Self::simple(name, FieldKind::Message)
    }

    /// Shorthand for a field whose declared type is itself a union.
    pub fn union(name: &str) -> Self {
        Self::simple(name, FieldKind::Union)
    }

    /// Checks a present value against this field's kind. `null` is accepted
    /// everywhere and means "not set".
    pub fn check(&self, value: &Value) -> ModelResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let valid = match self.kind {
            FieldKind::Scalar => !value.is_object(),
            FieldKind::Message => value.is_object(),
            FieldKind::Union => as_union(value).is_some(),
            FieldKind::Identifier => {
                identifier_from_value(value).map_err(|source| ModelError::InvalidIdentifier {
                    field: self.name.clone(),
                    source,
                })?;
                true
            }
        };
        if valid {
            Ok(())
        } else {
            Err(ModelError::WrongKind {
                field: self.name.clone(),
                expected: self.kind,
            })
        }
    }
}

/// How a field is represented and treated by the key codec and merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    /// Fixed-width binary id, canonicalized to UUID text in keys.
    Identifier,
    Message,
    /// The field's own type is a union; merge keeps delta unions verbatim.
    Union,
}

/// Whether a method returns one response or a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Unary,
    ServerStreaming,
}

/// Identifies one RPC method on a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub service: String,
    pub name: String,
    pub kind: MethodKind,
}

impl MethodDescriptor {
    pub fn unary(service: &str, name: &str) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            kind: MethodKind::Unary,
        }
    }

    pub fn server_streaming(service: &str, name: &str) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            kind: MethodKind::ServerStreaming,
        }
    }

    /// `service/name`, as used in routing and logs.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.service, self.name)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.name)
    }
}

/// The live stream method and the message types its envelopes carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMethods {
    pub method: MethodDescriptor,
    pub insert: String,
    pub update: String,
    pub delete: String,
}

/// Optional mutation methods. A missing entry means the collection does not
/// support that operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationMethods {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<MethodDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<MethodDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<MethodDescriptor>,
}

/// Type name of the sentinel message meaning "explicitly clear this field".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnsetTag(String);

impl UnsetTag {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self(type_name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `payload` is a message of the unset type.
    pub fn matches(&self, payload: &Value) -> bool {
        payload
            .get(TYPE_NAME_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|name| name == self.0)
    }
}
