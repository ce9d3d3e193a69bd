#![allow(dead_code)]

use colsync_model::{
    CollectionSchema, FieldDescriptor, Item, ItemSchema, MethodDescriptor, MutationMethods,
    SyncMethods, UnsetTag,
};
use serde_json::Value;

pub const UNSET: &str = "api.v1.Unset";

/// An HTTP endpoint keyed by a binary id.
pub fn endpoint_schema() -> CollectionSchema {
    CollectionSchema {
        item: ItemSchema::new(
            "api.v1.Endpoint",
            vec![
                FieldDescriptor::identifier("endpointId"),
                FieldDescriptor::scalar("name"),
                FieldDescriptor::scalar("method"),
                FieldDescriptor::scalar("note"),
                FieldDescriptor::message("headers"),
                FieldDescriptor::union("body"),
            ],
        ),
        keys: vec!["endpointId".into()],
        collection: MethodDescriptor::unary("api.v1.EndpointService", "EndpointCollection"),
        sync: SyncMethods {
            method: MethodDescriptor::server_streaming("api.v1.EndpointService", "EndpointSync"),
            insert: "api.v1.EndpointSyncInsert".into(),
            update: "api.v1.EndpointSyncUpdate".into(),
            delete: "api.v1.EndpointSyncDelete".into(),
        },
        operations: MutationMethods {
            insert: Some(MethodDescriptor::unary("api.v1.EndpointService", "EndpointInsert")),
            update: Some(MethodDescriptor::unary("api.v1.EndpointService", "EndpointUpdate")),
            delete: Some(MethodDescriptor::unary("api.v1.EndpointService", "EndpointDelete")),
        },
        unset: UnsetTag::new(UNSET),
    }
}

/// A workspace member keyed by (workspaceId, userId, role).
pub fn member_schema() -> CollectionSchema {
    CollectionSchema {
        item: ItemSchema::new(
            "api.v1.Member",
            vec![
                FieldDescriptor::identifier("workspaceId"),
                FieldDescriptor::identifier("userId"),
                FieldDescriptor::scalar("role"),
                FieldDescriptor::scalar("email"),
            ],
        ),
        keys: vec!["workspaceId".into(), "userId".into(), "role".into()],
        collection: MethodDescriptor::unary("api.v1.MemberService", "MemberCollection"),
        sync: SyncMethods {
            method: MethodDescriptor::server_streaming("api.v1.MemberService", "MemberSync"),
            insert: "api.v1.MemberSyncInsert".into(),
            update: "api.v1.MemberSyncUpdate".into(),
            delete: "api.v1.MemberSyncDelete".into(),
        },
        operations: MutationMethods::default(),
        unset: UnsetTag::new(UNSET),
    }
}

pub fn obj(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
