#![allow(dead_code)]

use colsync_model::{
    CollectionSchema, FieldDescriptor, Item, ItemSchema, MethodDescriptor, MutationMethods,
    SyncMethods, UnsetTag,
};
use colsync_types::ItemId;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const UNSET: &str = "api.v1.Unset";

/// Collects formatted log output from the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let capture = self.clone();
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || capture.clone())
            .finish()
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An HTTP endpoint keyed by a binary id, with all three mutations.
pub fn endpoint_schema() -> Arc<CollectionSchema> {
    Arc::new(CollectionSchema {
        item: ItemSchema::new(
            "api.v1.Endpoint",
            vec![
                FieldDescriptor::identifier("endpointId"),
                FieldDescriptor::scalar("name"),
                FieldDescriptor::scalar("method"),
                FieldDescriptor::scalar("note"),
                FieldDescriptor::message("headers"),
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
    })
}

/// A read-only collection: no mutation methods.
pub fn tag_schema() -> Arc<CollectionSchema> {
    Arc::new(CollectionSchema {
        item: ItemSchema::new(
            "api.v1.Tag",
            vec![FieldDescriptor::scalar("tagId"), FieldDescriptor::scalar("label")],
        ),
        keys: vec!["tagId".into()],
        collection: MethodDescriptor::unary("api.v1.TagService", "TagCollection"),
        sync: SyncMethods {
            method: MethodDescriptor::server_streaming("api.v1.TagService", "TagSync"),
            insert: "api.v1.TagSyncInsert".into(),
            update: "api.v1.TagSyncUpdate".into(),
            delete: "api.v1.TagSyncDelete".into(),
        },
        operations: MutationMethods::default(),
        unset: UnsetTag::new(UNSET),
    })
}

pub fn obj(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// A deterministic id: all sixteen bytes set to `n`.
pub fn id(n: u8) -> ItemId {
    ItemId::from([n; 16])
}

pub fn endpoint(n: u8, name: &str) -> Item {
    obj(json!({ "endpointId": id(n).canonical(), "name": name, "method": "GET" }))
}

pub fn keys_of(n: u8) -> Item {
    obj(json!({ "endpointId": id(n).canonical() }))
}

pub fn unset() -> Value {
    json!({ "case": "unset", "value": { "$typeName": UNSET } })
}

pub fn insert(item: Item) -> Value {
    json!({ "case": "insert", "value": item })
}

pub fn update(delta: Item) -> Value {
    json!({ "case": "update", "value": delta })
}

pub fn delete(keys: Item) -> Value {
    json!({ "case": "delete", "value": keys })
}

pub fn frame(envelopes: Vec<Value>) -> Value {
    json!({ "items": envelopes })
}

pub fn snapshot(items: Vec<Item>) -> Value {
    json!({ "items": items })
}

/// Polls `check` until it holds, failing the test after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let poll = async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), poll)
        .await
        .expect("condition not reached in time");
}

/// Lets spawned tasks run for a moment.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
