//! Tests for applicator.rs: snapshot and frame application.

mod common;

use colsync_model::{get_key, SyncFrame};
use colsync_sync::store::CollectionStore;
use colsync_sync::{ApplyReport, FrameApplicator};
use common::{delete, endpoint, endpoint_schema, frame, insert, keys_of, obj, unset, update};
use pretty_assertions::assert_eq;
use serde_json::json;

fn setup() -> (std::sync::Arc<colsync_model::CollectionSchema>, CollectionStore) {
    let schema = endpoint_schema();
    let store = CollectionStore::new(schema.clone(), 16);
    (schema, store)
}

fn decode(schema: &colsync_model::CollectionSchema, message: serde_json::Value) -> SyncFrame {
    SyncFrame::decode(schema, message).unwrap()
}

// ── Snapshot ────────────────────────────────────────────────────

#[test]
fn snapshot_inserts_every_item() {
    let (schema, store) = setup();
    let report = FrameApplicator::new(&schema)
        .apply_snapshot(vec![endpoint(1, "a"), endpoint(2, "b")], &store)
        .unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(store.len(), 2);
}

#[test]
fn empty_snapshot_is_fine() {
    let (schema, store) = setup();
    let report = FrameApplicator::new(&schema).apply_snapshot(vec![], &store).unwrap();
    assert_eq!(report, ApplyReport::default());
    assert!(store.is_empty());
}

// ── Frames ──────────────────────────────────────────────────────

#[test]
fn frame_applies_envelopes_in_order() {
    let (schema, store) = setup();
    let message = frame(vec![
        insert(endpoint(1, "users")),
        update(obj(json!({ "endpointId": common::id(1).canonical(), "name": "people" }))),
        insert(endpoint(2, "orders")),
        delete(keys_of(2)),
    ]);

    let report = FrameApplicator::new(&schema).apply_frame(&decode(&schema, message), &store);

    assert_eq!(
        report,
        ApplyReport {
            inserted: 2,
            updated: 1,
            deleted: 1,
            skipped: 0
        }
    );
    assert_eq!(report.applied(), 4);
    assert_eq!(store.len(), 1);
    let key = get_key(&schema, &keys_of(1)).unwrap();
    assert_eq!(store.get(&key).unwrap()["name"], json!("people"));
}

#[test]
fn update_with_unset_removes_field() {
    let (schema, store) = setup();
    let mut base = endpoint(1, "users");
    base.insert("note".into(), json!("legacy"));
    store.insert([base]).unwrap();

    let delta = obj(json!({
        "endpointId": common::id(1).canonical(),
        "note": unset(),
        "method": { "case": "value", "value": "POST" },
    }));
    FrameApplicator::new(&schema).apply_frame(&decode(&schema, frame(vec![update(delta)])), &store);

    let item = store.get(&get_key(&schema, &keys_of(1)).unwrap()).unwrap();
    assert!(!item.contains_key("note"));
    assert_eq!(item["method"], json!("POST"));
    assert_eq!(item["name"], json!("users"));
}

#[test]
fn update_for_missing_key_is_skipped() {
    let (schema, store) = setup();
    store.insert([endpoint(1, "users")]).unwrap();
    let before = store.entries();

    let delta = obj(json!({ "endpointId": common::id(7).canonical(), "name": "ghost" }));
    let report =
        FrameApplicator::new(&schema).apply_frame(&decode(&schema, frame(vec![update(delta)])), &store);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.applied(), 0);
    assert_eq!(store.entries(), before);
}

#[test]
fn delete_for_missing_key_is_skipped() {
    let (schema, store) = setup();
    let report = FrameApplicator::new(&schema)
        .apply_frame(&decode(&schema, frame(vec![delete(keys_of(3))])), &store);
    assert_eq!(report.skipped, 1);
    assert!(store.is_empty());
}

#[test]
fn skipped_envelope_does_not_block_the_rest() {
    let (schema, store) = setup();
    let ghost = obj(json!({ "endpointId": common::id(9).canonical(), "name": "ghost" }));
    let message = frame(vec![update(ghost), insert(endpoint(1, "users"))]);

    let report = FrameApplicator::new(&schema).apply_frame(&decode(&schema, message), &store);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn frame_is_published_as_one_batch() {
    let (schema, store) = setup();
    let mut changes = store.subscribe();
    let message = frame(vec![insert(endpoint(1, "a")), insert(endpoint(2, "b"))]);

    FrameApplicator::new(&schema).apply_frame(&decode(&schema, message), &store);

    assert_eq!(changes.try_recv().unwrap().len(), 2);
    assert!(changes.try_recv().is_err());
}
