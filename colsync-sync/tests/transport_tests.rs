//! Tests for the scripted mock transport.

use colsync_model::MethodDescriptor;
use colsync_sync::transport::mock::MockTransport;
use colsync_sync::{SyncError, Transport};
use serde_json::json;

fn unary() -> MethodDescriptor {
    MethodDescriptor::unary("api.v1.TestService", "Get")
}

fn stream() -> MethodDescriptor {
    MethodDescriptor::server_streaming("api.v1.TestService", "Watch")
}

#[tokio::test]
async fn unary_without_reply_answers_empty_message() {
    let transport = MockTransport::new();
    let response = transport.unary(&unary(), json!({})).await.unwrap();
    assert_eq!(response, json!({}));
}

#[tokio::test]
async fn unary_replies_are_consumed_in_order() {
    let transport = MockTransport::new();
    transport.respond(&unary(), json!({ "n": 1 }));
    transport.fail(&unary(), "unavailable");

    assert_eq!(transport.unary(&unary(), json!({})).await.unwrap(), json!({ "n": 1 }));
    let err = transport.unary(&unary(), json!({})).await.unwrap_err();
    assert!(matches!(err, SyncError::Transport(msg) if msg == "unavailable"));
}

#[tokio::test]
async fn deferred_reply_waits_for_the_test() {
    let transport = std::sync::Arc::new(MockTransport::new());
    let release = transport.defer(&unary());

    let pending = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.unary(&unary(), json!({})).await })
    };
    tokio::task::yield_now().await;
    assert!(!pending.is_finished());

    release.send(Ok(json!({ "done": true }))).unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), json!({ "done": true }));
}

#[tokio::test]
async fn calls_are_recorded() {
    let transport = MockTransport::new();
    transport.unary(&unary(), json!({ "a": 1 })).await.unwrap();
    transport
        .unary(&MethodDescriptor::unary("api.v1.Other", "Put"), json!({}))
        .await
        .unwrap();

    assert_eq!(transport.calls().len(), 2);
    assert_eq!(transport.calls()[0].method, "api.v1.TestService/Get");
    assert_eq!(transport.calls_to(&unary()), vec![json!({ "a": 1 })]);
}

#[tokio::test]
async fn messages_pushed_before_open_are_delivered() {
    let transport = MockTransport::new();
    transport.push(&stream(), json!({ "seq": 1 })).await;

    let mut frames = transport.server_stream(&stream(), json!({})).await.unwrap();
    transport.push(&stream(), json!({ "seq": 2 })).await;
    transport.push_error(&stream(), "reset").await;

    assert_eq!(frames.recv().await.unwrap().unwrap(), json!({ "seq": 1 }));
    assert_eq!(frames.recv().await.unwrap().unwrap(), json!({ "seq": 2 }));
    assert!(frames.recv().await.unwrap().is_err());
}

#[tokio::test]
async fn close_stream_ends_it() {
    let transport = MockTransport::new();
    let mut frames = transport.server_stream(&stream(), json!({})).await.unwrap();
    transport.close_stream(&stream());
    assert!(frames.recv().await.is_none());
}

#[tokio::test]
async fn stream_opens_once() {
    let transport = MockTransport::new();
    let _frames = transport.server_stream(&stream(), json!({})).await.unwrap();
    assert!(transport.server_stream(&stream(), json!({})).await.is_err());
}
