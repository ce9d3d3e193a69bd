//! Transport layer abstraction.
//!
//! The sync engine never sees RPC framing or encoding. A transport moves
//! opaque JSON messages: one request/response call for snapshots and
//! mutations, and a server stream for live frames.

use crate::error::SyncResult;
use async_trait::async_trait;
use colsync_model::MethodDescriptor;
use serde_json::Value;
use tokio::sync::mpsc;

/// Inbound server-stream messages. The transport owns the sending half and
/// closes it when the stream ends; an `Err` item reports a stream failure.
pub type FrameStream = mpsc::Receiver<SyncResult<Value>>;

/// An RPC transport the collection talks to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and waits for its single response.
    async fn unary(&self, method: &MethodDescriptor, input: Value) -> SyncResult<Value>;

    /// Opens a server stream. Messages arrive on the returned channel.
    async fn server_stream(&self, method: &MethodDescriptor, input: Value)
        -> SyncResult<FrameStream>;
}

/// A scripted in-memory transport for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::oneshot;

    const STREAM_CAPACITY: usize = 64;

    enum Reply {
        Ready(SyncResult<Value>),
        Deferred(oneshot::Receiver<SyncResult<Value>>),
    }

    struct StreamSlot {
        sender: mpsc::Sender<SyncResult<Value>>,
        receiver: Option<FrameStream>,
    }

    /// A recorded unary call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub method: String,
        pub input: Value,
    }

    /// Mock transport: replies to unary calls from per-method queues and
    /// feeds server streams from test code.
    ///
    /// Unary calls to a method with nothing queued answer `{}`.
    #[derive(Default)]
    pub struct MockTransport {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        streams: Mutex<HashMap<String, StreamSlot>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn enqueue(&self, method: &MethodDescriptor, reply: Reply) {
            self.replies
                .lock()
                .entry(method.full_name())
                .or_default()
                .push_back(reply);
        }

        /// Queues a successful response for the next call to `method`.
        pub fn respond(&self, method: &MethodDescriptor, response: Value) {
            self.enqueue(method, Reply::Ready(Ok(response)));
        }

        /// Queues a transport failure for the next call to `method`.
        pub fn fail(&self, method: &MethodDescriptor, message: impl Into<String>) {
            self.enqueue(method, Reply::Ready(Err(SyncError::Transport(message.into()))));
        }

        /// Queues a response the test completes later through the returned
        /// sender. The call stays pending until then.
        pub fn defer(&self, method: &MethodDescriptor) -> oneshot::Sender<SyncResult<Value>> {
            let (tx, rx) = oneshot::channel();
            self.enqueue(method, Reply::Deferred(rx));
            tx
        }

        fn stream_sender(&self, method: &MethodDescriptor) -> mpsc::Sender<SyncResult<Value>> {
            let mut streams = self.streams.lock();
            let slot = streams.entry(method.full_name()).or_insert_with(|| {
                let (sender, receiver) = mpsc::channel(STREAM_CAPACITY);
                StreamSlot {
                    sender,
                    receiver: Some(receiver),
                }
            });
            slot.sender.clone()
        }

        /// Pushes one message onto the server stream of `method`. Messages
        /// pushed before the stream is opened are delivered once it is.
        pub async fn push(&self, method: &MethodDescriptor, message: Value) {
            let sender = self.stream_sender(method);
            // The receiver may already be gone if the consumer stopped.
            let _ = sender.send(Ok(message)).await;
        }

        /// Pushes a stream failure.
        pub async fn push_error(&self, method: &MethodDescriptor, message: impl Into<String>) {
            let sender = self.stream_sender(method);
            let _ = sender.send(Err(SyncError::Transport(message.into()))).await;
        }

        /// Ends the server stream of `method`.
        pub fn close_stream(&self, method: &MethodDescriptor) {
            self.streams.lock().remove(&method.full_name());
        }

        /// Unary calls recorded so far, in order.
        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().clone()
        }

        /// Unary calls made to `method`.
        pub fn calls_to(&self, method: &MethodDescriptor) -> Vec<Value> {
            let name = method.full_name();
            self.calls
                .lock()
                .iter()
                .filter(|c| c.method == name)
                .map(|c| c.input.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn unary(&self, method: &MethodDescriptor, input: Value) -> SyncResult<Value> {
            self.calls.lock().push(RecordedCall {
                method: method.full_name(),
                input,
            });

            let reply = self
                .replies
                .lock()
                .get_mut(&method.full_name())
                .and_then(VecDeque::pop_front);

            match reply {
                None => Ok(Value::Object(Default::default())),
                Some(Reply::Ready(result)) => result,
                Some(Reply::Deferred(rx)) => rx.await.map_err(|_| SyncError::ChannelClosed)?,
            }
        }

        async fn server_stream(
            &self,
            method: &MethodDescriptor,
            _input: Value,
        ) -> SyncResult<FrameStream> {
            self.stream_sender(method);
            self.streams
                .lock()
                .get_mut(&method.full_name())
                .and_then(|slot| slot.receiver.take())
                .ok_or_else(|| SyncError::Transport(format!("stream {method} already open")))
        }
    }
}
