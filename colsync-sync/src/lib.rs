//! Collection sync engine for colsync.
//!
//! Keeps a local, keyed copy of a server-side collection: loads a full
//! snapshot once, then applies streamed insert/update/delete frames, and
//! lets callers mutate optimistically while waiting for the stream to
//! confirm their writes.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Store**: keyed items with atomic write transactions and a change feed
//! - **State**: readiness, the pre-snapshot frame buffer and the watermark
//! - **Applicator**: applies snapshots and frames to the store
//! - **Transport**: abstracts the unary and server-streaming RPCs
//! - **Collection**: wires the above together and exposes map-like reads
//!
//! ## Sync Process
//!
//! 1. **Start**: the snapshot request and the stream subscription start together
//! 2. **Buffer**: frames that arrive before the snapshot is applied are held
//! 3. **Ready**: the snapshot is applied, then held frames replay in order
//! 4. **Live**: each later frame is applied on arrival and advances the watermark
//! 5. **Mutate**: local write, RPC, then wait until the watermark passes the call
//!
//! # Example
//!
//! ```no_run
//! use colsync_model::{
//!     CollectionSchema, FieldDescriptor, ItemSchema, MethodDescriptor, MutationMethods,
//!     SyncMethods, UnsetTag,
//! };
//! use colsync_sync::transport::mock::MockTransport;
//! use colsync_sync::{create_collection, CollectionConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> colsync_sync::SyncResult<()> {
//! let schema = Arc::new(CollectionSchema {
//!     item: ItemSchema::new(
//!         "api.v1.Task",
//!         vec![FieldDescriptor::identifier("taskId"), FieldDescriptor::scalar("title")],
//!     ),
//!     keys: vec!["taskId".into()],
//!     collection: MethodDescriptor::unary("api.v1.TaskService", "TaskCollection"),
//!     sync: SyncMethods {
//!         method: MethodDescriptor::server_streaming("api.v1.TaskService", "TaskSync"),
//!         insert: "api.v1.TaskSyncInsert".into(),
//!         update: "api.v1.TaskSyncUpdate".into(),
//!         delete: "api.v1.TaskSyncDelete".into(),
//!     },
//!     operations: MutationMethods::default(),
//!     unset: UnsetTag::new("api.v1.Unset"),
//! });
//!
//! let tasks = create_collection(schema, Arc::new(MockTransport::new()), CollectionConfig::default())?;
//! tasks.ready().await?;
//! println!("{} task(s)", tasks.len());
//! # Ok(())
//! # }
//! ```

mod applicator;
mod collection;
mod config;
mod error;
mod loader;
mod mutations;
mod processor;
mod registry;
pub mod state;
pub mod store;
pub mod transport;

pub use applicator::{ApplyReport, FrameApplicator};
pub use collection::{create_collection, Collection};
pub use config::{CollectionConfig, CollectionConfigBuilder};
pub use error::{SyncError, SyncResult};
pub use mutations::{CollectionUtils, MutationKind};
pub use registry::CollectionRegistry;
pub use state::{CollectionStatus, SyncState};
pub use store::{Change, ChangeBatch, ChangeKind, CollectionStore, StoreTransaction, WriteOp};
pub use transport::{FrameStream, Transport};
