//! The public collection handle.
//!
//! [`create_collection`] builds the store and sync state for a schema and
//! starts two tasks: the initial snapshot load and the live stream
//! consumer. The handle is cheap to clone; all clones share one state.

use crate::applicator::{ApplyReport, FrameApplicator};
use crate::config::CollectionConfig;
use crate::error::{SyncError, SyncResult};
use crate::mutations::CollectionUtils;
use crate::state::{CollectionStatus, SyncState};
use crate::store::{ChangeBatch, CollectionStore};
use crate::transport::Transport;
use crate::{loader, processor};
use colsync_model::{CollectionSchema, Item, ItemKey, SyncFrame};
use colsync_types::{SyncClock, SyncTimestamp};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// State shared by the collection handle and its sync tasks.
pub(crate) struct CollectionShared {
    pub(crate) schema: Arc<CollectionSchema>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: CollectionConfig,
    pub(crate) store: CollectionStore,
    pub(crate) state: Mutex<SyncState>,
    pub(crate) clock: SyncClock,
    /// Last sync time, published once per applied frame.
    pub(crate) watermark: watch::Sender<SyncTimestamp>,
    pub(crate) status: watch::Sender<CollectionStatus>,
    /// Abort signal for stream consumption.
    pub(crate) abort: watch::Sender<bool>,
}

impl CollectionShared {
    pub(crate) fn name(&self) -> &str {
        self.schema.name()
    }

    /// Applies a frame received after readiness and advances the watermark.
    /// The caller holds the state lock, which orders this against buffering.
    pub(crate) fn apply_live_frame(&self, state: &mut SyncState, frame: &SyncFrame) -> ApplyReport {
        let report = FrameApplicator::new(&self.schema).apply_frame(frame, &self.store);
        let at = state.record_applied(self.clock.tick());
        self.watermark.send_replace(at);
        debug!(
            "{}: applied frame (+{} ~{} -{} skipped {})",
            self.name(),
            report.inserted,
            report.updated,
            report.deleted,
            report.skipped
        );
        report
    }

    /// Moves the status forward. `Ready` and `Failed` only leave `Loading`;
    /// `Disposed` is terminal.
    pub(crate) fn set_status(&self, next: CollectionStatus) -> bool {
        self.status.send_if_modified(|current| {
            let allowed = match next {
                CollectionStatus::Loading => false,
                CollectionStatus::Ready | CollectionStatus::Failed => {
                    *current == CollectionStatus::Loading
                }
                CollectionStatus::Disposed => *current != CollectionStatus::Disposed,
            };
            if allowed {
                *current = next;
            }
            allowed
        })
    }

    pub(crate) fn status(&self) -> CollectionStatus {
        *self.status.borrow()
    }
}

/// The empty request message sent to snapshot and stream methods.
pub(crate) fn empty_message() -> Value {
    Value::Object(Default::default())
}

/// Resolves once the abort flag is set. A closed channel counts as aborted.
pub(crate) async fn aborted(abort: &mut watch::Receiver<bool>) {
    let _ = abort.wait_for(|aborted| *aborted).await;
}

/// A locally cached, server-synced collection.
#[derive(Clone)]
pub struct Collection {
    shared: Arc<CollectionShared>,
}

/// Creates a collection and starts syncing it.
///
/// Must be called from within a Tokio runtime.
pub fn create_collection(
    schema: Arc<CollectionSchema>,
    transport: Arc<dyn Transport>,
    config: CollectionConfig,
) -> SyncResult<Collection> {
    schema.check()?;
    let runtime = Handle::try_current().map_err(|e| SyncError::Runtime(e.to_string()))?;

    let shared = Arc::new(CollectionShared {
        store: CollectionStore::new(schema.clone(), config.change_channel_capacity),
        schema,
        transport,
        config,
        state: Mutex::new(SyncState::new()),
        clock: SyncClock::new(),
        watermark: watch::Sender::new(SyncTimestamp::ZERO),
        status: watch::Sender::new(CollectionStatus::Loading),
        abort: watch::Sender::new(false),
    });

    info!("{}: starting sync", shared.name());
    runtime.spawn(loader::run_initial_sync(shared.clone()));
    runtime.spawn(processor::run_live_sync(shared.clone()));

    Ok(Collection { shared })
}

impl Collection {
    pub fn schema(&self) -> &Arc<CollectionSchema> {
        &self.shared.schema
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn status(&self) -> CollectionStatus {
        self.shared.status()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state.lock().is_ready()
    }

    /// Waits until the snapshot and any buffered frames are applied.
    pub async fn ready(&self) -> SyncResult<()> {
        let mut status = self.shared.status.subscribe();
        let reached = *status
            .wait_for(|s| *s != CollectionStatus::Loading)
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        match reached {
            CollectionStatus::Failed => Err(SyncError::InitialSyncFailed(self.name().to_string())),
            CollectionStatus::Disposed => Err(SyncError::Disposed),
            CollectionStatus::Ready | CollectionStatus::Loading => Ok(()),
        }
    }

    /// Time the last stream frame was applied.
    pub fn last_sync_time(&self) -> SyncTimestamp {
        self.shared.state.lock().last_sync_time()
    }

    /// Frames held until the snapshot is applied.
    pub fn buffered(&self) -> usize {
        self.shared.state.lock().buffered()
    }

    /// Number of stream frames applied so far.
    pub fn frames_applied(&self) -> u64 {
        self.shared.state.lock().frames_applied()
    }

    // ── Map-like reads ───────────────────────────────────────────

    pub fn get(&self, key: &ItemKey) -> Option<Item> {
        self.shared.store.get(key)
    }

    pub fn has(&self, key: &ItemKey) -> bool {
        self.shared.store.contains(key)
    }

    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.is_empty()
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        self.shared.store.keys()
    }

    pub fn values(&self) -> Vec<Item> {
        self.shared.store.values()
    }

    pub fn entries(&self) -> BTreeMap<ItemKey, Item> {
        self.shared.store.entries()
    }

    /// Items in key order.
    pub fn to_vec(&self) -> Vec<Item> {
        self.values()
    }

    /// Subscribes to committed change batches.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeBatch> {
        self.shared.store.subscribe()
    }

    /// Mutation and key helpers.
    pub fn utils(&self) -> CollectionUtils<'_> {
        CollectionUtils::new(&self.shared)
    }

    /// Stops stream consumption. Items already applied stay in place;
    /// pending `wait_for_sync` calls fail with [`SyncError::Disposed`].
    pub fn dispose(&self) {
        self.shared.abort.send_replace(true);
        if self.shared.set_status(CollectionStatus::Disposed) {
            info!("{}: disposed", self.name());
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.status() == CollectionStatus::Disposed
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .field("status", &self.status())
            .field("len", &self.len())
            .finish()
    }
}
