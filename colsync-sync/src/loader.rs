//! Initial sync: fetch the snapshot once, apply it, then replay whatever the
//! stream delivered in the meantime.

use crate::applicator::FrameApplicator;
use crate::collection::{empty_message, CollectionShared};
use crate::error::SyncResult;
use crate::state::CollectionStatus;
use colsync_model::{Item, SnapshotResponse};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Task body: loads the snapshot. On failure the collection is marked
/// `Failed` and never becomes ready.
pub(crate) async fn run_initial_sync(shared: Arc<CollectionShared>) {
    if let Err(e) = load_snapshot(&shared).await {
        error!("{}: initial sync failed: {e}", shared.name());
        shared.fail_initial_sync();
    }
}

async fn load_snapshot(shared: &CollectionShared) -> SyncResult<()> {
    let method = &shared.schema.collection;
    debug!("{}: requesting snapshot from {method}", shared.name());

    let response = shared.transport.unary(method, empty_message()).await?;
    let snapshot = SnapshotResponse::decode(&shared.schema, response)?;
    shared.complete_initial_sync(snapshot.items)
}

impl CollectionShared {
    /// Marks the collection `Failed`, discards held frames and stops the
    /// stream. Nothing can drain the buffer once the snapshot is lost.
    pub(crate) fn fail_initial_sync(&self) {
        let mut state = self.state.lock();
        if !self.set_status(CollectionStatus::Failed) {
            return;
        }
        let discarded = state.take_buffer().len();
        drop(state);

        self.abort.send_replace(true);
        if discarded > 0 {
            warn!("{}: discarded {discarded} buffered frame(s)", self.name());
        }
    }

    /// Applies the snapshot, flips readiness and replays buffered frames,
    /// all under the state lock so no live frame can slip in between.
    pub(crate) fn complete_initial_sync(&self, items: Vec<Item>) -> SyncResult<()> {
        let mut state = self.state.lock();
        if state.is_ready() {
            warn!("{}: snapshot arrived after readiness, ignoring", self.name());
            return Ok(());
        }

        let report = FrameApplicator::new(&self.schema).apply_snapshot(items, &self.store)?;
        state.mark_ready();

        let buffered = state.take_buffer();
        for frame in &buffered {
            self.apply_live_frame(&mut state, frame);
        }
        drop(state);

        self.set_status(CollectionStatus::Ready);
        info!(
            "{}: ready with {} item(s), replayed {} buffered frame(s)",
            self.name(),
            report.inserted,
            buffered.len()
        );
        Ok(())
    }
}
