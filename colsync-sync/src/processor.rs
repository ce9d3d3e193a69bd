//! Live sync: consumes the server stream for the lifetime of the collection.
//!
//! Frames that arrive before the snapshot is applied are buffered; after
//! that each frame is applied as it arrives. Invalid frames are dropped
//! without ending the stream.

use crate::applicator::ApplyReport;
use crate::collection::{aborted, empty_message, CollectionShared};
use crate::error::SyncResult;
use crate::state::CollectionStatus;
use colsync_model::SyncFrame;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Task body: runs until the stream ends, fails, or the collection is
/// disposed.
pub(crate) async fn run_live_sync(shared: Arc<CollectionShared>) {
    match consume_stream(&shared).await {
        Ok(()) => debug!("{}: live sync stopped", shared.name()),
        Err(e) => error!("{}: live sync failed: {e}", shared.name()),
    }
}

async fn consume_stream(shared: &CollectionShared) -> SyncResult<()> {
    let mut abort = shared.abort.subscribe();
    let method = &shared.schema.sync.method;

    let mut stream = tokio::select! {
        biased;
        _ = aborted(&mut abort) => return Ok(()),
        stream = shared.transport.server_stream(method, empty_message()) => stream?,
    };
    debug!("{}: stream {method} open", shared.name());

    loop {
        let next = tokio::select! {
            biased;
            _ = aborted(&mut abort) => {
                debug!("{}: stream consumption aborted", shared.name());
                return Ok(());
            }
            next = stream.recv() => next,
        };

        match next {
            None => {
                info!("{}: stream {method} closed by transport", shared.name());
                return Ok(());
            }
            Some(Err(e)) => return Err(e),
            Some(Ok(message)) => {
                shared.receive_frame(message);
            }
        }
    }
}

impl CollectionShared {
    /// Validates one stream message and either buffers or applies it.
    /// Returns the apply report when the frame was applied.
    pub(crate) fn receive_frame(&self, message: Value) -> Option<ApplyReport> {
        let frame = match SyncFrame::decode(&self.schema, message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}: dropping invalid frame: {e}", self.name());
                return None;
            }
        };

        let mut state = self.state.lock();
        if self.status() == CollectionStatus::Failed {
            debug!("{}: initial sync failed, dropping frame", self.name());
            return None;
        }
        if !state.is_ready() {
            state.buffer_frame(frame);
            debug!("{}: buffered frame ({} pending)", self.name(), state.buffered());
            return None;
        }
        Some(self.apply_live_frame(&mut state, &frame))
    }
}
