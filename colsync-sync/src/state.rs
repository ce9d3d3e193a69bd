//! Sync state tracking.
//!
//! Tracks whether the snapshot has landed, the frames received before it
//! did, and the watermark advanced by every applied frame.

use colsync_model::SyncFrame;
use colsync_types::SyncTimestamp;
use std::collections::VecDeque;

/// Lifecycle of a collection.
///
/// `Loading` covers both the snapshot request and stream buffering. `Ready`
/// is entered once, after the snapshot and any buffered frames are applied;
/// live frames are then applied as they arrive until `Disposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Loading,
    Ready,
    /// The snapshot was malformed or its request failed. No retry.
    Failed,
    Disposed,
}

/// Buffering and watermark state of one collection.
#[derive(Debug, Default)]
pub struct SyncState {
    ready: bool,
    buffer: VecDeque<SyncFrame>,
    last_sync_time: SyncTimestamp,
    frames_applied: u64,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the snapshot has been applied.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Marks the snapshot as applied. Returns `false` if it already was.
    pub fn mark_ready(&mut self) -> bool {
        !std::mem::replace(&mut self.ready, true)
    }

    /// Holds a frame until the snapshot lands.
    pub fn buffer_frame(&mut self, frame: SyncFrame) {
        self.buffer.push_back(frame);
    }

    /// Frames held so far.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Removes and returns all held frames in arrival order.
    pub fn take_buffer(&mut self) -> Vec<SyncFrame> {
        self.buffer.drain(..).collect()
    }

    /// Time the last frame was applied, or `SyncTimestamp::ZERO`.
    pub fn last_sync_time(&self) -> SyncTimestamp {
        self.last_sync_time
    }

    /// Number of frames applied.
    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    /// Records an applied frame. The watermark never moves backwards.
    pub fn record_applied(&mut self, at: SyncTimestamp) -> SyncTimestamp {
        self.last_sync_time = self.last_sync_time.max(at);
        self.frames_applied += 1;
        self.last_sync_time
    }
}
