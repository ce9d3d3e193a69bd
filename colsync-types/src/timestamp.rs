//! Hybrid Logical Clock timestamps for the sync watermark.
//!
//! Combines physical time with a logical counter to ensure:
//! - Monotonicity (a clock never hands out the same value twice)
//! - Bounded drift from physical time
//!
//! A collection owns one [`SyncClock`]. Both the watermark advanced after each
//! applied frame and the `t0` recorded by an optimistic mutation are ticks of
//! that same clock, so "applied after the mutation started" is a plain `>`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A Hybrid Logical Clock timestamp.
///
/// Consists of:
/// - `wall_time`: Milliseconds since Unix epoch (physical component)
/// - `logical`: Logical counter for ticks at the same wall time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncTimestamp {
    /// Physical time component (milliseconds since Unix epoch).
    wall_time: u64,
    /// Logical counter for ordering ticks at the same wall time.
    logical: u32,
}

impl SyncTimestamp {
    /// The smallest timestamp. Used as the watermark before any frame is applied.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new timestamp at the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            wall_time: wall_clock_millis(),
            logical: 0,
        }
    }

    /// Creates a timestamp from components.
    #[must_use]
    pub const fn new(wall_time: u64, logical: u32) -> Self {
        Self { wall_time, logical }
    }

    /// Returns the wall time component.
    #[must_use]
    pub const fn wall_time(&self) -> u64 {
        self.wall_time
    }

    /// Returns the logical counter.
    #[must_use]
    pub const fn logical(&self) -> u32 {
        self.logical
    }

    /// Generates the next timestamp, strictly greater than `self`.
    #[must_use]
    pub fn tick(&self) -> Self {
        let now = wall_clock_millis();

        if now > self.wall_time {
            Self {
                wall_time: now,
                logical: 0,
            }
        } else if self.logical == u32::MAX {
            Self {
                wall_time: self.wall_time + 1,
                logical: 0,
            }
        } else {
            Self {
                wall_time: self.wall_time,
                logical: self.logical + 1,
            }
        }
    }

    /// Returns true if this timestamp is before the other.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns true if this timestamp is after the other.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl Default for SyncTimestamp {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialOrd for SyncTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SyncTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.wall_time.cmp(&other.wall_time) {
            Ordering::Equal => self.logical.cmp(&other.logical),
            other => other,
        }
    }
}

/// A shared monotonic source of [`SyncTimestamp`]s.
///
/// Every call to [`SyncClock::tick`] returns a value strictly greater than any
/// value previously returned by the same clock.
#[derive(Debug, Default)]
pub struct SyncClock {
    last: Mutex<SyncTimestamp>,
}

impl SyncClock {
    /// Creates a clock that has not ticked yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock and returns the new timestamp.
    pub fn tick(&self) -> SyncTimestamp {
        let mut last = self.last.lock();
        *last = last.tick();
        *last
    }

    /// Returns the most recent tick without advancing.
    #[must_use]
    pub fn peek(&self) -> SyncTimestamp {
        *self.last.lock()
    }
}
