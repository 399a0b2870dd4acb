//! Wall clock sources
//!
//! All timestamps are unix time in milliseconds.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use web_time::{SystemTime, UNIX_EPOCH};

/// Source of the current wall-clock time
pub trait TimeSource: Debug + Send + Sync {
    /// Current unix time in milliseconds
    fn now_ms(&self) -> u64;
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Current unix time in milliseconds from the system clock
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or(0)
}

/// System clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_ms(&self) -> u64 {
        unix_time_ms()
    }
}

/// Wall clock anchored once and then advanced by the tokio monotonic clock
///
/// Immune to system clock jumps after creation, and follows virtual time when the tokio clock
/// is paused in tests.
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    origin_ms: u64,
    origin: tokio::time::Instant,
}

impl InstantClock {
    /// Anchor on the system clock
    pub fn new() -> Self {
        Self::starting_at(unix_time_ms())
    }

    /// Anchor on an explicit unix time in milliseconds
    pub fn starting_at(origin_ms: u64) -> Self {
        Self {
            origin_ms,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for InstantClock {
    fn now_ms(&self) -> u64 {
        self.origin_ms
            .saturating_add(duration_ms(self.origin.elapsed()))
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Create new [`ManualClock`]
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Set the current time
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, millis: u64) {
        self.now_ms.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
