//! Sale activation clock

use std::fmt;
use std::sync::Arc;

use dropkit_common::TimeSource;

/// The sale is open once `now_ms` reaches `sale_start_ms`
#[inline]
pub fn is_sale_active(now_ms: u64, sale_start_ms: u64) -> bool {
    now_ms >= sale_start_ms
}

/// Derives whether the sale is open
///
/// Activation latches: once the threshold has been crossed the clock reports active for the
/// rest of its life, even if a later refresh moves the start date.
#[derive(Debug, Clone)]
pub struct SaleActivationClock {
    time: Arc<dyn TimeSource>,
    active: bool,
}

impl SaleActivationClock {
    /// Create new [`SaleActivationClock`]
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            time,
            active: false,
        }
    }

    /// Current unix time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.time.now_ms()
    }

    /// Whether the sale has been observed as open
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Re-evaluate against `sale_start_ms`
    ///
    /// Returns `true` only on the evaluation that flips the clock to active. A first
    /// evaluation after the start time flips it immediately.
    pub fn evaluate(&mut self, sale_start_ms: u64) -> bool {
        if self.active {
            return false;
        }

        if is_sale_active(self.now_ms(), sale_start_ms) {
            self.active = true;
            return true;
        }

        false
    }

    /// Time left until `sale_start_ms`
    pub fn countdown(&self, sale_start_ms: u64) -> Countdown {
        Countdown::between(self.now_ms(), sale_start_ms)
    }
}

/// Time left until the sale starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Whole days
    pub days: u64,
    /// Hours within the day
    pub hours: u64,
    /// Minutes within the hour
    pub minutes: u64,
    /// Seconds within the minute
    pub seconds: u64,
}

impl Countdown {
    /// Countdown from `now_ms` to `target_ms`, partial seconds round up
    pub fn between(now_ms: u64, target_ms: u64) -> Self {
        let remaining_ms = target_ms.saturating_sub(now_ms);
        let total_seconds = remaining_ms.div_ceil(1_000);

        Self {
            days: total_seconds / 86_400,
            hours: (total_seconds % 86_400) / 3_600,
            minutes: (total_seconds % 3_600) / 60,
            seconds: total_seconds % 60,
        }
    }

    /// Nothing left to count down
    pub fn is_completed(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Hours including whole days
    pub fn total_hours(&self) -> u64 {
        self.hours + self.days * 24
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hours, {} minutes, {} seconds",
            self.total_hours(),
            self.minutes,
            self.seconds
        )
    }
}
