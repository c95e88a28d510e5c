//! Clocks used to stamp outgoing property records.
//!
//! Record timestamps are informational only: the consumer applies records in
//! arrival order and never compares timestamps. They still need a source, and
//! keeping that source behind a trait lets tests drive it deterministically.

use std::sync::atomic::{AtomicU64, Ordering};

/// A source of producer timestamps.
pub trait Clock: Send + Sync {
    /// Current timestamp.
    fn now(&self) -> u64;
}

/// Wall clock in nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX);
        u64::try_from(nanos).unwrap_or(0)
    }
}

/// A manually driven clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    current: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            current: AtomicU64::new(start),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: u64) {
        self.current.fetch_add(delta, Ordering::SeqCst);
    }

    /// Jump to an absolute reading.
    pub fn set(&self, value: u64) {
        self.current.store(value, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
