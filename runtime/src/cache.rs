//! Snapshot cache for the HTTP service.
//!
//! A live read costs a browser login, so the service keeps the last good
//! snapshot for a TTL. Time comes from a [`Clock`] so expiry is testable
//! without sleeping.

use bonus_plan::Snapshot;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// A snapshot and when it was fetched.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub value: Snapshot,
    pub fetched_at: Instant,
}

impl CachedSnapshot {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

/// Single-entry TTL cache.
pub struct SnapshotCache<C: Clock> {
    clock: C,
    ttl: Duration,
    entry: Option<CachedSnapshot>,
}

impl<C: Clock> SnapshotCache<C> {
    pub fn new(clock: C, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entry: None,
        }
    }

    /// The cached snapshot if it is younger than the TTL.
    pub fn fresh(&self) -> Option<&Snapshot> {
        let now = self.clock.now();
        self.entry
            .as_ref()
            .filter(|entry| entry.age(now) < self.ttl)
            .map(|entry| &entry.value)
    }

    pub fn store(&mut self, value: Snapshot) {
        self.entry = Some(CachedSnapshot {
            value,
            fetched_at: self.clock.now(),
        });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
