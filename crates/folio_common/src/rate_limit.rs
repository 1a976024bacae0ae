//! Per-source cooldown tracker.
//!
//! Remembers when each interaction source last produced an accepted award.
//! Entries live only as long as the limiter; nothing here is persisted.

use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default cooldown between page-visit awards for the same page
pub const DEFAULT_VISIT_COOLDOWN_MS: u64 = 5000;

/// Millisecond time source
pub trait Clock: fmt::Debug {
    fn now_ms(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: i64) {
        self.millis.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    last_award: HashMap<String, i64>,
    clock: Box<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Box::new(SystemClock))
    }
}

impl RateLimiter {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            last_award: HashMap::new(),
            clock,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// True if `key` has no recorded award or its cooldown has elapsed.
    ///
    /// A clock that moved backwards past the recorded award counts as
    /// elapsed, so a skewed clock cannot lock a source out.
    pub fn should_award(&self, key: &str, cooldown_ms: u64) -> bool {
        match self.last_award.get(key) {
            None => true,
            Some(&last) => {
                let elapsed = self.now_ms() - last;
                elapsed < 0 || elapsed as u64 >= cooldown_ms
            }
        }
    }

    pub fn record_award(&mut self, key: &str, timestamp_ms: i64) {
        self.last_award.insert(key.to_string(), timestamp_ms);
    }

    /// Check and record in one step
    pub fn try_acquire(&mut self, key: &str, cooldown_ms: u64) -> bool {
        if !self.should_award(key, cooldown_ms) {
            debug!("Cooldown active for '{}'", key);
            return false;
        }
        let now = self.now_ms();
        self.record_award(key, now);
        true
    }

    pub fn last_award(&self, key: &str) -> Option<i64> {
        self.last_award.get(key).copied()
    }

    /// Milliseconds until `key` may award again (0 if it may now)
    pub fn remaining_ms(&self, key: &str, cooldown_ms: u64) -> u64 {
        match self.last_award.get(key) {
            None => 0,
            Some(&last) => {
                let elapsed = self.now_ms() - last;
                if elapsed < 0 {
                    0
                } else {
                    cooldown_ms.saturating_sub(elapsed as u64)
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.last_award.clear();
    }

    pub fn len(&self) -> usize {
        self.last_award.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_award.is_empty()
    }
}
