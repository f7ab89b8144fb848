//! Counter storage for fixed-window throttling.
//!
//! The store is the only shared mutable state in the system and therefore its
//! only synchronization point. Everything hinges on one primitive,
//! [`CounterStore::increment_and_get_with_ttl`], being indivisible: two
//! callers racing on an absent key must produce exactly one window, and no
//! increment may be lost or double-counted.
//!
//! Backends:
//! - [`InMemoryCounterStore`]: single-process, mutex-serialized.
//! - `RedisCounterStore` (feature `redis`): shared across processes, with the
//!   whole increment running as one server-side script.
//! - [`UnavailableCounterStore`]: always fails; for exercising fail policies.

use crate::clock::{Clock, MonotonicClock};
use crate::key::RateKey;
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(feature = "redis")]
pub mod redis;

/// Result of one atomic increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Count after this increment, including it.
    pub count: u64,
    /// True when this increment created the window.
    pub is_new_window: bool,
    /// Time until the current window expires. Callers turn this into
    /// retry-after guidance; a live window always has a positive remainder.
    pub remaining: Duration,
}

/// Error from a counter store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the operation did not complete.
    /// Never returned in place of a legitimate count of zero.
    #[error("counter store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }
}

/// Atomic increment-with-expiry primitive shared by all request handlers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key`, creating it with expiry `ttl` if no
    /// live entry exists.
    ///
    /// Absent or expired key: a fresh entry starts at 1 and the call returns
    /// `(1, true, ttl)`. Live key: the count goes up by one, the expiry is
    /// left untouched (fixed window), and the call returns the new count with
    /// the time left in the window.
    ///
    /// The whole operation is one indivisible step; there is no
    /// read-check-then-write gap for concurrent callers to fall into. An
    /// in-flight increment either fully applies or fails with
    /// [`StoreError::Unavailable`].
    async fn increment_and_get_with_ttl(
        &self,
        key: &RateKey,
        ttl: Duration,
    ) -> Result<WindowCount, StoreError>;
}

#[derive(Debug)]
struct CounterEntry {
    count: u64,
    window_started_at: u64,
    expires_at: u64,
}

/// Single-process counter store.
///
/// The mutex makes increment-and-expire one indivisible step. Expired entries
/// are treated as absent and replaced on next touch (lazy deletion), so no
/// sweeper task is needed. Clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct InMemoryCounterStore {
    entries: Arc<Mutex<HashMap<RateKey, CounterEntry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::default()))
    }

    /// Build against an injected clock. Tests pair this with
    /// [`ManualClock`](crate::clock::ManualClock) to cross window boundaries
    /// without sleeping.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())), clock }
    }

    /// Millis timestamp at which the live window for `key` started, if any.
    ///
    /// The value is fixed at window creation and never moves while the entry
    /// lives, which is what makes the window fixed rather than sliding.
    pub fn window_started_at(&self, key: &RateKey) -> Option<u64> {
        let now = self.clock.now_millis();
        let entries = self.entries.lock().ok()?;
        entries.get(key).filter(|e| now < e.expires_at).map(|e| e.window_started_at)
    }

    /// Number of live (unexpired) entries.
    pub fn live_entries(&self) -> usize {
        let now = self.clock.now_millis();
        match self.entries.lock() {
            Ok(entries) => entries.values().filter(|e| now < e.expires_at).count(),
            Err(_) => 0,
        }
    }

    /// Drop expired entries eagerly. Optional; lookups already treat expired
    /// entries as absent, this just reclaims their memory sooner.
    pub fn purge_expired(&self) {
        let now = self.clock.now_millis();
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, e| now < e.expires_at);
        }
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_and_get_with_ttl(
        &self,
        key: &RateKey,
        ttl: Duration,
    ) -> Result<WindowCount, StoreError> {
        let now = self.clock.now_millis();
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::unavailable("counter store mutex poisoned"))?;
        let fresh = CounterEntry {
            count: 1,
            window_started_at: now,
            expires_at: now.saturating_add(ttl_millis),
        };
        let fresh_count = WindowCount { count: 1, is_new_window: true, remaining: ttl };
        match entries.entry(key.clone()) {
            Entry::Occupied(mut entry) if now < entry.get().expires_at => {
                let state = entry.get_mut();
                state.count += 1;
                Ok(WindowCount {
                    count: state.count,
                    is_new_window: false,
                    remaining: Duration::from_millis(state.expires_at - now),
                })
            }
            Entry::Occupied(mut entry) => {
                entry.insert(fresh);
                Ok(fresh_count)
            }
            Entry::Vacant(entry) => {
                entry.insert(fresh);
                Ok(fresh_count)
            }
        }
    }
}

/// Store that fails every operation. Stands in for an unreachable backend
/// when exercising fail-open/fail-closed behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCounterStore;

#[async_trait]
impl CounterStore for UnavailableCounterStore {
    async fn increment_and_get_with_ttl(
        &self,
        _key: &RateKey,
        _ttl: Duration,
    ) -> Result<WindowCount, StoreError> {
        Err(StoreError::unavailable("store configured as unavailable"))
    }
}
