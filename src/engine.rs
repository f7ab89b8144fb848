//! Fixed-window rate decision engine.
//!
//! The engine owns the admission arithmetic and nothing else: one store
//! increment per evaluation, one comparison against the limit. All shared
//! state and all synchronization live in the injected [`CounterStore`].
//!
//! Windows are fixed, not sliding: the boundary is anchored to the first
//! increment for a key and stays put until expiry.

use crate::key::RateKey;
use crate::store::{CounterStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

/// Limit/window pair, validated at construction so call sites never see a
/// degenerate config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    limit: u32,
    window: Duration,
}

/// Rejected configuration values. Raised at construction, never at call time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("limit must be greater than zero")]
    ZeroLimit,
    #[error("window must be greater than zero")]
    ZeroWindow,
    #[error("unrecognized rate: {0:?}")]
    UnparsableRate(String),
}

impl RateLimitConfig {
    /// Build a config of `limit` admissions per `window`.
    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { limit, window })
    }

    /// Parse a compact `"count/period"` rate, e.g. `"1/s"`, `"100/m"`,
    /// `"5000/h"`, `"10000/d"`.
    pub fn from_rate(rate: &str) -> Result<Self, ConfigError> {
        let unparsable = || ConfigError::UnparsableRate(rate.to_string());
        let (count, period) = rate.split_once('/').ok_or_else(unparsable)?;
        let limit: u32 = count.trim().parse().map_err(|_| unparsable())?;
        // Only the leading letter matters, so "s", "sec" and "second" agree.
        let secs = match period.trim().chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 3_600,
            Some('d') => 86_400,
            _ => return Err(unparsable()),
        };
        Self::new(limit, Duration::from_secs(secs))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Outcome of one evaluation. A value, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether this attempt is under the limit.
    pub admitted: bool,
    /// Running count for the window, this attempt included. Denied attempts
    /// count too, so the total at window end equals the calls made.
    pub current_count: u64,
    /// Time until the window resets. Present exactly when denied.
    pub retry_after: Option<Duration>,
}

/// Decides admit/deny for a key by comparing the store's atomically
/// incremented count against the configured limit.
///
/// Stateless apart from the injected store; share freely across tasks.
#[derive(Debug, Clone)]
pub struct DecisionEngine<S> {
    store: Arc<S>,
    config: RateLimitConfig,
}

impl<S: CounterStore> DecisionEngine<S> {
    pub fn new(store: Arc<S>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Record one attempt for `key` and decide admission.
    ///
    /// Every call increments, admitted or not. May suspend on store I/O; do
    /// not hold locks across it. On [`StoreError`] the engine propagates
    /// rather than guessing a decision; fail-open/fail-closed is the
    /// caller's policy, not the engine's.
    pub async fn evaluate(&self, key: &RateKey) -> Result<Decision, StoreError> {
        let window = self.store.increment_and_get_with_ttl(key, self.config.window).await?;
        if window.count <= u64::from(self.config.limit) {
            Ok(Decision { admitted: true, current_count: window.count, retry_after: None })
        } else {
            tracing::debug!(
                %key,
                count = window.count,
                limit = self.config.limit,
                "over limit, denying until window resets"
            );
            Ok(Decision {
                admitted: false,
                current_count: window.count,
                retry_after: Some(window.remaining),
            })
        }
    }
}
