//! Throttle gate: the per-request integration point.
//!
//! The gate wires the key deriver and the decision engine together and turns
//! a [`Decision`](crate::engine::Decision) into a [`GateResult`] the caller
//! can act on. It holds no mutable state of its own; invoke it concurrently
//! from as many workers as needed, coordination happens in the store.
//!
//! Store outages are the one policy decision the gate owns: a bounded number
//! of retries, then the configured [`FailPolicy`].

use crate::engine::{DecisionEngine, RateLimitConfig};
use crate::key::{KeyDeriver, ScopedKeyDeriver};
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::store::CounterStore;
use std::sync::Arc;
use std::time::Duration;

/// How requests are treated while the counter store is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPolicy {
    /// Admit while the store is down.
    FailOpen,
    /// Deny while the store is down.
    FailClosed,
}

/// Why a request was turned away before any throttling decision.
///
/// A rejection is a caller error; retrying the same request will not help,
/// and the store is never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No (or an empty) rate-limit identifier on the request.
    MissingIdentifier,
}

/// Outcome of one gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateResult {
    /// Under the limit; let the request proceed.
    Admit,
    /// Over the limit. `retry_after` says when a retry may succeed; it is
    /// `None` only when a store outage was mapped to a deny by
    /// [`FailPolicy::FailClosed`], where no honest estimate exists.
    Deny { retry_after: Option<Duration> },
    /// Malformed request.
    Reject(RejectReason),
}

impl GateResult {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

/// Per-request admission gate.
pub struct ThrottleGate<S> {
    engine: DecisionEngine<S>,
    deriver: Arc<dyn KeyDeriver>,
    fail_policy: FailPolicy,
    store_retries: u32,
    retry_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl<S: CounterStore> ThrottleGate<S> {
    /// Start building a gate over `store` with `config`. Everything else has
    /// defaults: fail-closed, no store retries, the default key scope.
    pub fn builder(store: S, config: RateLimitConfig) -> ThrottleGateBuilder<S> {
        ThrottleGateBuilder {
            store: Arc::new(store),
            config,
            deriver: Arc::new(ScopedKeyDeriver::default()),
            fail_policy: FailPolicy::FailClosed,
            store_retries: 0,
            retry_delay: Duration::from_millis(25),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Check one request, identified by `identifier`.
    ///
    /// Missing or empty identifiers reject immediately. Otherwise the key is
    /// derived, one attempt is recorded against the store, and the decision
    /// maps onto admit/deny. Store errors are retried `store_retries` times
    /// with `retry_delay` pacing before the fail policy applies.
    pub async fn check(&self, identifier: Option<&str>) -> GateResult {
        let identifier = match identifier {
            Some(id) if !id.is_empty() => id,
            _ => return GateResult::Reject(RejectReason::MissingIdentifier),
        };
        let key = self.deriver.derive_key(identifier);

        let mut attempt = 0u32;
        loop {
            match self.engine.evaluate(&key).await {
                Ok(decision) if decision.admitted => return GateResult::Admit,
                Ok(decision) => {
                    return GateResult::Deny { retry_after: decision.retry_after };
                }
                Err(error) if attempt < self.store_retries => {
                    attempt += 1;
                    tracing::debug!(%key, %error, attempt, "counter store error, retrying");
                    self.sleeper.sleep(self.retry_delay).await;
                }
                Err(error) => {
                    // An outage is not a legitimate deny; keep them apart in logs.
                    tracing::warn!(
                        %key,
                        %error,
                        policy = ?self.fail_policy,
                        "counter store unavailable, applying fail policy"
                    );
                    return match self.fail_policy {
                        FailPolicy::FailOpen => GateResult::Admit,
                        FailPolicy::FailClosed => GateResult::Deny { retry_after: None },
                    };
                }
            }
        }
    }
}

/// Builder for [`ThrottleGate`].
pub struct ThrottleGateBuilder<S> {
    store: Arc<S>,
    config: RateLimitConfig,
    deriver: Arc<dyn KeyDeriver>,
    fail_policy: FailPolicy,
    store_retries: u32,
    retry_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl<S: CounterStore> ThrottleGateBuilder<S> {
    /// Replace the default [`ScopedKeyDeriver`].
    pub fn key_deriver(mut self, deriver: impl KeyDeriver + 'static) -> Self {
        self.deriver = Arc::new(deriver);
        self
    }

    pub fn fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    /// Retries against the store before the fail policy applies. Default 0.
    pub fn store_retries(mut self, retries: u32) -> Self {
        self.store_retries = retries;
        self
    }

    /// Pause between store retries. Default 25ms.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Replace the sleeper used for retry pacing. Tests inject
    /// [`InstantSleeper`](crate::sleeper::InstantSleeper) or
    /// [`TrackingSleeper`](crate::sleeper::TrackingSleeper).
    pub fn sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn build(self) -> ThrottleGate<S> {
        ThrottleGate {
            engine: DecisionEngine::new(self.store, self.config),
            deriver: self.deriver,
            fail_policy: self.fail_policy,
            store_retries: self.store_retries,
            retry_delay: self.retry_delay,
            sleeper: self.sleeper,
        }
    }
}
