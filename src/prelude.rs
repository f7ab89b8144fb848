//! Convenient re-exports for common Turnstile types.
pub use crate::{
    clock::{Clock, ManualClock, MonotonicClock},
    engine::{ConfigError, Decision, DecisionEngine, RateLimitConfig},
    error::ThrottleError,
    gate::{FailPolicy, GateResult, RejectReason, ThrottleGate, ThrottleGateBuilder},
    key::{KeyDeriver, RateKey, ScopedKeyDeriver},
    middleware::{ThrottleLayer, ThrottleService},
    sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper},
    store::{CounterStore, InMemoryCounterStore, StoreError, UnavailableCounterStore, WindowCount},
};
