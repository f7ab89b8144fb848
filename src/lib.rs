#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Turnstile
//!
//! Per-client request throttling for async Rust: fixed-window admission over
//! an atomic counter store, with a tower gate.
//!
//! ## Features
//!
//! - **Fixed-window decisions** with retry-after guidance on every denial
//! - **Atomic counter stores**: one indivisible increment-with-expiry
//!   primitive, in-memory for single-process deployments or Redis-backed
//!   (feature `redis`) when many processes share one limit
//! - **Explicit fail policy** (fail-open / fail-closed) plus bounded retries
//!   when the store is unreachable
//! - **Tower middleware** so any `tower::Service` can sit behind the gate
//! - **Injectable clock and sleeper** for deterministic tests
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use turnstile::{FailPolicy, InMemoryCounterStore, RateLimitConfig, ThrottleGate};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RateLimitConfig::new(2, Duration::from_secs(1)).unwrap();
//!     let gate = ThrottleGate::builder(InMemoryCounterStore::new(), config)
//!         .fail_policy(FailPolicy::FailClosed)
//!         .build();
//!
//!     assert!(gate.check(Some("api-key-1")).await.is_admitted());
//! }
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod gate;
pub mod key;
pub mod middleware;
pub mod prelude;
pub mod sleeper;
pub mod store;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use engine::{ConfigError, Decision, DecisionEngine, RateLimitConfig};
pub use error::ThrottleError;
pub use gate::{FailPolicy, GateResult, RejectReason, ThrottleGate, ThrottleGateBuilder};
pub use key::{KeyDeriver, RateKey, ScopedKeyDeriver};
pub use middleware::{ThrottleLayer, ThrottleService};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use store::{
    CounterStore, InMemoryCounterStore, StoreError, UnavailableCounterStore, WindowCount,
};
#[cfg(feature = "redis")]
pub use store::redis::RedisCounterStore;
