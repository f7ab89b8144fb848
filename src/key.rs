//! Rate key derivation.
//!
//! A [`RateKey`] partitions counters per client: same identifier, same key;
//! distinct identifiers, distinct keys. Derivation is pure so the gate can
//! call it before (and without) touching the store.

use std::fmt;

/// Opaque key a counter is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey(String);

impl RateKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a client identifier to its [`RateKey`].
///
/// Implementations must be deterministic and free of I/O and side effects.
/// Validating that the identifier is present at all is the gate's job; a
/// deriver only ever sees non-empty identifiers.
pub trait KeyDeriver: Send + Sync {
    fn derive_key(&self, identifier: &str) -> RateKey;
}

/// Default deriver: namespaces the identifier verbatim under a scope,
/// producing `throttle:{scope}:{identifier}`.
///
/// Carrying the identifier verbatim makes key distinctness exact rather than
/// probabilistic, and keeps keys greppable in a shared backend.
#[derive(Debug, Clone)]
pub struct ScopedKeyDeriver {
    scope: String,
}

impl ScopedKeyDeriver {
    pub fn new(scope: impl Into<String>) -> Self {
        Self { scope: scope.into() }
    }
}

impl Default for ScopedKeyDeriver {
    fn default() -> Self {
        Self::new("client")
    }
}

impl KeyDeriver for ScopedKeyDeriver {
    fn derive_key(&self, identifier: &str) -> RateKey {
        RateKey::new(format!("throttle:{}:{}", self.scope, identifier))
    }
}
