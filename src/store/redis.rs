//! Redis-backed counter store.
//!
//! Shares one logical counter across processes and hosts. The `INCR`, the
//! initial `PEXPIRE`, and the `PTTL` read all run inside a single Lua script,
//! so the whole increment is one atomic step on the server; window expiry is
//! owned by Redis TTLs rather than a local clock.
//!
//! Connections go through `redis::aio::ConnectionManager`, which reconnects
//! on its own. Any Redis error surfaces as [`StoreError::Unavailable`].

use super::{CounterStore, StoreError, WindowCount};
use crate::key::RateKey;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use std::fmt;
use std::time::Duration;

// INCR creates the key at 1, so `count == 1` doubles as the new-window
// signal. The PTTL < 0 branch re-arms the expiry if the key somehow exists
// without one (e.g. created out-of-band), keeping the window bounded.
const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Counter store backed by a shared Redis instance.
pub struct RedisCounterStore {
    connection: ConnectionManager,
    script: Script,
}

impl RedisCounterStore {
    /// Connect to `url`, e.g. `redis://127.0.0.1/`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| StoreError::unavailable(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Ok(Self { connection, script: Script::new(INCREMENT_SCRIPT) })
    }
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_and_get_with_ttl(
        &self,
        key: &RateKey,
        ttl: Duration,
    ) -> Result<WindowCount, StoreError> {
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let mut connection = self.connection.clone();
        let (count, pttl): (u64, i64) = self
            .script
            .key(key.as_str())
            .arg(ttl_millis)
            .invoke_async(&mut connection)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        let remaining = u64::try_from(pttl).map(Duration::from_millis).unwrap_or(ttl);
        Ok(WindowCount { count, is_new_window: count == 1, remaining })
    }
}
