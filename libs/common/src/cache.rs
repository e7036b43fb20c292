//! Ephemeral token store
//!
//! This module defines the [`TokenStore`] contract used for refresh-session
//! fingerprints and one-time codes: a key/value store with per-key TTL and
//! atomic single-key operations. Two implementations are provided, a Redis
//! backed [`RedisPool`] for deployments and an in-process [`MemoryStore`].
//!
//! Entries may be lost at any time (restart, eviction); callers treat the
//! store as a cache, never as the source of truth for user existence.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use redis::{AsyncCommands, Client, Script, aio::MultiplexedConnection};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::CacheResult;

/// Replaces the value only while it still equals the expected one.
const COMPARE_AND_SET_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
    return 1
end
return 0
"#;

/// Deletes the key only while it still holds the expected value.
const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Key/value store with per-key time-to-live.
///
/// Every operation is atomic for a single key. `set` is last-writer-wins;
/// the `compare_and_*` operations are the conditional primitives used where
/// a read-then-write would race.
pub trait TokenStore: Clone + Send + Sync + 'static {
    /// Store `value` under `key`, replacing any previous value
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    /// Fetch the live value stored under `key`
    fn get(&self, key: &str) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    /// Remove `key`; removing an absent key is not an error
    fn delete(&self, key: &str) -> impl Future<Output = CacheResult<()>> + Send;

    /// Replace the value with `new` and reset its TTL if the current value
    /// equals `expected`. Returns whether the swap happened.
    fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl_seconds: u64,
    ) -> impl Future<Output = CacheResult<bool>> + Send;

    /// Delete the key if its current value equals `expected`. Returns
    /// whether the key was deleted.
    fn compare_and_delete(
        &self,
        key: &str,
        expected: &str,
    ) -> impl Future<Output = CacheResult<bool>> + Send;
}

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Self {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        RedisConfig { url }
    }
}

/// Redis client handle
///
/// Holds one multiplexed connection opened at construction; clones share it.
#[derive(Clone)]
pub struct RedisPool {
    connection: MultiplexedConnection,
}

impl RedisPool {
    /// Open a connection to the configured Redis server
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone())?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Redis client connected to {}", config.url);
        Ok(RedisPool { connection })
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

impl TokenStore for RedisPool {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl_seconds: u64,
    ) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let swapped: i64 = Script::new(COMPARE_AND_SET_SCRIPT)
            .key(key)
            .arg(expected)
            .arg(new)
            .arg(ttl_seconds)
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = Script::new(COMPARE_AND_DELETE_SCRIPT)
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }
}

/// Memory store entry
#[derive(Debug)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process token store
///
/// Entries expire lazily: an expired entry is treated as absent and dropped
/// the next time its key is touched.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn live_count(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| entry.is_live(now)).count()
    }

    fn live_value<'a>(
        entries: &'a mut HashMap<String, MemoryEntry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a str> {
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        entries.get(key).map(|entry| entry.value.as_str())
    }
}

impl TokenStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        Ok(Self::live_value(&mut entries, key, Instant::now()).map(str::to_string))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl_seconds: u64,
    ) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if Self::live_value(&mut entries, key, now) != Some(expected) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: new.to_string(),
                expires_at: now + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(true)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let mut entries = self.entries.lock().await;
        if Self::live_value(&mut entries, key, Instant::now()) != Some(expected) {
            return Ok(false);
        }
        entries.remove(key);
        Ok(true)
    }
}
