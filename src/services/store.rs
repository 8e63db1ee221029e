//! Key-value persistence for estimates and training progress.
//!
//! Values are stored as JSON strings. Two backends:
//! - `RedisStore` over a pooled `ConnectionManager`
//! - `MemoryStore` for local runs and tests

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one. `None` keeps it forever.
    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Returns whether a value was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Atomically replace the value if it still equals `expected`, where
    /// `None` means the key must be absent. Returns whether the write
    /// happened. The stored value has no TTL.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> Result<bool>;

    async fn health_check(&self) -> Result<()>;

    fn backend(&self) -> &'static str;
}

impl dyn KeyValueStore {
    /// Read and decode a JSON value. A value that no longer decodes is
    /// treated as missing.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(data) = self.get_raw(key).await? else {
            debug!(key = key, "Store miss");
            return Ok(None);
        };

        match serde_json::from_str(&data) {
            Ok(value) => {
                debug!(key = key, "Store hit");
                Ok(Some(value))
            }
            Err(e) => {
                warn!(key = key, error = %e, "Failed to deserialize stored value");
                Ok(None)
            }
        }
    }

    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let data = serde_json::to_string(value).context("Failed to serialize value for store")?;
        self.set_raw(key, data, ttl).await
    }
}

/// GET and conditional SET in one server-side step.
/// ARGV: expected-present flag, expected value, new value.
const COMPARE_AND_SWAP_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
  if current ~= ARGV[2] then return 0 end
elseif current then
  return 0
end
redis.call('SET', KEYS[1], ARGV[3])
return 1
"#;

/// Redis store with connection pooling.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("Redis store connected");

        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[instrument(skip(self))]
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key).await.map_err(|e| {
            error!(key = key, error = %e, "Redis get error");
            anyhow::Error::new(e).context("Failed to read value")
        })
    }

    #[instrument(skip(self, value))]
    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .context("Failed to set value")?,
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .context("Failed to set value")?,
        }

        debug!(key = key, ttl_secs = ttl.map(|t| t.as_secs()), "Stored value");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();

        let deleted: i32 = conn.del(key).await.context("Failed to delete key")?;

        debug!(key = key, deleted = deleted > 0, "Store delete");
        Ok(deleted > 0)
    }

    #[instrument(skip(self, expected, value))]
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();

        let swapped: i32 = redis::Script::new(COMPARE_AND_SWAP_SCRIPT)
            .key(key)
            .arg(if expected.is_some() { "1" } else { "0" })
            .arg(expected.unwrap_or_default())
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .context("Failed to compare and swap value")?;

        debug!(key = key, swapped = swapped == 1, "Store compare and swap");
        Ok(swapped == 1)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-local store. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .write()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let current = entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.as_str());
        if current != expected {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Store key builders for consistent key formats.
pub mod keys {
    use uuid::Uuid;

    /// Stored estimate, latest version
    pub fn estimate(estimate_id: Uuid) -> String {
        format!("estimate:{}", estimate_id)
    }

    /// Training progress for one user and module
    pub fn progress(module_id: &str, user_id: &str) -> String {
        format!("progress:{}:user:{}", module_id, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn json_values_round_trip_through_memory_store() {
        let store = store();
        let value = Sample {
            name: "air mover".into(),
            count: 2,
        };

        store.set_json("sample", &value, None).await.unwrap();
        let loaded: Option<Sample> = store.get_json("sample").await.unwrap();
        assert_eq!(loaded, Some(value));

        assert!(store.delete("sample").await.unwrap());
        assert!(!store.delete("sample").await.unwrap());
        assert_eq!(store.get_json::<Sample>("sample").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let store = MemoryStore::new();
        store
            .set_raw("short", "1".into(), Some(Duration::from_millis(0)))
            .await
            .unwrap();
        store.set_raw("long", "2".into(), None).await.unwrap();

        assert_eq!(store.get_raw("short").await.unwrap(), None);
        assert_eq!(store.get_raw("long").await.unwrap(), Some("2".into()));
        assert!(!store.delete("short").await.unwrap());
    }

    #[tokio::test]
    async fn undecodable_value_reads_as_missing() {
        let store = store();
        store.set_raw("bad", "{not json".into(), None).await.unwrap();
        assert_eq!(store.get_json::<Sample>("bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn compare_and_swap_rejects_stale_expectations() {
        let store = MemoryStore::new();

        assert!(store.compare_and_swap("k", None, "v1".into()).await.unwrap());
        // key now exists, so an "absent" expectation is stale
        assert!(!store.compare_and_swap("k", None, "v2".into()).await.unwrap());
        assert!(!store
            .compare_and_swap("k", Some("v0"), "v2".into())
            .await
            .unwrap());
        assert!(store
            .compare_and_swap("k", Some("v1"), "v2".into())
            .await
            .unwrap());
        assert_eq!(store.get_raw("k").await.unwrap(), Some("v2".into()));

        // an expired entry counts as absent
        store
            .set_raw("gone", "old".into(), Some(Duration::from_millis(0)))
            .await
            .unwrap();
        assert!(store.compare_and_swap("gone", None, "new".into()).await.unwrap());
        assert_eq!(store.get_raw("gone").await.unwrap(), Some("new".into()));
    }

    #[test]
    fn key_formats() {
        assert_eq!(keys::progress("day-1", "u-42"), "progress:day-1:user:u-42");
        let id = uuid::Uuid::nil();
        assert_eq!(
            keys::estimate(id),
            "estimate:00000000-0000-0000-0000-000000000000"
        );
    }
}
