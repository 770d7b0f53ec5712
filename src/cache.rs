//! Time-boxed response cache over named query signatures.
//!
//! Orchestrators key cached result lists by a deterministic query signature
//! (see [`crate::service`]) and never hold an entry across calls; every
//! operation re-reads. Two implementations of [`CacheStore`] are provided:
//!
//! - **[`SqliteCache`]** — persistent, backed by a single `cache_entries`
//!   table (the production store).
//! - **[`MemoryCache`]** — a `HashMap` behind a mutex, used by tests and
//!   ephemeral runs.
//!
//! Both fail soft in every direction: a malformed or unreadable entry is a
//! miss, a failed write is logged and swallowed. The fetched data is already
//! valid for the current call, so a cache fault must never abort it.
//!
//! Staleness is checked at read time against the configured TTL; there is
//! no background eviction. A later call's write may overwrite an earlier
//! call's entry; last-write-wins is the accepted consistency model.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::db;

/// A cached result list plus its write time (unix milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(data: Value, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    /// An entry is valid only while `now - timestamp < ttl`.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms - self.timestamp < ttl_ms
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Injected cache capability. `get` returns only fresh entries; `set` and
/// `invalidate` never surface errors to the caller.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, data: Value);
    async fn invalidate(&self, key: &str);
}

// ============ In-memory store ============

/// In-memory cache used by tests and ephemeral runs.
pub struct MemoryCache {
    ttl_ms: i64,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            ttl_ms,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if entry.is_fresh(now_ms(), self.ttl_ms) {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    async fn set(&self, key: &str, data: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), CacheEntry::new(data, now_ms()));
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

// ============ SQLite store ============

/// Persistent cache over a single `cache_entries` table.
pub struct SqliteCache {
    pool: SqlitePool,
    ttl_ms: i64,
}

impl SqliteCache {
    pub async fn open(config: &CacheConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config.path).await?;
        Ok(Self {
            pool,
            ttl_ms: config.ttl_ms(),
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let row = match sqlx::query("SELECT data, timestamp FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row?,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let raw: String = row.get("data");
        let timestamp: i64 = row.get("timestamp");

        // A row we can't parse is as good as no row at all.
        let data: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "malformed cache entry, treating as miss");
                return None;
            }
        };

        let entry = CacheEntry::new(data, timestamp);
        if entry.is_fresh(now_ms(), self.ttl_ms) {
            debug!(key, "cache hit");
            Some(entry.data)
        } else {
            debug!(key, "cache entry expired");
            None
        }
    }

    async fn set(&self, key: &str, data: Value) {
        let raw = match serde_json::to_string(&data) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "cache write skipped: unserializable data");
                return;
            }
        };

        let result = sqlx::query(
            "INSERT OR REPLACE INTO cache_entries (key, data, timestamp) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(raw)
        .bind(now_ms())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(key, error = %e, "cache write failed");
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Err(e) = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
        {
            warn!(key, error = %e, "cache invalidate failed");
        }
    }
}
