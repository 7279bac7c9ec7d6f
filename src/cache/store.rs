//! SQLite-backed response cache.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use rusqlite::{params, Connection, OptionalExtension};

use crate::cache::{CacheError, Clock, SystemClock};
use crate::observability::metrics;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(240);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS Cache (
        CacheKey TEXT PRIMARY KEY,
        Content TEXT NOT NULL,
        Timestamp INTEGER NOT NULL
    )";

/// Durable key → response-body cache with TTL expiry.
///
/// An entry is valid while `now - timestamp < ttl`. The connection mutex is
/// held for one statement at a time; it does not order operations across
/// keys, so concurrent writers to one key are last-writer-wins.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    conn: Arc<Mutex<Connection>>,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self, CacheError> {
        let conn = Connection::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), ttl_secs = ttl.as_secs(), "Response cache opened");
        Self::with_connection(conn, ttl, Arc::new(SystemClock))
    }

    /// In-memory cache driven by `clock`.
    pub fn in_memory(ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?, ttl, clock)
    }

    fn with_connection(conn: Connection, ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            ttl_secs: ttl.as_secs() as i64,
            clock,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs as u64)
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> Result<T, CacheError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| CacheError::Poisoned)?;
            f(&*conn)
        })
        .await
        .map_err(|e| CacheError::Task(e.to_string()))?
    }

    /// Look up `key`, sweeping expired entries first.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.cleanup_expired().await?;

        let key = key.to_string();
        let now = self.clock.now_secs();
        let ttl = self.ttl_secs;
        let hit = self
            .with_conn(move |conn| {
                let row: Option<(String, i64)> = conn
                    .query_row(
                        "SELECT Content, Timestamp FROM Cache WHERE CacheKey = ?1",
                        params![key],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                Ok(row.and_then(|(content, ts)| (now - ts < ttl).then_some(content)))
            })
            .await?;

        metrics::record_cache_lookup(hit.is_some());
        Ok(hit)
    }

    /// Insert or overwrite `key`, stamped with the current time.
    pub async fn set(&self, key: &str, content: &str) -> Result<(), CacheError> {
        let key = key.to_string();
        let content = content.to_string();
        let now = self.clock.now_secs();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO Cache (CacheKey, Content, Timestamp) VALUES (?1, ?2, ?3)",
                params![key, content, now],
            )?;
            Ok(())
        })
        .await
    }

    /// Drop `key`. Absent keys are fine.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM Cache WHERE CacheKey = ?1", params![key])?;
            Ok(())
        })
        .await
    }

    /// Delete every entry aged `ttl` or more. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now_secs();
        let ttl = self.ttl_secs;
        let deleted = self
            .with_conn(move |conn| {
                Ok(conn.execute("DELETE FROM Cache WHERE ?1 - Timestamp >= ?2", params![now, ttl])?)
            })
            .await?;

        if deleted > 0 {
            tracing::debug!(deleted, "Expired cache entries removed");
            metrics::record_cache_evictions(deleted);
        }
        Ok(deleted)
    }

    /// Entries physically stored, expired or not.
    pub async fn len(&self) -> Result<usize, CacheError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM Cache", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }

    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }
}
