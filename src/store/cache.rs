//! Time-bounded profile cache
//!
//! Entries carry an absolute expiry and are live while `expires_at > now`.
//! The SQLite backend keeps entries across runs; the memory backend is
//! process-local.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, CacheError>;

/// Cache key for a profile snapshot
pub fn profile_cache_key(owner_key: &str) -> String {
    format!("profile:{}", owner_key)
}

/// Source of the current time, injectable for expiry tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A key/value cache with per-entry expiry
pub trait ProfileCache: Send + Sync {
    /// Live entry for `key`, if any
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>>;

    /// Store `data`, replacing any entry, expiring `ttl` after `now`
    fn put(&self, key: &str, data: &[u8], now: DateTime<Utc>, ttl: Duration) -> Result<()>;

    /// Remove `key`. Returns whether an entry existed.
    fn evict(&self, key: &str) -> Result<bool>;
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> i64 {
    now.timestamp().saturating_add(ttl.as_secs() as i64)
}

/// SQLite-backed cache storage
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open or create cache storage at the default XDG cache location
    pub fn open() -> Result<Self> {
        let cache_dir = Self::cache_dir()?;
        Self::open_at(&cache_dir)
    }

    /// Get the cache directory path (~/.cache/folio on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("folio"))
    }

    /// Open cache storage at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("cache.db");
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY NOT NULL,
                data BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expires_at ON cache_entries(expires_at);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear all cache entries
    pub fn clear_all(&self) -> Result<ClearStats> {
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM cache_entries", [])?;
        Ok(ClearStats {
            entries_removed: removed,
        })
    }

    /// Get cache statistics
    pub fn stats(&self, now: DateTime<Utc>) -> Result<CacheStats> {
        let conn = self.conn();
        let now = now.timestamp();

        let total_entries: i64 =
            conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;

        let valid_entries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE expires_at > ?1",
            [now],
            |r| r.get(0),
        )?;

        let total_size: i64 = conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM cache_entries",
            [],
            |r| r.get(0),
        )?;

        let newest: Option<i64> = conn
            .query_row(
                "SELECT MAX(created_at) FROM cache_entries WHERE expires_at > ?1",
                [now],
                |r| r.get(0),
            )
            .optional()?
            .flatten();

        Ok(CacheStats {
            total_entries: total_entries as usize,
            valid_entries: valid_entries as usize,
            expired_entries: (total_entries - valid_entries) as usize,
            total_size_bytes: total_size as usize,
            newest_entry: newest,
        })
    }
}

impl ProfileCache for SqliteCache {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>> {
        let data = self
            .conn()
            .query_row(
                "SELECT data FROM cache_entries
                 WHERE cache_key = ?1 AND expires_at > ?2",
                params![key, now.timestamp()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    fn put(&self, key: &str, data: &[u8], now: DateTime<Utc>, ttl: Duration) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO cache_entries
             (cache_key, data, created_at, expires_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, data, now.timestamp(), expiry(now, ttl), data.len()],
        )?;
        Ok(())
    }

    fn evict(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
        Ok(deleted > 0)
    }
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, i64)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (Vec<u8>, i64)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProfileCache for MemoryCache {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries();
        let expired = match entries.get(key) {
            Some((data, expires_at)) if *expires_at > now.timestamp() => {
                return Ok(Some(data.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    fn put(&self, key: &str, data: &[u8], now: DateTime<Utc>, ttl: Duration) -> Result<()> {
        self.entries()
            .insert(key.to_string(), (data.to_vec(), expiry(now, ttl)));
        Ok(())
    }

    fn evict(&self, key: &str) -> Result<bool> {
        Ok(self.entries().remove(key).is_some())
    }
}

/// Statistics about cache clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// Statistics about cache state
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: usize,
    pub newest_entry: Option<i64>,
}
