//! Durable profile storage
//!
//! The durable store is the source of truth: exactly one record per owner key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::profile::ProfileDocument;

type Result<T> = std::result::Result<T, StoreError>;

/// Authoritative storage for profile documents
pub trait DurableStore: Send + Sync {
    /// Insert a new record. Fails with `AlreadyExists` if one is present.
    fn insert(&self, doc: &ProfileDocument) -> Result<()>;

    /// Load the record for `owner_key`
    fn load(&self, owner_key: &str) -> Result<Option<ProfileDocument>>;

    /// Insert or overwrite the record for `doc.owner_key`
    fn save(&self, doc: &ProfileDocument) -> Result<()>;

    /// Remove the record. Returns whether one existed.
    fn remove(&self, owner_key: &str) -> Result<bool>;
}

fn encode(doc: &ProfileDocument) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode(owner_key: &str, data: &[u8]) -> Result<ProfileDocument> {
    serde_json::from_slice(data)
        .map_err(|e| StoreError::Decode(format!("{}: {}", owner_key, e)))
}

/// One JSON file per profile in a data directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a file store rooted at `dir`
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create data dir: {}", e)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// File name is a SHA-256 of the owner key so any key is a safe path
    fn path_for(&self, owner_key: &str) -> PathBuf {
        let digest = Sha256::digest(owner_key.as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }

    /// Scratch file next to `path`, private to this process
    fn scratch_for(path: &Path) -> PathBuf {
        path.with_extension(format!("json.{}.tmp", std::process::id()))
    }

    /// Write `data` to a scratch file, removing it again on failure
    fn write_scratch(path: &Path, data: &[u8]) -> Result<PathBuf> {
        let tmp = Self::scratch_for(path);
        if let Err(e) = std::fs::write(&tmp, data) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StoreError::Io(format!("Failed to write profile: {}", e)));
        }
        Ok(tmp)
    }
}

impl DurableStore for FileStore {
    fn insert(&self, doc: &ProfileDocument) -> Result<()> {
        let data = encode(doc)?;
        let path = self.path_for(&doc.owner_key);

        // The record only appears once complete; linking fails if it already exists
        let tmp = Self::write_scratch(&path, &data)?;
        let linked = std::fs::hard_link(&tmp, &path);
        let _ = std::fs::remove_file(&tmp);

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(doc.owner_key.clone()))
            }
            Err(e) => Err(StoreError::Io(format!("Failed to create profile: {}", e))),
        }
    }

    fn load(&self, owner_key: &str) -> Result<Option<ProfileDocument>> {
        match std::fs::read(self.path_for(owner_key)) {
            Ok(data) => decode(owner_key, &data).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(format!("Failed to read profile: {}", e))),
        }
    }

    fn save(&self, doc: &ProfileDocument) -> Result<()> {
        let data = encode(doc)?;
        let path = self.path_for(&doc.owner_key);

        // Replaced atomically via rename
        let tmp = Self::write_scratch(&path, &data)?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StoreError::Io(format!("Failed to replace profile: {}", e))
        })
    }

    fn remove(&self, owner_key: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_for(owner_key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(format!("Failed to delete profile: {}", e))),
        }
    }
}

/// SQLite-backed durable store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) `profiles.db` under `dir`
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create data dir: {}", e)))?;

        let conn = Connection::open(dir.join("profiles.db"))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                owner_key TEXT PRIMARY KEY NOT NULL,
                document BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for SqliteStore {
    fn insert(&self, doc: &ProfileDocument) -> Result<()> {
        let data = encode(doc)?;
        let now = Utc::now().timestamp();

        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO profiles (owner_key, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![doc.owner_key, data, now],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists(doc.owner_key.clone()));
        }
        Ok(())
    }

    fn load(&self, owner_key: &str) -> Result<Option<ProfileDocument>> {
        let data: Option<Vec<u8>> = self
            .conn()
            .query_row(
                "SELECT document FROM profiles WHERE owner_key = ?1",
                [owner_key],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|d| decode(owner_key, &d)).transpose()
    }

    fn save(&self, doc: &ProfileDocument) -> Result<()> {
        let data = encode(doc)?;
        let now = Utc::now().timestamp();

        self.conn().execute(
            "INSERT INTO profiles (owner_key, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(owner_key) DO UPDATE SET
                document = excluded.document,
                updated_at = excluded.updated_at",
            params![doc.owner_key, data, now],
        )?;
        Ok(())
    }

    fn remove(&self, owner_key: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM profiles WHERE owner_key = ?1", [owner_key])?;
        Ok(deleted > 0)
    }
}
