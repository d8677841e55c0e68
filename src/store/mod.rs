//! Cache-aside profile persistence
//!
//! The durable store is authoritative. A TTL cache sits in front of it:
//! reads try the cache first and repopulate it from the durable store on a
//! miss, writes go to the durable store and then overwrite the cache entry.
//! The two writes are not atomic; a stale or missing cache entry heals on the
//! next read-repair or after one TTL.
//!
//! Cache failures never fail an operation. They are logged, and on reads they
//! force a fallback to the durable store.

pub mod cache;
pub mod durable;
pub mod locks;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::error::StoreError;
use crate::profile::ProfileDocument;

pub use cache::{
    Clock, ManualClock, MemoryCache, ProfileCache, SqliteCache, SystemClock, profile_cache_key,
};
pub use durable::{DurableStore, FileStore, SqliteStore};
pub use locks::KeyLocks;

/// Cache entry lifetime, reset on every write
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

type Result<T> = std::result::Result<T, StoreError>;

/// Profile store with read-through and write-through caching.
///
/// Mutations of one owner key are serialized; different keys never wait on
/// each other. Cache hits take no lock at all.
pub struct CacheAsideStore {
    durable: Arc<dyn DurableStore>,
    cache: Option<Arc<dyn ProfileCache>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    locks: KeyLocks,
}

impl CacheAsideStore {
    /// Store over `durable` with `cache` in front of it
    pub fn new(durable: Arc<dyn DurableStore>, cache: Arc<dyn ProfileCache>) -> Self {
        Self {
            durable,
            cache: Some(cache),
            clock: Arc::new(SystemClock),
            ttl: CACHE_TTL,
            locks: KeyLocks::new(),
        }
    }

    /// Store with caching disabled: every read goes to the durable store
    pub fn uncached(durable: Arc<dyn DurableStore>) -> Self {
        Self {
            durable,
            cache: None,
            clock: Arc::new(SystemClock),
            ttl: CACHE_TTL,
            locks: KeyLocks::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Create a profile. Fails with `AlreadyExists` if one is stored for the key.
    pub fn create(&self, doc: &ProfileDocument) -> Result<()> {
        validate_key(&doc.owner_key)?;
        self.locks.with_key(&doc.owner_key, || {
            self.durable.insert(doc)?;
            self.write_cache(doc);
            Ok(())
        })
    }

    /// Fetch a profile, from cache when a live entry exists.
    pub fn get(&self, owner_key: &str) -> Result<ProfileDocument> {
        validate_key(owner_key)?;
        if let Some(doc) = self.read_cache(owner_key) {
            debug!("Cache hit for {}", owner_key);
            return Ok(doc);
        }

        // Locked so read-repair cannot overwrite a newer write with an older snapshot
        self.locks.with_key(owner_key, || {
            let doc = self
                .durable
                .load(owner_key)?
                .ok_or_else(|| StoreError::NotFound(owner_key.to_string()))?;
            self.write_cache(&doc);
            Ok(doc)
        })
    }

    /// Overwrite (or create) a profile and refresh its cache entry.
    pub fn update(&self, doc: &ProfileDocument) -> Result<()> {
        validate_key(&doc.owner_key)?;
        self.locks.with_key(&doc.owner_key, || {
            self.durable.save(doc)?;
            self.write_cache(doc);
            Ok(())
        })
    }

    /// Delete a profile and evict its cache entry.
    pub fn delete(&self, owner_key: &str) -> Result<()> {
        validate_key(owner_key)?;
        self.locks.with_key(owner_key, || {
            let removed = self.durable.remove(owner_key)?;
            self.evict_cache(owner_key);
            if removed {
                Ok(())
            } else {
                Err(StoreError::NotFound(owner_key.to_string()))
            }
        })
    }

    /// Read-modify-write under the key lock. A missing profile starts from `ProfileDocument::new`.
    pub fn modify<T>(
        &self,
        owner_key: &str,
        f: impl FnOnce(&mut ProfileDocument) -> T,
    ) -> Result<(ProfileDocument, T)> {
        validate_key(owner_key)?;
        self.locks.with_key(owner_key, || {
            let mut doc = self
                .durable
                .load(owner_key)?
                .unwrap_or_else(|| ProfileDocument::new(owner_key));
            let output = f(&mut doc);
            // The closure may not re-key the document
            doc.owner_key = owner_key.to_string();
            self.durable.save(&doc)?;
            self.write_cache(&doc);
            Ok((doc, output))
        })
    }

    fn read_cache(&self, owner_key: &str) -> Option<ProfileDocument> {
        let cache = self.cache.as_ref()?;
        let key = profile_cache_key(owner_key);

        let data = match cache.get(&key, self.clock.now()) {
            Ok(data) => data?,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_slice::<ProfileDocument>(&data) {
            Ok(doc) if doc.owner_key == owner_key => Some(doc),
            Ok(doc) => {
                warn!(
                    "Cache entry {} holds profile {:?}, ignoring",
                    key, doc.owner_key
                );
                None
            }
            Err(e) => {
                warn!("Corrupt cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn write_cache(&self, doc: &ProfileDocument) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let key = profile_cache_key(&doc.owner_key);

        let data = match serde_json::to_vec(doc) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize {} for cache: {}", key, e);
                self.evict_cache(&doc.owner_key);
                return;
            }
        };
        if let Err(e) = cache.put(&key, &data, self.clock.now(), self.ttl) {
            warn!("Cache write failed for {}: {}", key, e);
            // A stale entry must not outlive a failed overwrite
            self.evict_cache(&doc.owner_key);
        }
    }

    fn evict_cache(&self, owner_key: &str) {
        if let Some(cache) = self.cache.as_ref() {
            let key = profile_cache_key(owner_key);
            if let Err(e) = cache.evict(&key) {
                warn!("Cache eviction failed for {}: {}", key, e);
            }
        }
    }
}

fn validate_key(owner_key: &str) -> Result<()> {
    if owner_key.is_empty() {
        return Err(StoreError::InvalidKey(owner_key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::profile::{BasicInfo, Experience};
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory durable store counting every load
    #[derive(Default)]
    struct CountingStore {
        records: Mutex<std::collections::HashMap<String, ProfileDocument>>,
        loads: AtomicUsize,
    }

    impl CountingStore {
        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl DurableStore for CountingStore {
        fn insert(&self, doc: &ProfileDocument) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&doc.owner_key) {
                return Err(StoreError::AlreadyExists(doc.owner_key.clone()));
            }
            records.insert(doc.owner_key.clone(), doc.clone());
            Ok(())
        }

        fn load(&self, owner_key: &str) -> Result<Option<ProfileDocument>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.lock().unwrap().get(owner_key).cloned())
        }

        fn save(&self, doc: &ProfileDocument) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(doc.owner_key.clone(), doc.clone());
            Ok(())
        }

        fn remove(&self, owner_key: &str) -> Result<bool> {
            Ok(self.records.lock().unwrap().remove(owner_key).is_some())
        }
    }

    /// Cache whose writes can be made to fail
    #[derive(Default)]
    struct FlakyCache {
        inner: MemoryCache,
        fail_writes: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl ProfileCache for FlakyCache {
        fn get(
            &self,
            key: &str,
            now: DateTime<Utc>,
        ) -> std::result::Result<Option<Vec<u8>>, CacheError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(CacheError::Io("read failed".to_string()));
            }
            self.inner.get(key, now)
        }

        fn put(
            &self,
            key: &str,
            data: &[u8],
            now: DateTime<Utc>,
            ttl: Duration,
        ) -> std::result::Result<(), CacheError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CacheError::Io("write failed".to_string()));
            }
            self.inner.put(key, data, now, ttl)
        }

        fn evict(&self, key: &str) -> std::result::Result<bool, CacheError> {
            self.inner.evict(key)
        }
    }

    struct Fixture {
        store: CacheAsideStore,
        durable: Arc<CountingStore>,
        cache: Arc<FlakyCache>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let durable = Arc::new(CountingStore::default());
        let cache = Arc::new(FlakyCache::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = CacheAsideStore::new(durable.clone(), cache.clone()).with_clock(clock.clone());
        Fixture {
            store,
            durable,
            cache,
            clock,
        }
    }

    fn sample(owner_key: &str) -> ProfileDocument {
        let mut doc = ProfileDocument::new(owner_key);
        doc.basic_info.push(BasicInfo {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            ..BasicInfo::default()
        });
        doc.experience.push(Experience {
            company: "Acme".to_string(),
            achievements: vec!["Shipped widgets".to_string()],
            ..Experience::default()
        });
        doc.skills.insert("Rust".to_string());
        doc
    }

    fn cached(f: &Fixture, owner_key: &str) -> bool {
        f.cache
            .inner
            .get(&profile_cache_key(owner_key), f.clock.now())
            .unwrap()
            .is_some()
    }

    #[test]
    fn test_create_then_get_served_from_cache() {
        let f = fixture();
        let doc = sample("alice");

        f.store.create(&doc).unwrap();
        assert_eq!(f.store.get("alice").unwrap(), doc);
        assert_eq!(f.durable.loads(), 0);
    }

    #[test]
    fn test_create_duplicate_fails() {
        let f = fixture();
        f.store.create(&sample("alice")).unwrap();

        match f.store.create(&sample("alice")) {
            Err(StoreError::AlreadyExists(key)) => assert_eq!(key, "alice"),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn test_create_succeeds_when_cache_write_fails() {
        let f = fixture();
        f.cache.fail_writes.store(true, Ordering::SeqCst);

        f.store.create(&sample("alice")).unwrap();
        assert!(!cached(&f, "alice"));

        f.cache.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(f.store.get("alice").unwrap(), sample("alice"));
        assert_eq!(f.durable.loads(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let f = fixture();
        assert!(matches!(f.store.get("nobody"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_get_read_repairs_cache() {
        let f = fixture();
        f.durable.save(&sample("bob")).unwrap();

        assert_eq!(f.store.get("bob").unwrap(), sample("bob"));
        assert_eq!(f.durable.loads(), 1);
        assert!(cached(&f, "bob"));

        f.store.get("bob").unwrap();
        assert_eq!(f.durable.loads(), 1);
    }

    #[test]
    fn test_ttl_expiry_falls_back_and_rewrites() {
        let f = fixture();
        f.store.create(&sample("carol")).unwrap();

        f.clock.advance(Duration::from_secs(9 * 60));
        f.store.get("carol").unwrap();
        assert_eq!(f.durable.loads(), 0);

        f.clock.advance(Duration::from_secs(2 * 60));
        f.store.get("carol").unwrap();
        assert_eq!(f.durable.loads(), 1);

        // Rewritten with a fresh TTL
        f.clock.advance(Duration::from_secs(9 * 60));
        f.store.get("carol").unwrap();
        assert_eq!(f.durable.loads(), 1);
    }

    #[test]
    fn test_corrupt_cache_entry_falls_back() {
        let f = fixture();
        f.durable.save(&sample("dave")).unwrap();
        f.cache
            .inner
            .put(
                &profile_cache_key("dave"),
                b"{garbage",
                f.clock.now(),
                CACHE_TTL,
            )
            .unwrap();

        assert_eq!(f.store.get("dave").unwrap(), sample("dave"));
        assert_eq!(f.durable.loads(), 1);
    }

    #[test]
    fn test_mismatched_cache_entry_falls_back() {
        let f = fixture();
        f.durable.save(&sample("erin")).unwrap();
        let other = serde_json::to_vec(&sample("mallory")).unwrap();
        f.cache
            .inner
            .put(&profile_cache_key("erin"), &other, f.clock.now(), CACHE_TTL)
            .unwrap();

        assert_eq!(f.store.get("erin").unwrap().owner_key, "erin");
    }

    #[test]
    fn test_cache_read_failure_falls_back() {
        let f = fixture();
        f.store.create(&sample("frank")).unwrap();
        f.cache.fail_reads.store(true, Ordering::SeqCst);

        assert_eq!(f.store.get("frank").unwrap(), sample("frank"));
        assert_eq!(f.durable.loads(), 1);
    }

    #[test]
    fn test_update_refreshes_cache() {
        let f = fixture();
        f.store.create(&sample("gina")).unwrap();

        let mut changed = sample("gina");
        changed.skills.insert("Go".to_string());
        f.store.update(&changed).unwrap();

        assert_eq!(f.store.get("gina").unwrap(), changed);
        assert_eq!(f.durable.loads(), 0);
    }

    #[test]
    fn test_update_is_upsert() {
        let f = fixture();
        f.store.update(&sample("hank")).unwrap();
        assert_eq!(f.store.get("hank").unwrap(), sample("hank"));
    }

    #[test]
    fn test_failed_cache_overwrite_evicts_stale_entry() {
        let f = fixture();
        f.store.create(&sample("ivy")).unwrap();
        f.cache.fail_writes.store(true, Ordering::SeqCst);

        let mut changed = sample("ivy");
        changed.skills.insert("Zig".to_string());
        f.store.update(&changed).unwrap();

        assert_eq!(f.store.get("ivy").unwrap(), changed);
    }

    #[test]
    fn test_delete_then_get_not_found() {
        let f = fixture();
        f.store.create(&sample("jack")).unwrap();

        f.store.delete("jack").unwrap();
        assert!(!cached(&f, "jack"));
        assert!(matches!(f.store.get("jack"), Err(StoreError::NotFound(_))));
        assert!(!cached(&f, "jack"));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let f = fixture();
        assert!(matches!(f.store.delete("kate"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_empty_owner_key_rejected() {
        let f = fixture();
        assert!(matches!(
            f.store.create(&ProfileDocument::new("")),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(f.store.get(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_modify_appends_and_keeps_key() {
        let f = fixture();
        let (doc, len) = f
            .store
            .modify("liam", |doc| {
                doc.skills.insert("SQL".to_string());
                doc.owner_key = "someone-else".to_string();
                doc.skills.len()
            })
            .unwrap();

        assert_eq!(len, 1);
        assert_eq!(doc.owner_key, "liam");
        assert_eq!(f.store.get("liam").unwrap(), doc);
    }

    #[test]
    fn test_uncached_store_always_reads_durable() {
        let durable = Arc::new(CountingStore::default());
        let store = CacheAsideStore::uncached(durable.clone());
        store.create(&sample("mia")).unwrap();

        store.get("mia").unwrap();
        store.get("mia").unwrap();
        assert_eq!(durable.loads(), 2);
    }

    #[test]
    fn test_concurrent_updates_leave_cache_consistent() {
        let f = Arc::new(fixture());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let f = f.clone();
                std::thread::spawn(move || {
                    for j in 0..20 {
                        let mut doc = sample("nora");
                        doc.skills.insert(format!("skill-{}-{}", i, j));
                        f.store.update(&doc).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let from_cache = f.store.get("nora").unwrap();
        let from_durable = f.durable.load("nora").unwrap().unwrap();
        assert_eq!(from_cache, from_durable);
    }
}
