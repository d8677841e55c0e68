//! Per-key mutual exclusion
//!
//! One mutex per owner key, created on demand and dropped once no caller holds
//! or waits on it. Different keys never contend beyond the brief table lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` while holding the lock for `key`
    pub fn with_key<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let entry = self.table().entry(key.to_string()).or_default().clone();

        let result = {
            let _guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut table = self.table();
        // Only the table and this handle remain: nobody else holds or waits
        if Arc::strong_count(&entry) == 2 {
            table.remove(key);
        }
        result
    }

    /// Number of keys currently locked or awaited
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
