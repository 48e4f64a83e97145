//! In-memory shared store
//!
//! Used by tests and by the simulated worker; supports injecting write and
//! read failures.

use bytes::Bytes;
use contracts::{SharedStore, StoreError, StoreKey};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Failure injection for [`MemoryStore`]
#[derive(Debug, Default, Clone)]
pub struct MemoryStoreConfig {
    /// The first N puts fail with an error
    pub failing_puts: u32,
    /// The next N puts report success but store an empty value
    pub truncating_puts: u32,
    /// Keys whose reads fail
    pub failing_gets: HashSet<StoreKey>,
}

struct Inner {
    config: MemoryStoreConfig,
    entries: Mutex<BTreeMap<StoreKey, Bytes>>,
    put_count: AtomicU32,
    probe_count: AtomicU64,
}

/// Shared in-process store; clones share the same entries
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(BTreeMap::new()),
                put_count: AtomicU32::new(0),
                probe_count: AtomicU64::new(0),
            }),
        }
    }

    /// Insert a value directly, bypassing failure injection
    pub fn insert(&self, key: &StoreKey, data: impl Into<Bytes>) {
        self.entries().insert(key.clone(), data.into());
    }

    /// Remove a value
    pub fn remove(&self, key: &StoreKey) -> Option<Bytes> {
        self.entries().remove(key)
    }

    /// Read a value directly, bypassing failure injection
    pub fn peek(&self, key: &StoreKey) -> Option<Bytes> {
        self.entries().get(key).cloned()
    }

    /// All keys currently stored
    pub fn keys(&self) -> Vec<StoreKey> {
        self.entries().keys().cloned().collect()
    }

    /// Number of `put` calls so far
    pub fn put_count(&self) -> u32 {
        self.inner.put_count.load(Ordering::SeqCst)
    }

    /// Number of `exists` calls so far
    pub fn probe_count(&self) -> u64 {
        self.inner.probe_count.load(Ordering::SeqCst)
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<StoreKey, Bytes>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &StoreKey, data: Bytes) -> Result<(), StoreError> {
        let attempt = self.inner.put_count.fetch_add(1, Ordering::SeqCst);
        let config = &self.inner.config;

        if attempt < config.failing_puts {
            return Err(StoreError::write_rejected(key.as_str(), "injected failure"));
        }

        let value = if attempt < config.failing_puts + config.truncating_puts {
            debug!(key = %key, "Truncating injected write");
            Bytes::new()
        } else {
            data
        };

        self.entries().insert(key.clone(), value);
        Ok(())
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError> {
        if self.inner.config.failing_gets.contains(key) {
            return Err(StoreError::Unavailable {
                message: format!("injected read failure for '{key}'"),
            });
        }
        Ok(self.entries().get(key).cloned())
    }

    async fn exists(&self, key: &StoreKey) -> bool {
        self.inner.probe_count.fetch_add(1, Ordering::SeqCst);
        self.entries().contains_key(key)
    }
}
