//! SharedStore trait - orchestrator/worker exchange medium
//!
//! The orchestrator only reads and writes through this interface; the
//! lifecycle of the backing medium (volume, container mount...) is owned
//! elsewhere.

use bytes::Bytes;

use crate::{StoreError, StoreKey};

/// Key-addressable external storage shared with a worker.
///
/// Operations are atomic at key granularity: a reader sees either the whole
/// previous value or the whole new one.
#[trait_variant::make(SharedStore: Send)]
pub trait LocalSharedStore {
    /// Backend name (used for logging)
    fn name(&self) -> &str;

    /// Write `data` at `key`, replacing any previous value
    async fn put(&self, key: &StoreKey, data: Bytes) -> Result<(), StoreError>;

    /// Read the value at `key`, `None` when absent
    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError>;

    /// Whether `key` is present. Backend errors read as "absent".
    async fn exists(&self, key: &StoreKey) -> bool;
}
