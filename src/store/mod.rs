//! Key-value store module
//!
//! The store is the only durable state of the service. Values are opaque text
//! blobs keyed by string; handlers layer JSON on top of them.
//!
//! Backends:
//! - `memory` - process-local map, lost on exit
//! - `file` - JSON snapshot on disk, rewritten on every write

pub mod collection;
mod error;
mod file;
mod memory;

pub use collection::Collection;
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};

/// A stored value together with its write version
///
/// Versions start at 1 and grow by one on every write of the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value: String,
    pub version: u64,
}

/// Minimal key-value contract consumed by the handlers
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name for startup logs
    fn name(&self) -> &'static str;

    /// Read a key with its version
    async fn get_entry(&self, key: &str) -> Result<Option<Entry>, StoreError>;

    /// Unconditionally overwrite a key
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Write only if the key is still at `expected` version
    ///
    /// `expected == None` means the key must not exist yet.
    /// Returns `false` when another writer got there first.
    async fn put_if_version(
        &self,
        key: &str,
        value: String,
        expected: Option<u64>,
    ) -> Result<bool, StoreError>;

    /// Advance the integer counter under `key` by one and return the new value
    ///
    /// A missing key counts as 0. Backends that cannot do this in one step
    /// return `Ok(None)` and callers fall back to [`KvStore::put_if_version`].
    async fn increment(&self, _key: &str) -> Result<Option<u64>, StoreError> {
        Ok(None)
    }

    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_entry(key).await?.map(|entry| entry.value))
    }
}

/// Read a key and decode it as JSON
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::corrupt(key, &source)),
        None => Ok(None),
    }
}

/// Encode a value as JSON and write it
pub async fn put_json<T: Serialize + Sync>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.put(key, raw).await
}

/// Open the backend selected by configuration
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::open(&config.path).await?)),
    }
}

/// Shared write rules for map-backed stores
fn apply_put(entries: &mut HashMap<String, Entry>, key: &str, value: String) {
    let version = entries.get(key).map_or(1, |entry| entry.version + 1);
    entries.insert(key.to_string(), Entry { value, version });
}

/// Conditional variant of [`apply_put`]
fn apply_put_if_version(
    entries: &mut HashMap<String, Entry>,
    key: &str,
    value: String,
    expected: Option<u64>,
) -> bool {
    let current = entries.get(key).map(|entry| entry.version);
    if current != expected {
        return false;
    }
    apply_put(entries, key, value);
    true
}

/// Counter step shared by map-backed stores
fn apply_increment(entries: &mut HashMap<String, Entry>, key: &str) -> Result<u64, StoreError> {
    let current = match entries.get(key) {
        Some(entry) => parse_counter(key, &entry.value)?,
        None => 0,
    };
    let next = current + 1;
    apply_put(entries, key, next.to_string());
    Ok(next)
}

/// Decode a counter value written by [`apply_increment`] or a conditional put
pub(crate) fn parse_counter(key: &str, raw: &str) -> Result<u64, StoreError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| StoreError::corrupt(key, &e))
}
