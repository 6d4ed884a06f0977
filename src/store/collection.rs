//! Append-only record collections
//!
//! A collection keeps one record per key instead of one list under a single key:
//!
//! ```text
//! <namespace>:seq              -> last reserved sequence number
//! <namespace>:item:<seq>       -> record JSON
//! ```
//!
//! `append` reserves a sequence number through the store's atomic
//! [`KvStore::increment`], so two concurrent appends can never claim the same
//! slot, and then writes the record under its own key. Stores without an atomic
//! increment get a conditional-put loop with jittered backoff instead. `list`
//! walks the sequence in order.

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;

use super::{get_json, parse_counter, put_json, KvStore, StoreError};

/// Backoff ceiling for the conditional-put fallback
const MAX_BACKOFF: Duration = Duration::from_millis(50);

pub struct Collection<'a, T> {
    store: &'a dyn KvStore,
    namespace: &'static str,
    max_retries: u32,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T> Collection<'a, T>
where
    T: Serialize + DeserializeOwned + Sync,
{
    pub fn new(store: &'a dyn KvStore, namespace: &'static str, max_retries: u32) -> Self {
        Self {
            store,
            namespace,
            max_retries,
            _record: PhantomData,
        }
    }

    fn counter_key(&self) -> String {
        format!("{}:seq", self.namespace)
    }

    fn item_key(&self, seq: u64) -> String {
        // Zero padding keeps keys lexically ordered for stores that list by prefix
        format!("{}:item:{seq:012}", self.namespace)
    }

    /// Number of sequence slots handed out so far
    pub async fn last_seq(&self) -> Result<u64, StoreError> {
        let key = self.counter_key();
        match self.store.get(&key).await? {
            Some(raw) => parse_counter(&key, &raw),
            None => Ok(0),
        }
    }

    /// Reserve the next sequence number
    async fn reserve(&self) -> Result<u64, StoreError> {
        let key = self.counter_key();
        if let Some(seq) = self.store.increment(&key).await? {
            return Ok(seq);
        }

        let attempts = self.max_retries.max(1);
        for attempt in 0..attempts {
            let (next, expected) = match self.store.get_entry(&key).await? {
                Some(entry) => (parse_counter(&key, &entry.value)? + 1, Some(entry.version)),
                None => (1, None),
            };

            if self
                .store
                .put_if_version(&key, next.to_string(), expected)
                .await?
            {
                return Ok(next);
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        Err(StoreError::Contention { key, attempts })
    }

    /// Append a record, returning its sequence number
    pub async fn append(&self, record: &T) -> Result<u64, StoreError> {
        let seq = self.reserve().await?;
        put_json(self.store, &self.item_key(seq), record).await?;
        Ok(seq)
    }

    /// All records in insertion order
    ///
    /// Slots whose record was never written (an append still in flight, or one
    /// whose record write failed) are skipped.
    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        let last = self.last_seq().await?;
        let mut records = Vec::new();
        for seq in 1..=last {
            if let Some(record) = get_json(self.store, &self.item_key(seq)).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Full-jitter exponential backoff: random delay up to `1ms * 2^attempt`, capped
fn backoff(attempt: u32) -> Duration {
    let ceiling = Duration::from_millis(1_u64 << attempt.min(16)).min(MAX_BACKOFF);
    let micros = u64::try_from(ceiling.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(rand::rng().random_range(0..=micros))
}
