use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{apply_increment, apply_put, apply_put_if_version, Entry, KvStore, StoreError};

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_entry(&self, key: &str) -> Result<Option<Entry>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        apply_put(&mut *self.entries.write().await, key, value);
        Ok(())
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: String,
        expected: Option<u64>,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        Ok(apply_put_if_version(&mut entries, key, value, expected))
    }

    async fn increment(&self, key: &str) -> Result<Option<u64>, StoreError> {
        apply_increment(&mut *self.entries.write().await, key).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        store.put("greeting", "hello".to_string()).await.unwrap();
        store.put("greeting", "hi".to_string()).await.unwrap();

        let entry = store.get_entry("greeting").await.unwrap().unwrap();
        assert_eq!(entry.value, "hi");
        assert_eq!(entry.version, 2);
    }

    #[tokio::test]
    async fn test_conditional_put() {
        let store = MemoryStore::new();
        assert!(store.put_if_version("seq", "1".to_string(), None).await.unwrap());
        assert!(!store.put_if_version("seq", "1".to_string(), None).await.unwrap());
        assert!(store.put_if_version("seq", "2".to_string(), Some(1)).await.unwrap());
        assert_eq!(store.get("seq").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_increment_hands_out_each_value_once() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let tasks: Vec<_> = (0..400)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move { store.increment("seq").await.unwrap().unwrap() })
            })
            .collect();

        let mut values = Vec::new();
        for task in tasks {
            values.push(task.await.unwrap());
        }
        values.sort_unstable();
        assert_eq!(values, (1..=400).collect::<Vec<u64>>());
    }
}
