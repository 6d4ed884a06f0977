// File-backed store
// Keeps every entry in memory and rewrites a JSON snapshot after each write

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

use super::{apply_increment, apply_put, apply_put_if_version, Entry, KvStore, StoreError};
use crate::logger;

pub struct FileStore {
    /// Path to the snapshot file
    path: PathBuf,
    /// Current entries, only replaced once the snapshot holding them is on disk
    entries: RwLock<HashMap<String, Entry>>,
}

impl FileStore {
    /// Open a snapshot, starting empty when the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load_snapshot(&path).await?;

        logger::write_info(&format!(
            "Loaded {} store entries from {}",
            entries.len(),
            path.display()
        ));

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn load_snapshot(path: &Path) -> Result<HashMap<String, Entry>, StoreError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| StoreError::corrupt(&path.display().to_string(), &e))
    }

    /// Write the snapshot next to the target, then rename over it
    async fn save_snapshot(&self, entries: &HashMap<String, Entry>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let content = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("tmp");

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KvStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get_entry(&self, key: &str) -> Result<Option<Entry>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        // Write lock is held across the save so snapshots land in write order
        let mut entries = self.entries.write().await;
        let mut staged = entries.clone();
        apply_put(&mut staged, key, value);
        self.save_snapshot(&staged).await?;
        *entries = staged;
        Ok(())
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: String,
        expected: Option<u64>,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let mut staged = entries.clone();
        if !apply_put_if_version(&mut staged, key, value, expected) {
            return Ok(false);
        }
        self.save_snapshot(&staged).await?;
        *entries = staged;
        Ok(true)
    }

    async fn increment(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let mut entries = self.entries.write().await;
        let mut staged = entries.clone();
        let next = apply_increment(&mut staged, key)?;
        self.save_snapshot(&staged).await?;
        *entries = staged;
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("community-api-{}", uuid::Uuid::now_v7()))
            .join("store.json")
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let path = temp_store_path();
        let store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let path = temp_store_path();
        {
            let store = FileStore::open(&path).await.unwrap();
            store.put("latest", "hello".to_string()).await.unwrap();
            assert!(store.put_if_version("seq", "1".to_string(), None).await.unwrap());
        }

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("latest").await.unwrap().as_deref(), Some("hello"));
        let seq = reopened.get_entry("seq").await.unwrap().unwrap();
        assert_eq!(seq.version, 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_rejected_conditional_put_leaves_file_untouched() {
        let path = temp_store_path();
        let store = FileStore::open(&path).await.unwrap();
        assert!(!store.put_if_version("seq", "5".to_string(), Some(3)).await.unwrap());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_entries_unchanged() {
        let root = std::env::temp_dir().join(format!("community-api-{}", uuid::Uuid::now_v7()));
        let path = root.join("data").join("store.json");
        let store = FileStore::open(&path).await.unwrap();
        store.put("kept", "before".to_string()).await.unwrap();

        // A plain file where the data directory should be makes every save fail
        std::fs::remove_dir_all(root.join("data")).unwrap();
        std::fs::write(root.join("data"), "blocker").unwrap();

        assert!(matches!(
            store.put("latest", "hello".to_string()).await,
            Err(StoreError::Io { .. })
        ));
        assert!(store.put_if_version("seq", "1".to_string(), None).await.is_err());
        assert!(store.put("kept", "after".to_string()).await.is_err());
        assert!(store.increment("posts:seq").await.is_err());

        assert_eq!(store.get("latest").await.unwrap(), None);
        assert_eq!(store.get_entry("seq").await.unwrap(), None);
        assert_eq!(store.get("posts:seq").await.unwrap(), None);
        let kept = store.get_entry("kept").await.unwrap().unwrap();
        assert_eq!((kept.value.as_str(), kept.version), ("before", 1));

        // Once saving works again nothing from the failed writes resurfaces
        std::fs::remove_file(root.join("data")).unwrap();
        assert_eq!(store.increment("posts:seq").await.unwrap(), Some(1));
        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("latest").await.unwrap(), None);
        assert_eq!(reopened.get("kept").await.unwrap().as_deref(), Some("before"));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_increments_are_persisted() {
        let path = temp_store_path();
        let store = std::sync::Arc::new(FileStore::open(&path).await.unwrap());
        let tasks: Vec<_> = (0..50)
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
        assert_eq!(values, (1..=50).collect::<Vec<u64>>());

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("seq").await.unwrap().as_deref(), Some("50"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let path = temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let result = FileStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
