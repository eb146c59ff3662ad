//! Persisting the query cache to key-value storage across restarts.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QueryKey;
use crate::ClientError;

/// Storage key the dehydrated cache is written under.
pub const DEFAULT_STORAGE_KEY: &str = "KUDI_QUERY_CACHE";
/// Snapshots older than this are discarded on restore.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24);

/// Asynchronous string key-value store.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ClientError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError>;
    async fn remove_item(&self, key: &str) -> Result<(), ClientError>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), ClientError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process storage, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), ClientError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Dehydrated cache as written to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedCache {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub buster: String,
    pub queries: Vec<PersistedQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedQuery {
    pub key: QueryKey,
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub invalidated: bool,
}

/// Writes cache snapshots to a [`Storage`] and reads them back.
///
/// `buster` versions the snapshot: a snapshot written with a different
/// buster is discarded on restore.
#[derive(Clone)]
pub struct Persister {
    storage: Arc<dyn Storage>,
    buster: String,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Persister {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            buster: String::new(),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    #[must_use]
    pub fn buster(mut self, buster: impl Into<String>) -> Self {
        self.buster = buster.into();
        self
    }

    /// Serializes the snapshot produced by `snapshot` and stores it.
    ///
    /// The snapshot is taken while holding the write lock, so the last
    /// write always carries the latest state.
    pub(crate) async fn save<F>(&self, snapshot: F) -> Result<(), ClientError>
    where
        F: FnOnce() -> Vec<PersistedQuery>,
    {
        let _guard = self.write_lock.lock().await;
        let cache = PersistedCache {
            timestamp: Utc::now(),
            buster: self.buster.clone(),
            queries: snapshot(),
        };
        let payload = serde_json::to_string(&cache)?;
        self.storage.set_item(DEFAULT_STORAGE_KEY, &payload).await
    }

    /// Loads the stored snapshot, discarding it when expired, busted or
    /// unreadable.
    pub(crate) async fn load(&self) -> Result<Option<PersistedCache>, ClientError> {
        let Some(payload) = self.storage.get_item(DEFAULT_STORAGE_KEY).await? else {
            return Ok(None);
        };

        let cache = match serde_json::from_str::<PersistedCache>(&payload) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!("discarding unreadable query cache: {err}");
                self.storage.remove_item(DEFAULT_STORAGE_KEY).await?;
                return Ok(None);
            }
        };

        let expired = age(cache.timestamp) > DEFAULT_MAX_AGE;
        if expired || cache.buster != self.buster {
            tracing::info!(expired, "discarding persisted query cache");
            self.storage.remove_item(DEFAULT_STORAGE_KEY).await?;
            return Ok(None);
        }

        Ok(Some(cache))
    }
}

/// Time elapsed since `at`; zero for timestamps in the future.
pub(crate) fn age(at: DateTime<Utc>) -> Duration {
    (Utc::now() - at).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_storage_round_trips_and_removes() {
        let dir = std::env::temp_dir().join(format!("kudi_storage_{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir);

        assert_eq!(storage.get_item("cache").await.unwrap(), None);
        storage.set_item("cache", "{\"a\":1}").await.unwrap();
        assert_eq!(
            storage.get_item("cache").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        storage.remove_item("cache").await.unwrap();
        storage.remove_item("cache").await.unwrap();
        assert_eq!(storage.get_item("cache").await.unwrap(), None);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_storage_sanitizes_keys() {
        let storage = FileStorage::new("/tmp/kudi");
        assert_eq!(
            storage.path("../evil key"),
            PathBuf::from("/tmp/kudi/___evil_key.json")
        );
    }

    #[tokio::test]
    async fn expired_snapshot_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        let old = PersistedCache {
            timestamp: Utc::now() - chrono::Duration::hours(25),
            buster: String::new(),
            queries: Vec::new(),
        };
        storage
            .set_item(DEFAULT_STORAGE_KEY, &serde_json::to_string(&old).unwrap())
            .await
            .unwrap();

        let persister = Persister::new(storage.clone());
        assert!(persister.load().await.unwrap().is_none());
        assert_eq!(storage.get_item(DEFAULT_STORAGE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn busted_snapshot_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        Persister::new(storage.clone())
            .buster("v1")
            .save(Vec::new)
            .await
            .unwrap();

        assert!(Persister::new(storage.clone()).buster("v1").load().await.unwrap().is_some());
        assert!(Persister::new(storage).buster("v2").load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(DEFAULT_STORAGE_KEY, "not json").await.unwrap();
        assert!(Persister::new(storage).load().await.unwrap().is_none());
    }
}
