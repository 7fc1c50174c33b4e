use crate::error::StoreError;
use crate::models::ListingRecord;
use crate::store::{ListingStore, MemoryListingStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Store persisted as a pretty-printed JSON array of records.
///
/// Held in memory and rewritten after every write. Each rewrite goes to a
/// sibling `.tmp` file first and is then renamed over the store, so a crash
/// mid-write leaves the previous file intact.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryListingStore,
    flush_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Load `path`, or start empty if the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records: Vec<ListingRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), records = records.len(), "opened JSON listing store");

        Ok(Self {
            path,
            inner: MemoryListingStore::from_records(records),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn records(&self) -> Vec<ListingRecord> {
        self.inner.snapshot()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        // Snapshot under the lock so a later flush never writes older state.
        let _guard = self.flush_lock.lock().await;
        let json = serde_json::to_string_pretty(&self.inner.snapshot())?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), "flushed JSON listing store");
        Ok(())
    }
}

#[async_trait]
impl ListingStore for JsonFileStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.flush().await
    }

    async fn list_active(&self) -> Result<Vec<ListingRecord>, StoreError> {
        self.inner.list_active().await
    }

    async fn insert(&self, record: &ListingRecord) -> Result<i64, StoreError> {
        let id = self.inner.insert(record).await?;
        self.flush().await?;
        Ok(id)
    }

    async fn mark_sold(&self, persisted_id: i64) -> Result<(), StoreError> {
        self.inner.mark_sold(persisted_id).await?;
        self.flush().await
    }

    async fn increment_seen(&self, persisted_id: i64) -> Result<(), StoreError> {
        self.inner.increment_seen(persisted_id).await?;
        self.flush().await
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}
