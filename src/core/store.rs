// src/core/store.rs

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::core::error::PersistenceError;
use crate::core::models::{JobId, JobRecord, JobUpdate};

/// Durable keyed storage of job records.
///
/// `update` is atomic per record: a reader sees either the previous or the
/// next state, never a mix.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, record: &JobRecord) -> Result<JobId, PersistenceError>;

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, PersistenceError>;

    /// Applies a transition and returns the stored record.
    async fn update(&self, id: JobId, update: JobUpdate) -> Result<JobRecord, PersistenceError>;

    /// Records still QUEUED or IN_PROGRESS.
    async fn list_unfinished(&self) -> Result<Vec<JobRecord>, PersistenceError>;
}

fn apply(record: &mut JobRecord, update: JobUpdate) -> Result<(), PersistenceError> {
    record
        .apply(update)
        .map_err(|source| PersistenceError::InvalidTransition { id: record.id, source })
}

// --- Store in Memoria ---
// In-memory Store

/// Volatile store used in ephemeral mode and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: &JobRecord) -> Result<JobId, PersistenceError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.id) {
            return Err(PersistenceError::AlreadyExists(record.id));
        }
        jobs.insert(record.id, record.clone());
        Ok(record.id)
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, PersistenceError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> Result<JobRecord, PersistenceError> {
        let mut jobs = self.jobs.write().await;
        let current = jobs.get(&id).ok_or(PersistenceError::NotFound(id))?;
        // Apply to a copy so a rejected transition leaves the stored record untouched.
        let mut next = current.clone();
        apply(&mut next, update)?;
        jobs.insert(id, next.clone());
        Ok(next)
    }

    async fn list_unfinished(&self) -> Result<Vec<JobRecord>, PersistenceError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|r| !r.status.is_terminal())
            .cloned()
            .collect())
    }
}

// --- Store su File ---
// File-backed Store

/// One pretty-printed JSON document per job, replaced atomically on update.
#[derive(Debug)]
pub struct FileJobStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJobStore {
    /// Opens (and creates if needed) the store directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Job store opened.");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, path: &Path) -> Result<Option<JobRecord>, PersistenceError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, record: &JobRecord) -> Result<(), PersistenceError> {
        let path = self.path_of(record.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn create(&self, record: &JobRecord) -> Result<JobId, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(self.path_of(record.id)).await? {
            return Err(PersistenceError::AlreadyExists(record.id));
        }
        self.write(record).await?;
        Ok(record.id)
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, PersistenceError> {
        self.read(&self.path_of(id)).await
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> Result<JobRecord, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read(&self.path_of(id))
            .await?
            .ok_or(PersistenceError::NotFound(id))?;
        apply(&mut record, update)?;
        self.write(&record).await?;
        Ok(record)
    }

    async fn list_unfinished(&self) -> Result<Vec<JobRecord>, PersistenceError> {
        let mut unfinished = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(record)) if !record.status.is_terminal() => unfinished.push(record),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable job record.");
                }
            }
        }
        Ok(unfinished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{JobStatus, ResolvedTarget, ScanCategory, ScanOptions, ScanResult};
    use chrono::Utc;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    fn queued() -> JobRecord {
        JobRecord::queued(
            ResolvedTarget {
                canonical: "example.com".into(),
                resolved_ip: Ipv4Addr::new(93, 184, 216, 34),
            },
            ScanCategory::Quick,
            ScanOptions::new(),
            None,
            Utc::now(),
        )
    }

    async fn lifecycle(store: &dyn JobStore) {
        let record = queued();
        assert_eq!(store.create(&record).await.unwrap(), record.id);
        assert!(matches!(
            store.create(&record).await,
            Err(PersistenceError::AlreadyExists(_))
        ));
        assert_eq!(store.list_unfinished().await.unwrap().len(), 1);

        let started = store.update(record.id, JobUpdate::Started { at: Utc::now() }).await.unwrap();
        assert_eq!(started.status, JobStatus::InProgress);

        let result = ScanResult::success("host-discovery", 10, "<nmaprun/>".into(), String::new());
        store
            .update(record.id, JobUpdate::Completed { at: Utc::now(), results: vec![result] })
            .await
            .unwrap();

        let err = store
            .update(record.id, JobUpdate::Failed { at: Utc::now(), error: "late".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidTransition { .. }));

        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.results.as_ref().map(Vec::len), Some(1));
        assert!(stored.error.is_none());
        assert!(store.list_unfinished().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_lifecycle() {
        lifecycle(&MemoryJobStore::new()).await;
    }

    #[tokio::test]
    async fn file_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        lifecycle(&FileJobStore::open(dir.path()).await.unwrap()).await;
    }

    #[tokio::test]
    async fn unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::open(dir.path()).await.unwrap();
        let id = uuid::Uuid::new_v4();
        assert!(store.get(id).await.unwrap().is_none());
        assert!(matches!(
            store.update(id, JobUpdate::Started { at: Utc::now() }).await,
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn file_store_survives_reopen_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let record = queued();
        {
            let store = FileJobStore::open(dir.path()).await.unwrap();
            store.create(&record).await.unwrap();
        }
        std::fs::write(dir.path().join("broken.json"), b"{ not json").unwrap();

        let store = FileJobStore::open(dir.path()).await.unwrap();
        let unfinished = store.list_unfinished().await.unwrap();
        assert_eq!(unfinished.len(), 1);
        assert_eq!(unfinished[0], record);
    }

    #[tokio::test]
    async fn concurrent_readers_see_whole_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileJobStore::open(dir.path()).await.unwrap());
        let record = queued();
        store.create(&record).await.unwrap();

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let seen = store.get(record.id).await.unwrap().unwrap();
                    assert!(seen.results.is_none() || seen.status == JobStatus::Completed);
                    tokio::task::yield_now().await;
                }
            })
        };
        store.update(record.id, JobUpdate::Started { at: Utc::now() }).await.unwrap();
        store
            .update(record.id, JobUpdate::Completed { at: Utc::now(), results: Vec::new() })
            .await
            .unwrap();
        reader.await.unwrap();
    }
}
