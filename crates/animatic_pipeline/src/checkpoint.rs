//! Explicit checkpoints for resumable jobs.
//!
//! Every block of a job runs through [`Checkpoints::run`]. The first time a
//! key is seen the block executes and its result is committed; on a resumed
//! run the committed value is returned and the block is skipped. Blocks must
//! tolerate being re-executed if they fail before committing.
//!
//! Side effects on collaborators we do not control (final state, downstream
//! trigger) go through [`Checkpoints::once`], which only records a marker.

use animatic_error::{AnimaticResult, CheckpointError, CheckpointErrorKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Durable store of committed checkpoint values, grouped by job.
#[async_trait]
pub trait CheckpointLog: Send + Sync {
    /// Committed value for a key, if any.
    async fn load(&self, job_id: &str, key: &str) -> Result<Option<Value>, CheckpointError>;

    /// Commit a value. Overwrites an existing one.
    async fn commit(&self, job_id: &str, key: &str, value: Value) -> Result<(), CheckpointError>;

    /// Forget everything committed for a job.
    async fn clear(&self, job_id: &str) -> Result<(), CheckpointError>;
}

/// Checkpoint log held in memory. Survives retries within one process.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointLog {
    jobs: Mutex<HashMap<String, BTreeMap<String, Value>>>,
}

impl InMemoryCheckpointLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys committed for a job, sorted.
    pub fn committed_keys(&self, job_id: &str) -> Vec<String> {
        self.jobs
            .lock()
            .get(job_id)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointLog for InMemoryCheckpointLog {
    async fn load(&self, job_id: &str, key: &str) -> Result<Option<Value>, CheckpointError> {
        Ok(self
            .jobs
            .lock()
            .get(job_id)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn commit(&self, job_id: &str, key: &str, value: Value) -> Result<(), CheckpointError> {
        self.jobs
            .lock()
            .entry(job_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn clear(&self, job_id: &str) -> Result<(), CheckpointError> {
        self.jobs.lock().remove(job_id);
        Ok(())
    }
}

/// Checkpoint log stored as one JSON object per job in a directory.
///
/// Writes go to a temporary file that is renamed into place, so a crash
/// mid-write leaves the previous commit intact.
#[derive(Debug)]
pub struct FileCheckpointLog {
    dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCheckpointLog {
    /// Log rooted at `dir`. The directory is created on first commit.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Directory holding the job files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing one job.
    ///
    /// The name is a readable slug of the id followed by a digest of the raw
    /// id, so ids that slug alike still get their own file.
    pub fn job_path(&self, job_id: &str) -> PathBuf {
        let slug: String = job_id
            .chars()
            .take(64)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = format!("{:x}", Sha256::digest(job_id.as_bytes()));
        self.dir.join(format!("{}-{}.json", slug, &digest[..16]))
    }

    async fn read_job(&self, job_id: &str) -> Result<BTreeMap<String, Value>, CheckpointError> {
        let path = self.job_path(job_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                CheckpointError::new(CheckpointErrorKind::Storage(format!(
                    "Corrupt checkpoint file {}: {}",
                    path.display(),
                    e
                )))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(CheckpointError::new(CheckpointErrorKind::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))),
        }
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::new(CheckpointErrorKind::Storage(format!(
        "Failed to write {}: {}",
        path.display(),
        e
    )))
}

#[async_trait]
impl CheckpointLog for FileCheckpointLog {
    async fn load(&self, job_id: &str, key: &str) -> Result<Option<Value>, CheckpointError> {
        Ok(self.read_job(job_id).await?.remove(key))
    }

    async fn commit(&self, job_id: &str, key: &str, value: Value) -> Result<(), CheckpointError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_job(job_id).await?;
        entries.insert(key.to_string(), value);

        let path = self.job_path(job_id);
        let bytes = serde_json::to_vec_pretty(&entries).map_err(|e| storage_error(&path, e))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error(&self.dir, e))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage_error(&path, e))
    }

    async fn clear(&self, job_id: &str) -> Result<(), CheckpointError> {
        let _guard = self.write_lock.lock().await;
        let path = self.job_path(job_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&path, e)),
        }
    }
}

/// Checkpoint runner bound to one job.
#[derive(Clone)]
pub struct Checkpoints {
    log: Arc<dyn CheckpointLog>,
    job_id: String,
}

impl std::fmt::Debug for Checkpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoints")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

impl Checkpoints {
    /// Checkpoints for a job.
    pub fn new(log: Arc<dyn CheckpointLog>, job_id: impl Into<String>) -> Self {
        Self {
            log,
            job_id: job_id.into(),
        }
    }

    /// Job these checkpoints belong to.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Run a block once, returning its committed value on replay.
    ///
    /// Errors are not committed; the block runs again next time.
    #[instrument(skip(self, block), fields(job_id = %self.job_id))]
    pub async fn run<T, F, Fut>(&self, key: &str, block: F) -> AnimaticResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AnimaticResult<T>>,
    {
        if let Some(value) = self.log.load(&self.job_id, key).await? {
            debug!(key, "Replaying committed checkpoint");
            return serde_json::from_value(value).map_err(|e| {
                CheckpointError::new(CheckpointErrorKind::Serialize {
                    key: key.to_string(),
                    message: e.to_string(),
                })
                .into()
            });
        }

        let result = block().await?;
        let value = serde_json::to_value(&result).map_err(|e| {
            CheckpointError::new(CheckpointErrorKind::Serialize {
                key: key.to_string(),
                message: e.to_string(),
            })
        })?;
        self.log.commit(&self.job_id, key, value).await?;
        debug!(key, "Committed checkpoint");
        Ok(result)
    }

    /// Perform a side effect unless its marker is already committed.
    ///
    /// Returns `true` when the effect ran now, `false` when it had already
    /// happened.
    #[instrument(skip(self, effect), fields(job_id = %self.job_id))]
    pub async fn once<F, Fut>(&self, marker: &str, effect: F) -> AnimaticResult<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AnimaticResult<()>>,
    {
        if self.is_committed(marker).await? {
            debug!(marker, "Side effect already happened, skipping");
            return Ok(false);
        }

        effect().await?;
        self.log
            .commit(&self.job_id, marker, Value::Bool(true))
            .await?;
        debug!(marker, "Recorded side effect marker");
        Ok(true)
    }

    /// Whether anything is committed under a key.
    pub async fn is_committed(&self, key: &str) -> AnimaticResult<bool> {
        Ok(self.log.load(&self.job_id, key).await?.is_some())
    }

    /// Drop everything committed for this job.
    pub async fn clear(&self) -> AnimaticResult<()> {
        Ok(self.log.clear(&self.job_id).await?)
    }
}
