//! Durable storage of the single encrypted environment record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::utils::{EnvError, EnvResult};

/// Persisted form of the environment: one row holding the encrypted blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvRecord {
    pub id: String,
    /// Opaque encrypted `ConfigStore` (see `crypto`).
    pub env_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnvRecord {
    /// A record that has never been written, with a fresh identifier.
    pub fn new(env_data: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            env_data,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Get/put contract of the durable store.
#[async_trait]
pub trait EnvRepository: Send + Sync {
    /// Current record, or `None` if nothing has been persisted yet.
    async fn get_env(&self) -> EnvResult<Option<EnvRecord>>;

    /// Replace the stored record. Returns the record as written.
    async fn update_env(&self, record: EnvRecord) -> EnvResult<EnvRecord>;
}

/// Volatile repository, mostly for tests and single-process setups.
#[derive(Debug, Default)]
pub struct MemoryEnvRepository {
    record: RwLock<Option<EnvRecord>>,
    writes: AtomicUsize,
}

impl MemoryEnvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: EnvRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful `update_env` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvRepository for MemoryEnvRepository {
    async fn get_env(&self) -> EnvResult<Option<EnvRecord>> {
        Ok(self.record.read().await.clone())
    }

    async fn update_env(&self, mut record: EnvRecord) -> EnvResult<EnvRecord> {
        record.updated_at = Utc::now();
        *self.record.write().await = Some(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }
}

/// Repository keeping the record as a JSON file.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileEnvRepository {
    path: PathBuf,
}

impl FileEnvRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl EnvRepository for FileEnvRepository {
    async fn get_env(&self) -> EnvResult<Option<EnvRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map(Some).map_err(|e| {
                EnvError::PersistenceFailure(format!("error parsing {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EnvError::PersistenceFailure(format!(
                "error reading {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn update_env(&self, mut record: EnvRecord) -> EnvResult<EnvRecord> {
        record.updated_at = Utc::now();
        let content =
            serde_json::to_vec_pretty(&record).map_err(|e| EnvError::PersistenceFailure(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                EnvError::PersistenceFailure(format!("error creating {}: {}", parent.display(), e))
            })?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &content)
            .await
            .map_err(|e| EnvError::PersistenceFailure(format!("error writing {}: {}", temp.display(), e)))?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            EnvError::PersistenceFailure(format!("error replacing {}: {}", self.path.display(), e))
        })?;

        Ok(record)
    }
}
