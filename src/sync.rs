//! Writes validated snapshots through the durable store.

use std::sync::Arc;

use tracing::error;

use crate::crypto::ConfigCipher;
use crate::repository::{EnvRecord, EnvRepository};
use crate::store::ConfigStore;
use crate::utils::EnvResult;

/// Encrypts a candidate store and writes it over the existing record.
pub struct PersistenceSynchronizer {
    repository: Arc<dyn EnvRepository>,
    cipher: Arc<dyn ConfigCipher>,
}

impl PersistenceSynchronizer {
    pub fn new(repository: Arc<dyn EnvRepository>, cipher: Arc<dyn ConfigCipher>) -> Self {
        Self { repository, cipher }
    }

    /// Persist `store`, keeping the identity of the current record. A new
    /// record is created when none exists yet.
    pub async fn persist(&self, store: &ConfigStore) -> EnvResult<EnvRecord> {
        let existing = self.repository.get_env().await?;
        let env_data = self.cipher.encrypt(store)?;

        let record = match existing {
            Some(mut record) => {
                record.env_data = env_data;
                record
            }
            None => EnvRecord::new(env_data),
        };

        self.repository.update_env(record).await.map_err(|e| {
            error!(error = %e, "error updating config");
            e
        })
    }

    pub fn cipher(&self) -> &Arc<dyn ConfigCipher> {
        &self.cipher
    }

    pub fn repository(&self) -> &Arc<dyn EnvRepository> {
        &self.repository
    }
}
