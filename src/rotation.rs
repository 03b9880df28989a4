//! Admin secret rotation.
//!
//! The store keeps the admin secret as a bcrypt hash. A patch that sets
//! `ADMIN_SECRET` carries the new plaintext; rotation checks the caller's old
//! plaintext against the current hash, then replaces the candidate value with
//! the hash of the new one. Raw hashing stays behind `SecretHasher`.

use std::sync::Arc;

use tracing::warn;

use crate::constants::ADMIN_SECRET;
use crate::store::ConfigStore;
use crate::utils::{EnvError, EnvResult};

/// One-way hashing capability used for the admin secret.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> EnvResult<String>;

    /// `true` if `secret` matches `hash`. Malformed hashes never match.
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

/// bcrypt-backed `SecretHasher`.
#[derive(Debug, Clone, Copy)]
pub struct BcryptSecretHasher {
    cost: u32,
}

impl BcryptSecretHasher {
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub const fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptSecretHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl SecretHasher for BcryptSecretHasher {
    fn hash(&self, secret: &str) -> EnvResult<String> {
        bcrypt::hash(secret, self.cost).map_err(|e| EnvError::SecretHashFailure(e.to_string()))
    }

    fn verify(&self, secret: &str, hash: &str) -> bool {
        bcrypt::verify(secret, hash).unwrap_or(false)
    }
}

/// Verify `old_secret` against the admin secret hash in `current` and, on
/// success, hash the new secret already merged into `candidate`.
///
/// The candidate's `ADMIN_SECRET` is replaced by the new hash, which is also
/// returned so a session bound to it can be issued. bcrypt is CPU-heavy, so
/// both steps run on the blocking pool.
pub async fn rotate_admin_secret(
    hasher: &Arc<dyn SecretHasher>,
    current: &ConfigStore,
    candidate: &mut ConfigStore,
    old_secret: Option<&str>,
) -> EnvResult<String> {
    let old_secret = old_secret.ok_or(EnvError::MissingOldSecret)?.to_string();
    let stored_hash = current.get_string(ADMIN_SECRET);
    let new_secret = candidate.get_string(ADMIN_SECRET);
    let hasher = Arc::clone(hasher);

    let new_hash = tokio::task::spawn_blocking(move || {
        if !hasher.verify(&old_secret, &stored_hash) {
            return Err(EnvError::SecretMismatch);
        }
        hasher.hash(&new_secret)
    })
    .await
    .map_err(|e| EnvError::SecretHashFailure(format!("hashing task failed: {}", e)))?
    .map_err(|e| {
        if matches!(e, EnvError::SecretMismatch) {
            warn!("admin secret rotation rejected: old secret does not match");
        }
        e
    })?;

    candidate.set_string(ADMIN_SECRET, new_hash.clone());
    Ok(new_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Arc<dyn SecretHasher> {
        Arc::new(BcryptSecretHasher::new(4))
    }

    fn store_with_secret(hasher: &Arc<dyn SecretHasher>, secret: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store.set_string(ADMIN_SECRET, hasher.hash(secret).unwrap());
        store
    }

    #[test]
    fn test_bcrypt_verify() {
        let h = BcryptSecretHasher::new(4);
        let hash = h.hash("admin").unwrap();
        assert!(h.verify("admin", &hash));
        assert!(!h.verify("nimda", &hash));
        assert!(!h.verify("admin", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(BcryptSecretHasher::default().cost(), bcrypt::DEFAULT_COST);
    }

    #[tokio::test]
    async fn test_rotation_replaces_secret_with_hash() {
        let hasher = hasher();
        let current = store_with_secret(&hasher, "old-secret");
        let mut candidate = current.clone();
        candidate.set_string(ADMIN_SECRET, "new-secret");

        let hash = rotate_admin_secret(&hasher, &current, &mut candidate, Some("old-secret"))
            .await
            .unwrap();

        assert_eq!(candidate.get_string(ADMIN_SECRET), hash);
        assert!(hasher.verify("new-secret", &hash));
        assert!(!hasher.verify("old-secret", &hash));
    }

    #[tokio::test]
    async fn test_rotation_requires_old_secret() {
        let hasher = hasher();
        let current = store_with_secret(&hasher, "old-secret");
        let mut candidate = current.clone();
        candidate.set_string(ADMIN_SECRET, "new-secret");

        let err = rotate_admin_secret(&hasher, &current, &mut candidate, None)
            .await
            .unwrap_err();

        assert!(matches!(err, EnvError::MissingOldSecret));
        assert_eq!(candidate.get_string(ADMIN_SECRET), "new-secret");
    }

    #[tokio::test]
    async fn test_rotation_rejects_wrong_old_secret() {
        let hasher = hasher();
        let current = store_with_secret(&hasher, "old-secret");
        let mut candidate = current.clone();
        candidate.set_string(ADMIN_SECRET, "new-secret");

        let err = rotate_admin_secret(&hasher, &current, &mut candidate, Some("guess"))
            .await
            .unwrap_err();

        assert!(matches!(err, EnvError::SecretMismatch));
    }

    #[tokio::test]
    async fn test_rotation_without_stored_secret_fails() {
        let hasher = hasher();
        let current = ConfigStore::new();
        let mut candidate = current.clone();
        candidate.set_string(ADMIN_SECRET, "new-secret");

        let err = rotate_admin_secret(&hasher, &current, &mut candidate, Some(""))
            .await
            .unwrap_err();

        assert!(matches!(err, EnvError::SecretMismatch));
    }
}
