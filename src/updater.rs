//! The environment update operation.
//!
//! One update runs the whole pipeline under a single writer lock:
//! patch → validate → rotate (if `ADMIN_SECRET` changes) → persist → swap.
//! The in-memory store is swapped last, so any failure (or a dropped future)
//! leaves both the cache and the durable record as they were.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::constants::{ADMIN_SECRET, DEFAULT_ROLES, OLD_ADMIN_SECRET, PROTECTED_ROLES, ROLES, UPDATE_SUCCESS_MESSAGE};
use crate::crypto::ConfigCipher;
use crate::patch::{ConfigPatch, PatchValue};
use crate::repository::EnvRepository;
use crate::rotation::{rotate_admin_secret, SecretHasher};
use crate::session::{AdminContext, AdminCookie, SessionIssuer};
use crate::settings::UpdaterSettings;
use crate::store::EnvStore;
use crate::sync::PersistenceSynchronizer;
use crate::utils::{normalize_key, EnvError, EnvResult};
use crate::validate::{validate, RoleFields};

/// A partial environment update as submitted by an admin.
///
/// Role lists are tracked both in the patch (they are stored settings) and
/// as `RoleFields` for structural validation. The old admin secret is only a
/// credential and never reaches the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateEnvRequest {
    patch: ConfigPatch,
    roles: RoleFields,
    old_admin_secret: Option<String>,
}

impl UpdateEnvRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a wire record (a JSON object of string, boolean and string-list
    /// values; `null` means "leave unchanged").
    pub fn from_json(input: &Value) -> EnvResult<Self> {
        let mut request = Self::new();
        for (key, value) in ConfigPatch::from_json(input)? {
            request.assign(key, value);
        }
        request.check_reserved_kinds()?;
        Ok(request)
    }

    pub fn set_string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.assign(normalize_key(key), PatchValue::String(value.into()));
        self
    }

    pub fn set_bool(mut self, key: &str, value: bool) -> Self {
        self.assign(normalize_key(key), PatchValue::Bool(value));
        self
    }

    pub fn set_list(mut self, key: &str, value: Vec<String>) -> Self {
        self.assign(normalize_key(key), PatchValue::StringList(value));
        self
    }

    pub fn with_roles(self, roles: Vec<String>) -> Self {
        self.set_list(ROLES, roles)
    }

    pub fn with_default_roles(self, roles: Vec<String>) -> Self {
        self.set_list(DEFAULT_ROLES, roles)
    }

    pub fn with_protected_roles(self, roles: Vec<String>) -> Self {
        self.set_list(PROTECTED_ROLES, roles)
    }

    /// Request a rotation to `secret`. Requires `with_old_admin_secret`.
    pub fn with_admin_secret(self, secret: &str) -> Self {
        self.set_string(ADMIN_SECRET, secret)
    }

    pub fn with_old_admin_secret(mut self, secret: &str) -> Self {
        self.old_admin_secret = Some(secret.to_string());
        self
    }

    pub fn patch(&self) -> &ConfigPatch {
        &self.patch
    }

    pub fn roles(&self) -> &RoleFields {
        &self.roles
    }

    pub fn old_admin_secret(&self) -> Option<&str> {
        self.old_admin_secret.as_deref()
    }

    pub fn rotates_admin_secret(&self) -> bool {
        self.patch.contains_key(ADMIN_SECRET)
    }

    fn assign(&mut self, key: String, value: PatchValue) {
        match (key.as_str(), &value) {
            (OLD_ADMIN_SECRET, PatchValue::String(secret)) => {
                self.old_admin_secret = Some(secret.clone());
                return;
            }
            (ROLES, PatchValue::StringList(list)) => self.roles.roles = list.clone(),
            (DEFAULT_ROLES, PatchValue::StringList(list)) => self.roles.default_roles = list.clone(),
            (PROTECTED_ROLES, PatchValue::StringList(list)) => self.roles.protected_roles = list.clone(),
            _ => {}
        }
        self.patch.set(&key, value);
    }

    /// Keys with a fixed meaning must carry the right kind of value.
    fn check_reserved_kinds(&self) -> EnvResult<()> {
        let invalid = |key: &str, value: &PatchValue| EnvError::InvalidPatchValue {
            key: key.to_string(),
            found: value.kind_name(),
        };

        if let Some(value) = self.patch.get(OLD_ADMIN_SECRET) {
            return Err(invalid(OLD_ADMIN_SECRET, value));
        }
        if let Some(value) = self.patch.get(ADMIN_SECRET).filter(|v| v.as_str().is_none()) {
            return Err(invalid(ADMIN_SECRET, value));
        }
        for key in [ROLES, DEFAULT_ROLES, PROTECTED_ROLES] {
            if let Some(value) = self.patch.get(key).filter(|v| v.as_list().is_none()) {
                return Err(invalid(key, value));
            }
        }
        Ok(())
    }
}

/// Successful update outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEnvResponse {
    pub message: String,
    /// Replacement admin session, present only when the secret was rotated.
    pub admin_cookie: Option<AdminCookie>,
}

/// Applies admin updates to the process-wide `EnvStore` and keeps the durable
/// record in step with it.
pub struct EnvUpdater {
    store: Arc<EnvStore>,
    synchronizer: PersistenceSynchronizer,
    hasher: Arc<dyn SecretHasher>,
    sessions: Arc<dyn SessionIssuer>,
    update_lock: Mutex<()>,
}

impl EnvUpdater {
    pub fn new(
        store: Arc<EnvStore>,
        repository: Arc<dyn EnvRepository>,
        cipher: Arc<dyn ConfigCipher>,
        hasher: Arc<dyn SecretHasher>,
        sessions: Arc<dyn SessionIssuer>,
    ) -> Self {
        Self {
            store,
            synchronizer: PersistenceSynchronizer::new(repository, cipher),
            hasher,
            sessions,
            update_lock: Mutex::new(()),
        }
    }

    /// Wire the default collaborators (AES-GCM, bcrypt, admin cookie) from
    /// `settings`.
    pub fn from_settings(
        settings: &UpdaterSettings,
        store: Arc<EnvStore>,
        repository: Arc<dyn EnvRepository>,
    ) -> EnvResult<Self> {
        Ok(Self::new(
            store,
            repository,
            Arc::new(settings.cipher()?),
            Arc::new(settings.hasher()?),
            Arc::new(settings.session_issuer()),
        ))
    }

    pub fn store(&self) -> &Arc<EnvStore> {
        &self.store
    }

    pub fn cipher(&self) -> &Arc<dyn ConfigCipher> {
        self.synchronizer.cipher()
    }

    /// Apply `request` on behalf of `ctx`.
    ///
    /// Either every step succeeds and the new snapshot is both persisted and
    /// visible to readers, or an error is returned and nothing changed.
    pub async fn update_env(&self, ctx: &AdminContext, request: UpdateEnvRequest) -> EnvResult<UpdateEnvResponse> {
        if !ctx.is_super_admin {
            warn!("environment update rejected: caller is not a super admin");
            return Err(EnvError::AuthorizationDenied);
        }
        request.check_reserved_kinds()?;

        let _guard = self.update_lock.lock().await;

        let current = self.store.snapshot();
        let mut candidate = request.patch.apply(&current);

        validate(&mut candidate, &request.roles).map_err(|e| {
            warn!(error = %e, "environment update rejected");
            e
        })?;

        let secret_hash = if request.rotates_admin_secret() {
            Some(rotate_admin_secret(&self.hasher, &current, &mut candidate, request.old_admin_secret()).await?)
        } else {
            None
        };

        let record = self.synchronizer.persist(&candidate).await?;
        self.store.replace(candidate);

        info!(
            record_id = %record.id,
            keys = request.patch.len(),
            rotated = secret_hash.is_some(),
            "configurations updated"
        );

        let admin_cookie = secret_hash.map(|hash| self.sessions.issue(ctx, &hash));
        Ok(UpdateEnvResponse {
            message: UPDATE_SUCCESS_MESSAGE.to_string(),
            admin_cookie,
        })
    }
}
