//! Runtime environment configuration for an authentication server.
//!
//! Holds the process-wide settings store, applies admin-submitted partial
//! updates with cross-field validation and admin secret rotation, and keeps an
//! encrypted durable record in step with the in-memory snapshot.

pub mod constants;
pub mod crypto;
pub mod patch;
pub mod repository;
pub mod rotation;
pub mod session;
pub mod settings;
pub mod store;
pub mod sync;
pub mod updater;
pub mod utils;
pub mod validate;

pub use crypto::{AesGcmCipher, ConfigCipher};
pub use patch::{ConfigPatch, PatchValue};
pub use repository::{EnvRecord, EnvRepository, FileEnvRepository, MemoryEnvRepository};
pub use rotation::{BcryptSecretHasher, SecretHasher};
pub use session::{AdminContext, AdminCookie, AdminCookieIssuer, SessionIssuer};
pub use settings::UpdaterSettings;
pub use store::{ConfigStore, EnvStore, SettingKind};
pub use sync::PersistenceSynchronizer;
pub use updater::{EnvUpdater, UpdateEnvRequest, UpdateEnvResponse};
pub use utils::{coerce_boolean, normalize_key, EnvError, EnvResult};
pub use validate::RoleFields;
