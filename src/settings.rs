//! Configuration of the update subsystem itself.
//!
//! Each parameter resolves in order of precedence:
//! 1. Builder value
//! 2. Environment variable (`AUTHENV_*`)
//! 3. Built-in default
//!
//! The encryption key has no default and must come from 1 or 2.

use std::collections::HashMap;

use crate::constants::{
    DEFAULT_ADMIN_COOKIE_NAME, ENV_ADMIN_COOKIE_NAME, ENV_BCRYPT_COST, ENV_COOKIE_DOMAIN, ENV_COOKIE_SECURE,
    ENV_ENCRYPTION_KEY,
};
use crate::crypto::AesGcmCipher;
use crate::rotation::BcryptSecretHasher;
use crate::session::AdminCookieIssuer;
use crate::utils::{coerce_boolean, EnvError, EnvResult};

/// bcrypt accepts costs in 4..=31.
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone, Default)]
pub struct UpdaterSettings {
    encryption_key: Option<String>,
    bcrypt_cost: Option<u32>,
    cookie_name: Option<String>,
    cookie_domain: Option<String>,
    secure_cookie: Option<bool>,
    env_override: Option<HashMap<String, String>>,
}

impl UpdaterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base64-encoded 32-byte AES key.
    pub fn with_encryption_key(mut self, key: &str) -> Self {
        self.encryption_key = Some(key.to_string());
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = Some(cost);
        self
    }

    pub fn with_cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = Some(name.to_string());
        self
    }

    pub fn with_cookie_domain(mut self, domain: &str) -> Self {
        self.cookie_domain = Some(domain.to_string());
        self
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = Some(secure);
        self
    }

    /// Override environment variables (for testing).
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env_override = Some(env);
        self
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        let value = match self.env_override {
            Some(ref env) => env.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    fn resolve_param(&self, env_var: &str, builder_value: &Option<String>) -> Option<String> {
        if let Some(ref val) = builder_value {
            return Some(val.clone());
        }
        self.get_env_var(env_var)
    }

    pub fn cipher(&self) -> EnvResult<AesGcmCipher> {
        let key = self.resolve_param(ENV_ENCRYPTION_KEY, &self.encryption_key).ok_or_else(|| {
            EnvError::InvalidSettings(format!("encryption key is required, set {}", ENV_ENCRYPTION_KEY))
        })?;
        AesGcmCipher::from_base64(&key)
    }

    pub fn bcrypt_cost(&self) -> EnvResult<u32> {
        let cost = match self.bcrypt_cost {
            Some(cost) => cost,
            None => match self.get_env_var(ENV_BCRYPT_COST) {
                Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                    EnvError::InvalidSettings(format!("{} is not a number: {}", ENV_BCRYPT_COST, e))
                })?,
                None => bcrypt::DEFAULT_COST,
            },
        };
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(EnvError::InvalidSettings(format!(
                "bcrypt cost must be between {} and {}, got {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST, cost
            )));
        }
        Ok(cost)
    }

    pub fn hasher(&self) -> EnvResult<BcryptSecretHasher> {
        Ok(BcryptSecretHasher::new(self.bcrypt_cost()?))
    }

    pub fn cookie_name(&self) -> String {
        self.resolve_param(ENV_ADMIN_COOKIE_NAME, &self.cookie_name)
            .unwrap_or_else(|| DEFAULT_ADMIN_COOKIE_NAME.to_string())
    }

    pub fn cookie_domain(&self) -> Option<String> {
        self.resolve_param(ENV_COOKIE_DOMAIN, &self.cookie_domain)
    }

    pub fn secure_cookie(&self) -> bool {
        if let Some(secure) = self.secure_cookie {
            return secure;
        }
        self.get_env_var(ENV_COOKIE_SECURE)
            .map(|v| coerce_boolean(&v))
            .unwrap_or(true)
    }

    pub fn session_issuer(&self) -> AdminCookieIssuer {
        AdminCookieIssuer::new(&self.cookie_name())
            .with_domain(self.cookie_domain())
            .with_secure(self.secure_cookie())
    }
}
