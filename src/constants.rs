//! Canonical setting keys read by the validator and the rotation path.

pub const ADMIN_SECRET: &str = "ADMIN_SECRET";
pub const OLD_ADMIN_SECRET: &str = "OLD_ADMIN_SECRET";

pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USERNAME: &str = "SMTP_USERNAME";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const SENDER_EMAIL: &str = "SENDER_EMAIL";

pub const DISABLE_EMAIL_VERIFICATION: &str = "DISABLE_EMAIL_VERIFICATION";
pub const DISABLE_MAGIC_LINK_LOGIN: &str = "DISABLE_MAGIC_LINK_LOGIN";

pub const ROLES: &str = "ROLES";
pub const DEFAULT_ROLES: &str = "DEFAULT_ROLES";
pub const PROTECTED_ROLES: &str = "PROTECTED_ROLES";

/// Message returned on a successful update.
pub const UPDATE_SUCCESS_MESSAGE: &str = "configurations updated successfully";

// Environment variables consulted by `UpdaterSettings`.
pub const ENV_ENCRYPTION_KEY: &str = "AUTHENV_ENCRYPTION_KEY";
pub const ENV_BCRYPT_COST: &str = "AUTHENV_BCRYPT_COST";
pub const ENV_ADMIN_COOKIE_NAME: &str = "AUTHENV_ADMIN_COOKIE_NAME";
pub const ENV_COOKIE_DOMAIN: &str = "AUTHENV_COOKIE_DOMAIN";
pub const ENV_COOKIE_SECURE: &str = "AUTHENV_COOKIE_SECURE";

pub const DEFAULT_ADMIN_COOKIE_NAME: &str = "authorizer-admin";
