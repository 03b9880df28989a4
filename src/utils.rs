//! Error taxonomy and small helpers shared across the update pipeline.

/// Every way an environment update (or one of its collaborators) can fail.
///
/// All variants are terminal for the request: nothing is retried internally
/// and neither the in-memory store nor the durable record is modified.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("unauthorized")]
    AuthorizationDenied,

    #[error("invalid value for {key}: expected string, boolean or list of strings, got {found}")]
    InvalidPatchValue { key: String, found: &'static str },

    #[error("default role {0} is not in roles")]
    RoleNotInRoleSet(String),

    #[error("protected role {0} found in roles or default roles")]
    ProtectedRoleConflict(String),

    #[error("admin secret and old admin secret are required for secret change")]
    MissingOldSecret,

    #[error("old admin secret is not correct")]
    SecretMismatch,

    #[error("failed to persist configuration: {0}")]
    PersistenceFailure(String),

    #[error("failed to encrypt configuration: {0}")]
    EncryptionFailure(String),

    #[error("failed to decrypt configuration: {0}")]
    DecryptionFailure(String),

    #[error("failed to hash admin secret: {0}")]
    SecretHashFailure(String),

    #[error("invalid updater settings: {0}")]
    InvalidSettings(String),
}

pub type EnvResult<T> = Result<T, EnvError>;

/// Check if a string is already in UPPER_SNAKE_CASE format.
/// Pattern: ^[A-Z0-9]+(_[A-Z0-9]+)*$
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let bytes = s.as_bytes();
    if bytes[0] == b'_' || bytes[bytes.len() - 1] == b'_' {
        return false;
    }
    let mut prev_underscore = false;
    for &b in bytes {
        if b == b'_' {
            if prev_underscore {
                return false;
            }
            prev_underscore = true;
            continue;
        }
        prev_underscore = false;
        if !b.is_ascii_uppercase() && !b.is_ascii_digit() {
            return false;
        }
    }
    true
}

/// Normalize a wire key to the UPPER_SNAKE_CASE form used by the store.
///
/// Accepts camelCase, snake_case, kebab-case and keys that are already
/// upper snake case. Separators collapse to a single underscore; word
/// boundaries are lower→Upper, digit→Upper and Acronym→Word.
pub fn normalize_key(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }
    if is_upper_snake_case(input) {
        return input.to_string();
    }

    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(len + 4);

    for i in 0..len {
        let ch = chars[i];

        if ch == '_' || ch == ' ' || ch == '-' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if ch.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                let prev = chars[i - 1];
                let next_is_lower = i + 1 < len && chars[i + 1].is_lowercase();
                let boundary =
                    prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower);
                if boundary {
                    out.push('_');
                }
            }
            out.push(ch);
        } else if ch.is_lowercase() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Coerce a string value to boolean.
/// "true", "1" → true; everything else → false.
pub fn coerce_boolean(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "true" || lower == "1"
}

pub fn string_slice_contains<S: AsRef<str>>(haystack: &[S], needle: &str) -> bool {
    haystack.iter().any(|s| s.as_ref() == needle)
}
