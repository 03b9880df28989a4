//! Partial updates: decoding dynamic input into typed values and applying
//! them to a working copy of the store.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::store::ConfigStore;
use crate::utils::{normalize_key, EnvError, EnvResult};

/// A single typed assignment. Decoded once at the boundary so the rest of the
/// pipeline never inspects JSON kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchValue {
    String(String),
    Bool(bool),
    StringList(Vec<String>),
}

impl PatchValue {
    /// Decode one wire value. `null` is an absent value (`Ok(None)`); numbers,
    /// objects and lists with non-string members are rejected.
    pub fn from_json(key: &str, value: &Value) -> EnvResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Self::String(s.clone()))),
            Value::Bool(b) => Ok(Some(Self::Bool(*b))),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(EnvError::InvalidPatchValue {
                        key: key.to_string(),
                        found: "list with non-string element",
                    }),
                })
                .collect::<EnvResult<Vec<_>>>()
                .map(|list| Some(Self::StringList(list))),
            other => Err(EnvError::InvalidPatchValue {
                key: key.to_string(),
                found: json_kind(other),
            }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(list) => Some(list),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bool(_) => "boolean",
            Self::StringList(_) => "list",
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Set of typed assignments keyed by normalized setting name.
///
/// Only present values are held; anything not in the patch keeps its current
/// value when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    values: BTreeMap<String, PatchValue>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a JSON object into a patch. Keys are normalized to
    /// UPPER_SNAKE_CASE, `null` members are skipped.
    pub fn from_json(input: &Value) -> EnvResult<Self> {
        let object = input.as_object().ok_or_else(|| EnvError::InvalidPatchValue {
            key: "<root>".to_string(),
            found: json_kind(input),
        })?;

        let mut patch = Self::new();
        for (raw_key, raw_value) in object {
            let key = normalize_key(raw_key);
            if let Some(value) = PatchValue::from_json(&key, raw_value)? {
                patch.values.insert(key, value);
            }
        }
        Ok(patch)
    }

    pub fn set(&mut self, key: &str, value: PatchValue) {
        self.values.insert(normalize_key(key), value);
    }

    pub fn get(&self, key: &str) -> Option<&PatchValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PatchValue> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Produce a candidate store: a clone of `base` with every patch value
    /// routed into its typed map. `base` is left untouched.
    pub fn apply(&self, base: &ConfigStore) -> ConfigStore {
        let mut candidate = base.clone();
        for (key, value) in &self.values {
            match value {
                PatchValue::String(s) => candidate.set_string(key, s.clone()),
                PatchValue::Bool(b) => candidate.set_bool(key, *b),
                PatchValue::StringList(list) => candidate.set_list(key, list.clone()),
            }
        }
        candidate
    }
}

impl IntoIterator for ConfigPatch {
    type Item = (String, PatchValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PatchValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_store() -> ConfigStore {
        let mut store = ConfigStore::new();
        store.set_string("SMTP_HOST", "smtp.example.com");
        store.set_bool("DISABLE_SIGN_UP", false);
        store.set_list("ROLES", vec!["user".into()]);
        store
    }

    #[test]
    fn test_decodes_legal_kinds() {
        let patch = ConfigPatch::from_json(&json!({
            "SMTP_HOST": "mail.example.com",
            "DISABLE_SIGN_UP": true,
            "ROLES": ["user", "admin"]
        }))
        .unwrap();

        assert_eq!(patch.get("SMTP_HOST"), Some(&PatchValue::String("mail.example.com".into())));
        assert_eq!(patch.get("DISABLE_SIGN_UP"), Some(&PatchValue::Bool(true)));
        assert_eq!(
            patch.get("ROLES"),
            Some(&PatchValue::StringList(vec!["user".into(), "admin".into()]))
        );
    }

    #[test]
    fn test_null_is_absent() {
        let patch = ConfigPatch::from_json(&json!({"SMTP_HOST": null, "JWT_TYPE": "HS256"})).unwrap();
        assert!(!patch.contains_key("SMTP_HOST"));
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn test_rejects_number() {
        let err = ConfigPatch::from_json(&json!({"SMTP_PORT": 587})).unwrap_err();
        match err {
            EnvError::InvalidPatchValue { key, found } => {
                assert_eq!(key, "SMTP_PORT");
                assert_eq!(found, "number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_object() {
        let err = ConfigPatch::from_json(&json!({"CUSTOM": {"a": 1}})).unwrap_err();
        assert!(matches!(err, EnvError::InvalidPatchValue { found: "object", .. }));
    }

    #[test]
    fn test_rejects_mixed_list() {
        let err = ConfigPatch::from_json(&json!({"ROLES": ["user", 7]})).unwrap_err();
        assert!(matches!(
            err,
            EnvError::InvalidPatchValue { found: "list with non-string element", .. }
        ));
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = ConfigPatch::from_json(&json!(["ROLES"])).unwrap_err();
        assert!(matches!(err, EnvError::InvalidPatchValue { ref key, .. } if key == "<root>"));
    }

    #[test]
    fn test_normalizes_keys() {
        let patch = ConfigPatch::from_json(&json!({"smtpUsername": "mailer", "sender_email": "a@x"})).unwrap();
        assert!(patch.contains_key("SMTP_USERNAME"));
        assert!(patch.contains_key("SENDER_EMAIL"));
    }

    #[test]
    fn test_apply_is_partial() {
        let base = base_store();
        let patch = ConfigPatch::from_json(&json!({"DISABLE_SIGN_UP": true})).unwrap();
        let candidate = patch.apply(&base);

        assert!(candidate.get_bool("DISABLE_SIGN_UP"));
        assert_eq!(candidate.get_string("SMTP_HOST"), "smtp.example.com");
        assert_eq!(candidate.get_list("ROLES"), vec!["user".to_string()]);
        // base is a separate value
        assert!(!base.get_bool("DISABLE_SIGN_UP"));
    }

    #[test]
    fn test_apply_overwrites_and_moves_type() {
        let base = base_store();
        let mut patch = ConfigPatch::new();
        patch.set("SMTP_HOST", PatchValue::Bool(false));
        let candidate = patch.apply(&base);
        assert!(!candidate.strings.contains_key("SMTP_HOST"));
        assert_eq!(candidate.bools.get("SMTP_HOST"), Some(&false));
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let base = base_store();
        assert_eq!(ConfigPatch::new().apply(&base), base);
    }
}
