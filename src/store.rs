//! Typed in-memory environment store.
//!
//! `ConfigStore` is a plain value holding three disjoint maps (strings,
//! booleans, string lists). `EnvStore` owns the process-wide snapshot behind
//! an `RwLock<Arc<_>>`: readers clone the `Arc`, the updater swaps it. A reader
//! therefore observes either the previous or the next snapshot in full.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Which typed map a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    String,
    Bool,
    List,
}

/// Snapshot of every runtime setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigStore {
    #[serde(default)]
    pub strings: HashMap<String, String>,
    #[serde(default)]
    pub bools: HashMap<String, bool>,
    #[serde(default)]
    pub lists: HashMap<String, Vec<String>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// String value for `key`, or an empty string if unset.
    pub fn get_string(&self, key: &str) -> String {
        self.strings.get(key).cloned().unwrap_or_default()
    }

    /// Boolean value for `key`, or `false` if unset.
    pub fn get_bool(&self, key: &str) -> bool {
        self.bools.get(key).copied().unwrap_or(false)
    }

    /// List value for `key`, or an empty list if unset.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.lists.get(key).cloned().unwrap_or_default()
    }

    // Setters keep the three maps disjoint: a key moves between maps when
    // its type changes.

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.bools.remove(key);
        self.lists.remove(key);
        self.strings.insert(key.to_string(), value.into());
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.strings.remove(key);
        self.lists.remove(key);
        self.bools.insert(key.to_string(), value);
    }

    pub fn set_list(&mut self, key: &str, value: Vec<String>) {
        self.strings.remove(key);
        self.bools.remove(key);
        self.lists.insert(key.to_string(), value);
    }

    pub fn kind_of(&self, key: &str) -> Option<SettingKind> {
        if self.strings.contains_key(key) {
            Some(SettingKind::String)
        } else if self.bools.contains_key(key) {
            Some(SettingKind::Bool)
        } else if self.lists.contains_key(key) {
            Some(SettingKind::List)
        } else {
            None
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.kind_of(key).is_some()
    }

    /// Total number of settings across all three maps.
    pub fn len(&self) -> usize {
        self.strings.len() + self.bools.len() + self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide holder of the authoritative `ConfigStore`.
///
/// `replace` is the only mutation point. Callers that want to change settings
/// take a `clone_store`, edit the copy and hand it back through `replace`
/// (the updater serializes that cycle).
#[derive(Debug, Default)]
pub struct EnvStore {
    current: RwLock<Arc<ConfigStore>>,
}

impl EnvStore {
    pub fn new(initial: ConfigStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Shared handle to the current snapshot.
    pub fn snapshot(&self) -> Arc<ConfigStore> {
        // A poisoned lock still guards a fully-formed Arc, swaps are a single
        // pointer store.
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Deep copy of the current snapshot, to be used as a working copy.
    pub fn clone_store(&self) -> ConfigStore {
        self.snapshot().as_ref().clone()
    }

    /// Atomically swap in a new snapshot.
    pub fn replace(&self, next: ConfigStore) {
        let next = Arc::new(next);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn get_string(&self, key: &str) -> String {
        self.snapshot().get_string(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.snapshot().get_bool(key)
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.snapshot().get_list(key)
    }
}
