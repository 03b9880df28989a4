//! Cross-field rules applied to a candidate store before it is committed.
//!
//! Rules run in a fixed order: derived SMTP flags (never fails), default-role
//! containment, protected-role exclusivity. The first failure aborts the
//! update; the candidate is a private copy so nothing needs undoing.

use tracing::debug;

use crate::constants::{
    DISABLE_EMAIL_VERIFICATION, DISABLE_MAGIC_LINK_LOGIN, SENDER_EMAIL, SMTP_HOST, SMTP_PASSWORD, SMTP_PORT,
    SMTP_USERNAME,
};
use crate::store::ConfigStore;
use crate::utils::{string_slice_contains, EnvError, EnvResult};

/// Role lists carried by the request, validated structurally rather than
/// just by type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleFields {
    pub roles: Vec<String>,
    pub default_roles: Vec<String>,
    pub protected_roles: Vec<String>,
}

impl RoleFields {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.default_roles.is_empty() && self.protected_roles.is_empty()
    }
}

/// SMTP counts as incomplete when host, username or password is empty, or
/// when sender email and port are both empty.
///
/// This is the literal `a || b || c || d && e` reading: a set sender email
/// with an empty port is *not* incomplete on its own.
pub fn smtp_incomplete(store: &ConfigStore) -> bool {
    let empty = |key: &str| store.strings.get(key).map_or(true, String::is_empty);
    empty(SMTP_HOST)
        || empty(SMTP_USERNAME)
        || empty(SMTP_PASSWORD)
        || (empty(SENDER_EMAIL) && empty(SMTP_PORT))
}

/// Force email verification and magic-link login off while SMTP cannot send
/// mail. Only ever sets the flags to true.
pub fn apply_derived_flags(candidate: &mut ConfigStore) {
    if !smtp_incomplete(candidate) {
        return;
    }
    for flag in [DISABLE_EMAIL_VERIFICATION, DISABLE_MAGIC_LINK_LOGIN] {
        if !candidate.get_bool(flag) {
            debug!(flag, "SMTP incomplete, forcing flag on");
            candidate.set_bool(flag, true);
        }
    }
}

/// Every default role must be a declared role (checked when both lists are
/// non-empty).
pub fn check_role_containment(fields: &RoleFields) -> EnvResult<()> {
    if fields.roles.is_empty() || fields.default_roles.is_empty() {
        return Ok(());
    }
    match fields
        .default_roles
        .iter()
        .find(|role| !string_slice_contains(&fields.roles, role))
    {
        Some(role) => Err(EnvError::RoleNotInRoleSet(role.clone())),
        None => Ok(()),
    }
}

/// No protected role may also be a regular or default role.
pub fn check_protected_roles(fields: &RoleFields) -> EnvResult<()> {
    match fields.protected_roles.iter().find(|role| {
        string_slice_contains(&fields.roles, role) || string_slice_contains(&fields.default_roles, role)
    }) {
        Some(role) => Err(EnvError::ProtectedRoleConflict(role.clone())),
        None => Ok(()),
    }
}

/// Run every rule against `candidate` in order.
pub fn validate(candidate: &mut ConfigStore, fields: &RoleFields) -> EnvResult<()> {
    apply_derived_flags(candidate);
    check_role_containment(fields)?;
    check_protected_roles(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_store(host: &str, user: &str, pass: &str, sender: &str, port: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store.set_string(SMTP_HOST, host);
        store.set_string(SMTP_USERNAME, user);
        store.set_string(SMTP_PASSWORD, pass);
        store.set_string(SENDER_EMAIL, sender);
        store.set_string(SMTP_PORT, port);
        store.set_bool(DISABLE_EMAIL_VERIFICATION, false);
        store.set_bool(DISABLE_MAGIC_LINK_LOGIN, false);
        store
    }

    fn roles(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_complete_smtp_leaves_flags() {
        let mut store = smtp_store("smtp.x", "u", "p", "a@x", "587");
        apply_derived_flags(&mut store);
        assert!(!store.get_bool(DISABLE_EMAIL_VERIFICATION));
        assert!(!store.get_bool(DISABLE_MAGIC_LINK_LOGIN));
    }

    #[test]
    fn test_missing_host_forces_flags() {
        let mut store = smtp_store("", "u", "p", "a@x", "587");
        apply_derived_flags(&mut store);
        assert!(store.get_bool(DISABLE_EMAIL_VERIFICATION));
        assert!(store.get_bool(DISABLE_MAGIC_LINK_LOGIN));
    }

    #[test]
    fn test_empty_port_with_sender_is_complete() {
        let store = smtp_store("smtp.x", "u", "p", "a@x", "");
        assert!(!smtp_incomplete(&store));
    }

    #[test]
    fn test_empty_port_and_sender_is_incomplete() {
        let store = smtp_store("smtp.x", "u", "p", "", "");
        assert!(smtp_incomplete(&store));
    }

    #[test]
    fn test_empty_sender_with_port_is_complete() {
        let store = smtp_store("smtp.x", "u", "p", "", "587");
        assert!(!smtp_incomplete(&store));
    }

    #[test]
    fn test_unset_keys_count_as_empty() {
        assert!(smtp_incomplete(&ConfigStore::new()));
    }

    #[test]
    fn test_flags_are_a_ratchet() {
        let mut store = smtp_store("smtp.x", "u", "p", "a@x", "587");
        store.set_bool(DISABLE_EMAIL_VERIFICATION, true);
        apply_derived_flags(&mut store);
        // complete SMTP never turns a flag back off
        assert!(store.get_bool(DISABLE_EMAIL_VERIFICATION));
        assert!(!store.get_bool(DISABLE_MAGIC_LINK_LOGIN));
    }

    #[test]
    fn test_default_roles_subset() {
        let fields = RoleFields {
            roles: roles(&["admin", "user"]),
            default_roles: roles(&["user"]),
            protected_roles: vec![],
        };
        assert!(check_role_containment(&fields).is_ok());
        assert!(check_protected_roles(&fields).is_ok());
    }

    #[test]
    fn test_default_role_outside_roles() {
        let fields = RoleFields {
            roles: roles(&["admin", "user"]),
            default_roles: roles(&["user", "editor", "viewer"]),
            protected_roles: vec![],
        };
        let err = check_role_containment(&fields).unwrap_err();
        assert!(matches!(err, EnvError::RoleNotInRoleSet(ref r) if r == "editor"));
    }

    #[test]
    fn test_containment_skipped_without_roles() {
        let fields = RoleFields {
            roles: vec![],
            default_roles: roles(&["user"]),
            protected_roles: vec![],
        };
        assert!(check_role_containment(&fields).is_ok());
    }

    #[test]
    fn test_protected_role_absent() {
        let fields = RoleFields {
            roles: roles(&["admin", "user"]),
            default_roles: roles(&["user"]),
            protected_roles: roles(&["root"]),
        };
        assert!(check_protected_roles(&fields).is_ok());
    }

    #[test]
    fn test_protected_role_in_roles() {
        let fields = RoleFields {
            roles: roles(&["admin", "user"]),
            default_roles: roles(&["user"]),
            protected_roles: roles(&["user"]),
        };
        let err = check_protected_roles(&fields).unwrap_err();
        assert!(matches!(err, EnvError::ProtectedRoleConflict(ref r) if r == "user"));
    }

    #[test]
    fn test_protected_role_in_default_roles_only() {
        let fields = RoleFields {
            roles: vec![],
            default_roles: roles(&["guest"]),
            protected_roles: roles(&["guest"]),
        };
        assert!(matches!(
            check_protected_roles(&fields),
            Err(EnvError::ProtectedRoleConflict(_))
        ));
    }

    #[test]
    fn test_containment_checked_before_protection() {
        let mut store = smtp_store("smtp.x", "u", "p", "a@x", "587");
        let fields = RoleFields {
            roles: roles(&["user"]),
            default_roles: roles(&["editor"]),
            protected_roles: roles(&["user"]),
        };
        let err = validate(&mut store, &fields).unwrap_err();
        assert!(matches!(err, EnvError::RoleNotInRoleSet(_)));
    }

    #[test]
    fn test_flags_applied_even_when_roles_fail() {
        let mut store = smtp_store("", "", "", "", "");
        let fields = RoleFields {
            roles: roles(&["user"]),
            default_roles: roles(&["editor"]),
            protected_roles: vec![],
        };
        assert!(validate(&mut store, &fields).is_err());
        // the candidate is discarded by the caller, but the rule order holds
        assert!(store.get_bool(DISABLE_EMAIL_VERIFICATION));
    }
}
