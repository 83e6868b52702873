//! Well-known user role names.
//!
//! These must match the `ck_users_role` check constraint in
//! `db/migrations/20260301000002_create_users.sql`.

use crate::error::CoreError;

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_FINANCE: &str = "finance";
pub const ROLE_VIEWER: &str = "viewer";

/// All valid user roles, most privileged first.
pub const VALID_ROLES: &[&str] = &[ROLE_OWNER, ROLE_ADMIN, ROLE_EDITOR, ROLE_FINANCE, ROLE_VIEWER];

/// Validate that `role` is a known user role.
pub fn validate_role(role: &str) -> Result<(), CoreError> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: {VALID_ROLES:?}"
        )))
    }
}

/// Check whether `actor_role` may assign `target_role` to another user.
///
/// Only an owner may hand out (or take away) the owner role.
pub fn can_assign_role(actor_role: &str, target_role: &str) -> bool {
    match actor_role {
        ROLE_OWNER => true,
        ROLE_ADMIN => target_role != ROLE_OWNER,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_roles_are_valid() {
        for role in VALID_ROLES {
            assert!(validate_role(role).is_ok());
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(validate_role("superuser").is_err());
        assert!(validate_role("").is_err());
    }

    #[test]
    fn admin_cannot_grant_owner() {
        assert!(!can_assign_role(ROLE_ADMIN, ROLE_OWNER));
        assert!(can_assign_role(ROLE_ADMIN, ROLE_EDITOR));
        assert!(can_assign_role(ROLE_OWNER, ROLE_OWNER));
    }

    #[test]
    fn non_admins_cannot_assign_roles() {
        assert!(!can_assign_role(ROLE_EDITOR, ROLE_VIEWER));
        assert!(!can_assign_role(ROLE_VIEWER, ROLE_VIEWER));
    }
}
