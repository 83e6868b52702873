//! Permission table mapping user roles to the actions they may perform.
//!
//! Every handler names the [`Permission`] it needs and checks it against the
//! caller's role before touching the database.

use std::fmt;

use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, ROLE_EDITOR, ROLE_FINANCE, ROLE_OWNER, ROLE_VIEWER};

/// A single grantable capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ContactsRead,
    ContactsWrite,
    ContactsDelete,
    TaxInfoManage,
    ProductionRead,
    ProductionWrite,
    ProductionDelete,
    ProofsReview,
    InvoicesRead,
    InvoicesWrite,
    InvoicesVoid,
    UsersManage,
    AuditRead,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContactsRead => "contacts.read",
            Self::ContactsWrite => "contacts.write",
            Self::ContactsDelete => "contacts.delete",
            Self::TaxInfoManage => "tax_info.manage",
            Self::ProductionRead => "production.read",
            Self::ProductionWrite => "production.write",
            Self::ProductionDelete => "production.delete",
            Self::ProofsReview => "proofs.review",
            Self::InvoicesRead => "invoices.read",
            Self::InvoicesWrite => "invoices.write",
            Self::InvoicesVoid => "invoices.void",
            Self::UsersManage => "users.manage",
            Self::AuditRead => "audit.read",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use Permission::*;

const EDITOR_PERMISSIONS: &[Permission] = &[
    ContactsRead,
    ContactsWrite,
    ProductionRead,
    ProductionWrite,
    ProofsReview,
    InvoicesRead,
];

const FINANCE_PERMISSIONS: &[Permission] = &[
    ContactsRead,
    ContactsWrite,
    TaxInfoManage,
    ProductionRead,
    InvoicesRead,
    InvoicesWrite,
    InvoicesVoid,
];

const VIEWER_PERMISSIONS: &[Permission] = &[ContactsRead, ProductionRead, InvoicesRead];

/// Returns the permissions granted to `role`. Unknown roles get nothing.
pub fn permissions_for(role: &str) -> &'static [Permission] {
    const ALL: &[Permission] = &[
        ContactsRead,
        ContactsWrite,
        ContactsDelete,
        TaxInfoManage,
        ProductionRead,
        ProductionWrite,
        ProductionDelete,
        ProofsReview,
        InvoicesRead,
        InvoicesWrite,
        InvoicesVoid,
        UsersManage,
        AuditRead,
    ];

    match role {
        ROLE_OWNER | ROLE_ADMIN => ALL,
        ROLE_EDITOR => EDITOR_PERMISSIONS,
        ROLE_FINANCE => FINANCE_PERMISSIONS,
        ROLE_VIEWER => VIEWER_PERMISSIONS,
        _ => &[],
    }
}

pub fn has_permission(role: &str, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// Fail with [`CoreError::Forbidden`] unless `role` holds `permission`.
pub fn require(role: &str, permission: Permission) -> Result<(), CoreError> {
    if has_permission(role, permission) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "Role '{role}' lacks permission '{permission}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn owner_and_admin_hold_everything() {
        for p in permissions_for(ROLE_OWNER) {
            assert!(has_permission(ROLE_ADMIN, *p));
        }
        assert!(has_permission(ROLE_OWNER, UsersManage));
        assert!(has_permission(ROLE_ADMIN, AuditRead));
    }

    #[test]
    fn editor_runs_production_but_not_money() {
        assert!(has_permission(ROLE_EDITOR, ProductionWrite));
        assert!(has_permission(ROLE_EDITOR, ProofsReview));
        assert!(!has_permission(ROLE_EDITOR, InvoicesWrite));
        assert!(!has_permission(ROLE_EDITOR, TaxInfoManage));
        assert!(!has_permission(ROLE_EDITOR, ProductionDelete));
    }

    #[test]
    fn finance_handles_invoices_and_tax_info() {
        assert!(has_permission(ROLE_FINANCE, InvoicesWrite));
        assert!(has_permission(ROLE_FINANCE, InvoicesVoid));
        assert!(has_permission(ROLE_FINANCE, TaxInfoManage));
        assert!(!has_permission(ROLE_FINANCE, ProductionWrite));
    }

    #[test]
    fn viewer_is_read_only() {
        for p in permissions_for(ROLE_VIEWER) {
            assert!(p.as_str().ends_with(".read"), "{p} is not a read permission");
        }
    }

    #[test]
    fn unknown_role_is_forbidden() {
        assert_matches!(require("intern", ContactsRead), Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn require_message_names_permission() {
        let err = require(ROLE_VIEWER, ContactsDelete).unwrap_err();
        assert!(err.to_string().contains("contacts.delete"));
    }
}
