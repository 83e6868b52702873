//! Contact role model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use imprint_core::contact_roles::ContactRoleKind;
use imprint_core::types::{DbId, Timestamp};

/// A row from `contact_roles`. `role_specific_data` has already passed the
/// per-role schema check on the way in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactRole {
    pub id: DbId,
    pub tenant_id: DbId,
    pub contact_id: DbId,
    #[sqlx(try_from = "String")]
    pub role: ContactRoleKind,
    pub role_specific_data: serde_json::Value,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for attaching a role to a contact.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContactRole {
    pub role: ContactRoleKind,
    pub role_specific_data: Option<serde_json::Value>,
}

/// DTO for patching a role. Keys set to `null` in `role_specific_data` are
/// removed.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContactRole {
    pub role_specific_data: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}
