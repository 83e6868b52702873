//! Contact entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use imprint_core::contact_roles::ContactRoleKind;
use imprint_core::types::{DbId, Timestamp};

use crate::models::contact_role::{ContactRole, CreateContactRole};
use crate::models::tax_info::TaxInfoSummary;

/// A contact row from the `contacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contact {
    pub id: DbId,
    pub tenant_id: DbId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contact {
    /// Name used in emails and listings: "First Last", falling back to the
    /// company name.
    pub fn display_name(&self) -> String {
        let person = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if person.is_empty() {
            self.company_name.clone().unwrap_or_default()
        } else {
            person
        }
    }

    /// True when at least one of first/last/company name is non-blank.
    pub fn has_name(first: Option<&str>, last: Option<&str>, company: Option<&str>) -> bool {
        [first, last, company]
            .into_iter()
            .flatten()
            .any(|s| !s.trim().is_empty())
    }
}

/// Contact with its roles and masked tax information.
#[derive(Debug, Clone, Serialize)]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: Contact,
    pub roles: Vec<ContactRole>,
    pub tax_info: Option<TaxInfoSummary>,
}

/// Contact row in list responses, with the names of its active roles.
#[derive(Debug, Clone, Serialize)]
pub struct ContactListItem {
    #[serde(flatten)]
    pub contact: Contact,
    pub roles: Vec<String>,
}

/// DTO for creating a contact together with its initial roles.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContact {
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub last_name: Option<String>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub company_name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub address_line1: Option<String>,
    #[validate(length(max = 200))]
    pub address_line2: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 10_000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub roles: Vec<CreateContactRole>,
}

/// DTO for updating an existing contact. All fields are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateContact {
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub last_name: Option<String>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub company_name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub address_line1: Option<String>,
    #[validate(length(max = 200))]
    pub address_line2: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 10_000))]
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for listing contacts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactListParams {
    pub role: Option<ContactRoleKind>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Rows that keep a contact from being deleted.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ContactReferences {
    /// Draft or in-progress projects naming the contact as author.
    pub active_projects: i64,
    /// Invoices billed to the contact that are not void.
    pub open_invoices: i64,
}

impl ContactReferences {
    pub fn is_referenced(&self) -> bool {
        self.active_projects > 0 || self.open_invoices > 0
    }
}
