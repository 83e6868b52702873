//! Tenant entity model.

use serde::Serialize;
use sqlx::FromRow;
use imprint_core::types::{DbId, Timestamp};

/// A publishing house using the system. Every other row belongs to one.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tenant {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert data for a new tenant.
#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
}
