//! Repository for the `contact_roles` table.

use sqlx::{PgConnection, PgPool};
use imprint_core::contact_roles::ContactRoleKind;
use imprint_core::types::DbId;

use crate::models::contact_role::ContactRole;

const COLUMNS: &str = "id, tenant_id, contact_id, role, role_specific_data, is_active, \
                        created_at, updated_at";

/// Insert a role on an existing connection (used inside transactions).
pub(crate) async fn insert(
    conn: &mut PgConnection,
    tenant_id: DbId,
    contact_id: DbId,
    role: ContactRoleKind,
    data: &serde_json::Value,
) -> Result<ContactRole, sqlx::Error> {
    let query = format!(
        "INSERT INTO contact_roles (tenant_id, contact_id, role, role_specific_data)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, ContactRole>(&query)
        .bind(tenant_id)
        .bind(contact_id)
        .bind(role.as_str())
        .bind(data)
        .fetch_one(conn)
        .await
}

/// Provides CRUD operations for contact roles.
pub struct ContactRoleRepo;

impl ContactRoleRepo {
    /// Attach a role. A duplicate role violates `uq_contact_roles_contact_role`.
    pub async fn create(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
        role: ContactRoleKind,
        data: &serde_json::Value,
    ) -> Result<ContactRole, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        insert(&mut *conn, tenant_id, contact_id, role, data).await
    }

    pub async fn list_for_contact(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
    ) -> Result<Vec<ContactRole>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contact_roles
             WHERE tenant_id = $1 AND contact_id = $2
             ORDER BY role ASC"
        );
        sqlx::query_as::<_, ContactRole>(&query)
            .bind(tenant_id)
            .bind(contact_id)
            .fetch_all(pool)
            .await
    }

    /// Active role names for a batch of contacts, as `(contact_id, role)`.
    pub async fn active_role_names(
        pool: &PgPool,
        tenant_id: DbId,
        contact_ids: &[DbId],
    ) -> Result<Vec<(DbId, String)>, sqlx::Error> {
        if contact_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, (DbId, String)>(
            "SELECT contact_id, role FROM contact_roles
             WHERE tenant_id = $1 AND contact_id = ANY($2) AND is_active = true
             ORDER BY contact_id, role",
        )
        .bind(tenant_id)
        .bind(contact_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
        role: ContactRoleKind,
    ) -> Result<Option<ContactRole>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contact_roles
             WHERE tenant_id = $1 AND contact_id = $2 AND role = $3"
        );
        sqlx::query_as::<_, ContactRole>(&query)
            .bind(tenant_id)
            .bind(contact_id)
            .bind(role.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Replace a role's data and optionally toggle it.
    pub async fn update(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
        role: ContactRoleKind,
        data: &serde_json::Value,
        is_active: Option<bool>,
    ) -> Result<Option<ContactRole>, sqlx::Error> {
        let query = format!(
            "UPDATE contact_roles SET
                role_specific_data = $4,
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
             WHERE tenant_id = $1 AND contact_id = $2 AND role = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContactRole>(&query)
            .bind(tenant_id)
            .bind(contact_id)
            .bind(role.as_str())
            .bind(data)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }

    /// Detach a role. Returns `true` if a row was deleted.
    pub async fn delete(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
        role: ContactRoleKind,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM contact_roles WHERE tenant_id = $1 AND contact_id = $2 AND role = $3",
        )
        .bind(tenant_id)
        .bind(contact_id)
        .bind(role.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether a live contact holds any of `roles` (active).
    pub async fn has_any_role(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
        roles: &[ContactRoleKind],
    ) -> Result<bool, sqlx::Error> {
        let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM contact_roles r
                JOIN contacts c ON c.id = r.contact_id
                WHERE r.tenant_id = $1
                  AND r.contact_id = $2
                  AND r.role = ANY($3)
                  AND r.is_active = true
                  AND c.deleted_at IS NULL
             )",
        )
        .bind(tenant_id)
        .bind(contact_id)
        .bind(&names)
        .fetch_one(pool)
        .await
    }
}
