//! Repository for the `contacts` table.

use sqlx::PgPool;
use imprint_core::contact_roles::ContactRoleKind;
use imprint_core::production::ProjectStatus;
use imprint_core::types::DbId;

use crate::models::contact::{
    Contact, ContactListParams, ContactReferences, CreateContact, UpdateContact,
};
use crate::models::contact_role::ContactRole;
use crate::repositories::{contact_role_repo, like_pattern, page};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, tenant_id, first_name, last_name, company_name, email, phone, \
                        address_line1, address_line2, city, region, postal_code, country, \
                        notes, is_active, created_by, created_at, updated_at";

/// Provides CRUD operations for contacts. Deleted contacts are hidden from
/// every read.
pub struct ContactRepo;

impl ContactRepo {
    /// Insert a contact and its validated roles in one transaction.
    pub async fn create(
        pool: &PgPool,
        tenant_id: DbId,
        created_by: Option<DbId>,
        input: &CreateContact,
        roles: &[(ContactRoleKind, serde_json::Value)],
    ) -> Result<(Contact, Vec<ContactRole>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO contacts
                (tenant_id, first_name, last_name, company_name, email, phone,
                 address_line1, address_line2, city, region, postal_code, country,
                 notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        );
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(tenant_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.company_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address_line1)
            .bind(&input.address_line2)
            .bind(&input.city)
            .bind(&input.region)
            .bind(&input.postal_code)
            .bind(&input.country)
            .bind(&input.notes)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        let mut created_roles = Vec::with_capacity(roles.len());
        for (role, data) in roles {
            let row = contact_role_repo::insert(&mut *tx, tenant_id, contact.id, *role, data).await?;
            created_roles.push(row);
        }

        tx.commit().await?;
        Ok((contact, created_roles))
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contacts
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// List contacts with optional role filter and free-text search over
    /// names, company and email.
    pub async fn list(
        pool: &PgPool,
        tenant_id: DbId,
        params: &ContactListParams,
    ) -> Result<Vec<Contact>, sqlx::Error> {
        let (limit, offset) = page(params.limit, params.offset);
        let query = format!(
            "SELECT {COLUMNS} FROM contacts
             WHERE tenant_id = $1
               AND deleted_at IS NULL
               AND ($2 OR is_active = true)
               AND ($3::TEXT IS NULL OR EXISTS (
                    SELECT 1 FROM contact_roles r
                    WHERE r.contact_id = contacts.id AND r.role = $3 AND r.is_active = true))
               AND ($4::TEXT IS NULL
                    OR first_name ILIKE $4
                    OR last_name ILIKE $4
                    OR company_name ILIKE $4
                    OR email ILIKE $4
                    OR CONCAT_WS(' ', first_name, last_name) ILIKE $4)
             ORDER BY COALESCE(last_name, company_name, first_name) ASC, id ASC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(tenant_id)
            .bind(params.include_inactive)
            .bind(params.role.map(|r| r.as_str()))
            .bind(like_pattern(params.search.as_deref()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update a contact. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        input: &UpdateContact,
    ) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!(
            "UPDATE contacts SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                company_name = COALESCE($5, company_name),
                email = COALESCE($6, email),
                phone = COALESCE($7, phone),
                address_line1 = COALESCE($8, address_line1),
                address_line2 = COALESCE($9, address_line2),
                city = COALESCE($10, city),
                region = COALESCE($11, region),
                postal_code = COALESCE($12, postal_code),
                country = COALESCE($13, country),
                notes = COALESCE($14, notes),
                is_active = COALESCE($15, is_active),
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.company_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address_line1)
            .bind(&input.address_line2)
            .bind(&input.city)
            .bind(&input.region)
            .bind(&input.postal_code)
            .bind(&input.country)
            .bind(&input.notes)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Count the rows that block deleting a contact.
    pub async fn references(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<ContactReferences, sqlx::Error> {
        let active: Vec<&str> = ProjectStatus::ALL
            .iter()
            .filter(|s| s.is_movable())
            .map(|s| s.as_str())
            .collect();
        sqlx::query_as::<_, ContactReferences>(
            "SELECT
                (SELECT COUNT(*) FROM production_projects
                  WHERE tenant_id = $1 AND author_contact_id = $2
                    AND deleted_at IS NULL AND status = ANY($3))::BIGINT AS active_projects,
                (SELECT COUNT(*) FROM invoices
                  WHERE tenant_id = $1 AND customer_contact_id = $2
                    AND status <> 'void')::BIGINT AS open_invoices",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&active)
        .fetch_one(pool)
        .await
    }

    /// Soft-delete a contact. Returns `true` if the row was marked.
    pub async fn soft_delete(pool: &PgPool, tenant_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE contacts SET deleted_at = NOW(), is_active = false, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
