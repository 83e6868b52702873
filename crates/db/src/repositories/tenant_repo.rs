//! Repository for the `tenants` table.

use sqlx::PgPool;
use imprint_core::types::DbId;

use crate::models::tenant::{CreateTenant, Tenant};
use crate::models::user::{CreateUser, User};
use crate::repositories::user_repo;

const COLUMNS: &str = "id, name, slug, created_at, updated_at";

pub struct TenantRepo;

impl TenantRepo {
    /// Create a tenant and its first (owner) user in one transaction.
    pub async fn create_with_owner(
        pool: &PgPool,
        tenant: &CreateTenant,
        owner: &CreateUser,
    ) -> Result<(Tenant, User), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO tenants (name, slug) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let tenant = sqlx::query_as::<_, Tenant>(&query)
            .bind(&tenant.name)
            .bind(&tenant.slug)
            .fetch_one(&mut *tx)
            .await?;

        let user = user_repo::insert(&mut *tx, tenant.id, owner).await?;

        tx.commit().await?;
        Ok((tenant, user))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Tenant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tenants WHERE id = $1");
        sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
