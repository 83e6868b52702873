//! Repository for the `audit_logs` table.

use sqlx::PgPool;
use imprint_core::types::DbId;

use crate::models::audit::{AuditLog, AuditQuery, CreateAuditLog};
use crate::repositories::page;

const COLUMNS: &str = "id, tenant_id, user_id, action_type, entity_type, entity_id, \
                        details_json, created_at";

/// Append and query audit entries. There is no update or delete.
pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn create(pool: &PgPool, input: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs
                (tenant_id, user_id, action_type, entity_type, entity_id, details_json)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(input.tenant_id)
            .bind(input.user_id)
            .bind(&input.action_type)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.details_json)
            .fetch_one(pool)
            .await
    }

    /// Query a tenant's audit log with optional filters, newest first.
    pub async fn query(
        pool: &PgPool,
        tenant_id: DbId,
        params: &AuditQuery,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let (limit, offset) = page(params.limit, params.offset);
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs
             WHERE tenant_id = $1
               AND ($2::BIGINT IS NULL OR user_id = $2)
               AND ($3::TEXT IS NULL OR action_type = $3)
               AND ($4::TEXT IS NULL OR entity_type = $4)
               AND ($5::BIGINT IS NULL OR entity_id = $5)
             ORDER BY created_at DESC, id DESC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(tenant_id)
            .bind(params.user_id)
            .bind(&params.action_type)
            .bind(&params.entity_type)
            .bind(params.entity_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
