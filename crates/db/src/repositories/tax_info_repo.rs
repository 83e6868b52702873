//! Repository for the `contact_tax_info` table.

use sqlx::PgPool;
use imprint_core::types::DbId;

use crate::models::tax_info::{ContactTaxInfo, UpsertTaxInfo};

const COLUMNS: &str = "id, tenant_id, contact_id, tax_id_type, ciphertext, nonce, last_four, \
                        created_at, updated_at";

/// Stores one encrypted tax identifier per contact.
pub struct TaxInfoRepo;

impl TaxInfoRepo {
    pub async fn find_for_contact(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
    ) -> Result<Option<ContactTaxInfo>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contact_tax_info WHERE tenant_id = $1 AND contact_id = $2"
        );
        sqlx::query_as::<_, ContactTaxInfo>(&query)
            .bind(tenant_id)
            .bind(contact_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the tax identifier for a contact.
    pub async fn upsert(
        pool: &PgPool,
        tenant_id: DbId,
        contact_id: DbId,
        input: &UpsertTaxInfo,
    ) -> Result<ContactTaxInfo, sqlx::Error> {
        let query = format!(
            "INSERT INTO contact_tax_info
                (tenant_id, contact_id, tax_id_type, ciphertext, nonce, last_four)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT ON CONSTRAINT uq_contact_tax_info_contact DO UPDATE SET
                tax_id_type = EXCLUDED.tax_id_type,
                ciphertext = EXCLUDED.ciphertext,
                nonce = EXCLUDED.nonce,
                last_four = EXCLUDED.last_four,
                updated_at = NOW()
             WHERE contact_tax_info.tenant_id = EXCLUDED.tenant_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContactTaxInfo>(&query)
            .bind(tenant_id)
            .bind(contact_id)
            .bind(input.tax_id_type.as_str())
            .bind(&input.ciphertext)
            .bind(&input.nonce)
            .bind(&input.last_four)
            .fetch_one(pool)
            .await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, tenant_id: DbId, contact_id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM contact_tax_info WHERE tenant_id = $1 AND contact_id = $2")
                .bind(tenant_id)
                .bind(contact_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
