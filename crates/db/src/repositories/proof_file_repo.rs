//! Repository for the `proof_files` table.

use sqlx::PgPool;
use imprint_core::production::ProofStatus;
use imprint_core::types::DbId;

use crate::models::proof_file::{NewProofFile, ProofFile};

const COLUMNS: &str = "id, tenant_id, project_id, version, file_name, storage_key, content_type, \
                        size_bytes, status, notes, review_notes, uploaded_by, reviewed_by, \
                        reviewed_at, created_at";

/// Restricts a `proof_files` statement to proofs whose project is live.
const LIVE_PROJECT: &str = "EXISTS (SELECT 1 FROM production_projects p \
                             WHERE p.id = proof_files.project_id \
                               AND p.tenant_id = proof_files.tenant_id \
                               AND p.deleted_at IS NULL)";

/// Provides versioned proof storage.
pub struct ProofFileRepo;

impl ProofFileRepo {
    /// Insert the next proof version for a project.
    ///
    /// The project row is locked for the duration of the transaction so
    /// concurrent uploads are numbered one after another; the unique
    /// `(project_id, version)` constraint backs this up. `build` receives the
    /// assigned version and returns the row to insert. Fails with
    /// [`sqlx::Error::RowNotFound`] if the project does not exist.
    pub async fn create_next_version<F>(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        build: F,
    ) -> Result<ProofFile, sqlx::Error>
    where
        F: FnOnce(i32) -> NewProofFile,
    {
        let mut tx = pool.begin().await?;

        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM production_projects
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
             FOR UPDATE",
        )
        .bind(project_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        let version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM proof_files WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&mut *tx)
        .await?;

        let input = build(version);
        let query = format!(
            "INSERT INTO proof_files
                (tenant_id, project_id, version, file_name, storage_key, content_type,
                 size_bytes, notes, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let proof = sqlx::query_as::<_, ProofFile>(&query)
            .bind(tenant_id)
            .bind(project_id)
            .bind(version)
            .bind(&input.file_name)
            .bind(&input.storage_key)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(&input.notes)
            .bind(input.uploaded_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(proof)
    }

    /// All versions for a project, newest first.
    pub async fn list_for_project(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
    ) -> Result<Vec<ProofFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM proof_files
             WHERE project_id = $1 AND tenant_id = $2
             ORDER BY version DESC"
        );
        sqlx::query_as::<_, ProofFile>(&query)
            .bind(project_id)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<ProofFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM proof_files
             WHERE id = $1 AND project_id = $2 AND tenant_id = $3 AND {LIVE_PROJECT}"
        );
        sqlx::query_as::<_, ProofFile>(&query)
            .bind(id)
            .bind(project_id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// Record a review decision on a proof that is still pending. Returns
    /// `None` if the proof was already reviewed.
    pub async fn review(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        id: DbId,
        decision: ProofStatus,
        review_notes: Option<&str>,
        reviewed_by: DbId,
    ) -> Result<Option<ProofFile>, sqlx::Error> {
        let query = format!(
            "UPDATE proof_files SET
                status = $4,
                review_notes = $5,
                reviewed_by = $6,
                reviewed_at = NOW()
             WHERE id = $1 AND project_id = $2 AND tenant_id = $3
               AND status = $7 AND {LIVE_PROJECT}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProofFile>(&query)
            .bind(id)
            .bind(project_id)
            .bind(tenant_id)
            .bind(decision.as_str())
            .bind(review_notes)
            .bind(reviewed_by)
            .bind(ProofStatus::PendingReview.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Remove a proof row whose file could not be stored.
    pub async fn delete(pool: &PgPool, tenant_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM proof_files WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
