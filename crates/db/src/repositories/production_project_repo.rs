//! Repository for the `production_projects` table.

use sqlx::PgPool;
use imprint_core::production::{ProjectStatus, StageMove, TaskStatus, WorkflowStage};
use imprint_core::types::DbId;

use crate::models::production_project::{
    BoardCard, CreateProductionProject, ProductionProject, ProjectListParams,
    UpdateProductionProject,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, tenant_id, title, subtitle, description, isbn, author_contact_id, \
                        status, workflow_stage, manuscript_storage_key, manuscript_file_name, \
                        manuscript_uploaded_at, target_publish_date, due_date, created_by, \
                        created_at, updated_at";

/// Task statuses counted as open on board cards.
pub(crate) fn open_task_statuses() -> Vec<&'static str> {
    TaskStatus::ALL
        .iter()
        .filter(|s| s.is_open())
        .map(|s| s.as_str())
        .collect()
}

/// Provides CRUD, workflow and board queries for production projects.
pub struct ProductionProjectRepo;

impl ProductionProjectRepo {
    /// Insert a new project as `draft` in `manuscript_received`.
    pub async fn create(
        pool: &PgPool,
        tenant_id: DbId,
        created_by: Option<DbId>,
        input: &CreateProductionProject,
    ) -> Result<ProductionProject, sqlx::Error> {
        let query = format!(
            "INSERT INTO production_projects
                (tenant_id, title, subtitle, description, isbn, author_contact_id,
                 target_publish_date, due_date, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionProject>(&query)
            .bind(tenant_id)
            .bind(&input.title)
            .bind(&input.subtitle)
            .bind(&input.description)
            .bind(&input.isbn)
            .bind(input.author_contact_id)
            .bind(input.target_publish_date)
            .bind(input.due_date)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<ProductionProject>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_projects
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, ProductionProject>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        tenant_id: DbId,
        params: &ProjectListParams,
    ) -> Result<Vec<ProductionProject>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_projects
             WHERE tenant_id = $1
               AND deleted_at IS NULL
               AND ($2::TEXT IS NULL OR status = $2)
               AND ($3::TEXT IS NULL OR workflow_stage = $3)
               AND ($4::BIGINT IS NULL OR author_contact_id = $4)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ProductionProject>(&query)
            .bind(tenant_id)
            .bind(params.status.map(|s| s.as_str()))
            .bind(params.stage.map(|s| s.as_str()))
            .bind(params.author_contact_id)
            .fetch_all(pool)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        input: &UpdateProductionProject,
    ) -> Result<Option<ProductionProject>, sqlx::Error> {
        let query = format!(
            "UPDATE production_projects SET
                title = COALESCE($3, title),
                subtitle = COALESCE($4, subtitle),
                description = COALESCE($5, description),
                isbn = COALESCE($6, isbn),
                author_contact_id = COALESCE($7, author_contact_id),
                target_publish_date = COALESCE($8, target_publish_date),
                due_date = COALESCE($9, due_date),
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionProject>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(&input.title)
            .bind(&input.subtitle)
            .bind(&input.description)
            .bind(&input.isbn)
            .bind(input.author_contact_id)
            .bind(input.target_publish_date)
            .bind(input.due_date)
            .fetch_optional(pool)
            .await
    }

    /// Change status if it still equals `from`. Returns `None` when the row
    /// is gone or was changed concurrently.
    pub async fn set_status(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        from: ProjectStatus,
        to: ProjectStatus,
    ) -> Result<Option<ProductionProject>, sqlx::Error> {
        let query = format!(
            "UPDATE production_projects SET status = $4, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL AND status = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionProject>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Apply a validated board move if the project is still where it was
    /// when the move was planned.
    pub async fn apply_stage_move(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        from_status: ProjectStatus,
        from_stage: WorkflowStage,
        stage_move: &StageMove,
    ) -> Result<Option<ProductionProject>, sqlx::Error> {
        let query = format!(
            "UPDATE production_projects SET
                workflow_stage = $5,
                status = COALESCE($6, status),
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
               AND status = $3 AND workflow_stage = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionProject>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(from_status.as_str())
            .bind(from_stage.as_str())
            .bind(stage_move.to_stage.as_str())
            .bind(stage_move.new_status.map(|s| s.as_str()))
            .fetch_optional(pool)
            .await
    }

    /// Record an uploaded manuscript.
    pub async fn set_manuscript(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        storage_key: &str,
        file_name: &str,
    ) -> Result<Option<ProductionProject>, sqlx::Error> {
        let query = format!(
            "UPDATE production_projects SET
                manuscript_storage_key = $3,
                manuscript_file_name = $4,
                manuscript_uploaded_at = NOW(),
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionProject>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(storage_key)
            .bind(file_name)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a project. Returns `true` if the row was marked.
    pub async fn soft_delete(pool: &PgPool, tenant_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE production_projects SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Board cards for every live, non-cancelled project, ordered by due
    /// date (undated last) then id.
    pub async fn board_cards(pool: &PgPool, tenant_id: DbId) -> Result<Vec<BoardCard>, sqlx::Error> {
        sqlx::query_as::<_, BoardCard>(
            "SELECT p.id, p.title, p.status, p.workflow_stage, p.due_date, p.author_contact_id,
                    COALESCE(NULLIF(CONCAT_WS(' ', c.first_name, c.last_name), ''),
                             c.company_name) AS author_name,
                    (SELECT COUNT(*) FROM production_tasks t
                      WHERE t.project_id = p.id AND t.status = ANY($3))::BIGINT AS open_task_count
             FROM production_projects p
             LEFT JOIN contacts c ON c.id = p.author_contact_id
             WHERE p.tenant_id = $1
               AND p.deleted_at IS NULL
               AND p.status <> $2
             ORDER BY p.due_date ASC NULLS LAST, p.id ASC",
        )
        .bind(tenant_id)
        .bind(ProjectStatus::Cancelled.as_str())
        .bind(open_task_statuses())
        .fetch_all(pool)
        .await
    }
}
