//! Repository for the `production_tasks` table.

use sqlx::PgPool;
use imprint_core::production::{TaskStatus, TaskType};
use imprint_core::types::DbId;

use crate::models::production_task::{
    CreateProductionTask, MyTask, ProductionTask, TaskAssignee, UpdateProductionTask,
};
use crate::repositories::production_project_repo::open_task_statuses;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, tenant_id, project_id, title, description, task_type, workflow_stage, \
                        status, assignee_contact_id, assignee_user_id, due_date, completed_at, \
                        sort_order, created_by, created_at, updated_at";

/// Same columns qualified with the `t` alias for joins.
const T_COLUMNS: &str = "t.id, t.tenant_id, t.project_id, t.title, t.description, t.task_type, \
                          t.workflow_stage, t.status, t.assignee_contact_id, t.assignee_user_id, \
                          t.due_date, t.completed_at, t.sort_order, t.created_by, t.created_at, \
                          t.updated_at";

/// Restricts a `production_tasks` statement to tasks whose project is live.
const LIVE_PROJECT: &str = "EXISTS (SELECT 1 FROM production_projects p \
                             WHERE p.id = production_tasks.project_id \
                               AND p.tenant_id = production_tasks.tenant_id \
                               AND p.deleted_at IS NULL)";

/// Provides CRUD operations for production tasks. Tasks are addressed by
/// `(project_id, id)` so a task id from another project never resolves.
pub struct ProductionTaskRepo;

impl ProductionTaskRepo {
    pub async fn create(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        created_by: Option<DbId>,
        input: &CreateProductionTask,
    ) -> Result<ProductionTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO production_tasks
                (tenant_id, project_id, title, description, task_type, workflow_stage,
                 due_date, sort_order, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionTask>(&query)
            .bind(tenant_id)
            .bind(project_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.task_type.unwrap_or(TaskType::Other).as_str())
            .bind(input.workflow_stage.map(|s| s.as_str()))
            .bind(input.due_date)
            .bind(input.sort_order.unwrap_or(0))
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<ProductionTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_tasks
             WHERE id = $1 AND project_id = $2 AND tenant_id = $3 AND {LIVE_PROJECT}"
        );
        sqlx::query_as::<_, ProductionTask>(&query)
            .bind(id)
            .bind(project_id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_project(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
    ) -> Result<Vec<ProductionTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_tasks
             WHERE project_id = $1 AND tenant_id = $2
             ORDER BY sort_order ASC, id ASC"
        );
        sqlx::query_as::<_, ProductionTask>(&query)
            .bind(project_id)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// Update a task. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        id: DbId,
        input: &UpdateProductionTask,
    ) -> Result<Option<ProductionTask>, sqlx::Error> {
        let query = format!(
            "UPDATE production_tasks SET
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                task_type = COALESCE($6, task_type),
                workflow_stage = COALESCE($7, workflow_stage),
                due_date = COALESCE($8, due_date),
                sort_order = COALESCE($9, sort_order),
                updated_at = NOW()
             WHERE id = $1 AND project_id = $2 AND tenant_id = $3 AND {LIVE_PROJECT}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionTask>(&query)
            .bind(id)
            .bind(project_id)
            .bind(tenant_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.task_type.map(|t| t.as_str()))
            .bind(input.workflow_stage.map(|s| s.as_str()))
            .bind(input.due_date)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Change status if it still equals `from`. Entering `completed` stamps
    /// `completed_at`; leaving it clears the stamp.
    pub async fn set_status(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        id: DbId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<Option<ProductionTask>, sqlx::Error> {
        let query = format!(
            "UPDATE production_tasks SET
                status = $5,
                completed_at = CASE WHEN $5 = 'completed' THEN NOW() ELSE NULL END,
                updated_at = NOW()
             WHERE id = $1 AND project_id = $2 AND tenant_id = $3 AND status = $4
               AND {LIVE_PROJECT}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionTask>(&query)
            .bind(id)
            .bind(project_id)
            .bind(tenant_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Set (or clear) the assignee.
    pub async fn assign(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        id: DbId,
        assignee: TaskAssignee,
    ) -> Result<Option<ProductionTask>, sqlx::Error> {
        let query = format!(
            "UPDATE production_tasks SET
                assignee_contact_id = $4,
                assignee_user_id = $5,
                updated_at = NOW()
             WHERE id = $1 AND project_id = $2 AND tenant_id = $3 AND {LIVE_PROJECT}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProductionTask>(&query)
            .bind(id)
            .bind(project_id)
            .bind(tenant_id)
            .bind(assignee.contact_id())
            .bind(assignee.user_id())
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a task. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        tenant_id: DbId,
        project_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM production_tasks
             WHERE id = $1 AND project_id = $2 AND tenant_id = $3 AND {LIVE_PROJECT}"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(project_id)
            .bind(tenant_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Open tasks assigned to a user across live projects, soonest due first.
    pub async fn list_open_for_user(
        pool: &PgPool,
        tenant_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<MyTask>, sqlx::Error> {
        let query = format!(
            "SELECT {T_COLUMNS}, p.title AS project_title
             FROM production_tasks t
             JOIN production_projects p ON p.id = t.project_id
             WHERE t.tenant_id = $1
               AND t.assignee_user_id = $2
               AND t.status = ANY($3)
               AND p.deleted_at IS NULL
             ORDER BY t.due_date ASC NULLS LAST, t.id ASC"
        );
        sqlx::query_as::<_, MyTask>(&query)
            .bind(tenant_id)
            .bind(user_id)
            .bind(open_task_statuses())
            .fetch_all(pool)
            .await
    }
}
