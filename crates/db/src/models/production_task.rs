//! Production task model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use imprint_core::production::{TaskStatus, TaskType, WorkflowStage};
use imprint_core::types::{Date, DbId, Timestamp};

/// A row from `production_tasks`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductionTask {
    pub id: DbId,
    pub tenant_id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub task_type: TaskType,
    pub workflow_stage: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub assignee_contact_id: Option<DbId>,
    pub assignee_user_id: Option<DbId>,
    pub due_date: Option<Date>,
    pub completed_at: Option<Timestamp>,
    pub sort_order: i32,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A task assigned to the current user, with its project title.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MyTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: ProductionTask,
    pub project_title: String,
}

/// DTO for creating a task under a project.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductionTask {
    #[validate(length(min = 1, max = 300, message = "must be 1-300 characters"))]
    pub title: String,
    #[validate(length(max = 10_000))]
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub workflow_stage: Option<WorkflowStage>,
    pub due_date: Option<Date>,
    pub sort_order: Option<i32>,
}

/// DTO for updating a task. Status and assignee have their own endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProductionTask {
    #[validate(length(min = 1, max = 300, message = "must be 1-300 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 10_000))]
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub workflow_stage: Option<WorkflowStage>,
    pub due_date: Option<Date>,
    pub sort_order: Option<i32>,
}

/// Request body for a task status transition.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionTaskStatus {
    pub status: TaskStatus,
}

/// Request body for assigning a task. At most one of the two ids may be set;
/// both absent clears the assignment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignTask {
    pub contact_id: Option<DbId>,
    pub user_id: Option<DbId>,
}

/// Resolved assignee written to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAssignee {
    Contact(DbId),
    User(DbId),
    Nobody,
}

impl TaskAssignee {
    pub fn contact_id(self) -> Option<DbId> {
        match self {
            TaskAssignee::Contact(id) => Some(id),
            _ => None,
        }
    }

    pub fn user_id(self) -> Option<DbId> {
        match self {
            TaskAssignee::User(id) => Some(id),
            _ => None,
        }
    }
}
