//! Production project model, DTOs and board projections.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use imprint_core::production::{ProjectStatus, WorkflowStage};
use imprint_core::types::{Date, DbId, Timestamp};

/// A row from `production_projects`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductionProject {
    pub id: DbId,
    pub tenant_id: DbId,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub author_contact_id: Option<DbId>,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub workflow_stage: WorkflowStage,
    #[serde(skip_serializing)]
    pub manuscript_storage_key: Option<String>,
    pub manuscript_file_name: Option<String>,
    pub manuscript_uploaded_at: Option<Timestamp>,
    pub target_publish_date: Option<Date>,
    pub due_date: Option<Date>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a project. New projects start as `draft` in
/// `manuscript_received`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductionProject {
    #[validate(length(min = 1, max = 300, message = "must be 1-300 characters"))]
    pub title: String,
    #[validate(length(max = 300))]
    pub subtitle: Option<String>,
    #[validate(length(max = 10_000))]
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub author_contact_id: Option<DbId>,
    pub target_publish_date: Option<Date>,
    pub due_date: Option<Date>,
}

/// DTO for updating a project. Status and stage change only through their
/// dedicated endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProductionProject {
    #[validate(length(min = 1, max = 300, message = "must be 1-300 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 300))]
    pub subtitle: Option<String>,
    #[validate(length(max = 10_000))]
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub author_contact_id: Option<DbId>,
    pub target_publish_date: Option<Date>,
    pub due_date: Option<Date>,
}

/// Filters for listing projects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListParams {
    pub status: Option<ProjectStatus>,
    pub stage: Option<WorkflowStage>,
    pub author_contact_id: Option<DbId>,
}

/// Request body for a status transition.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionProjectStatus {
    pub status: ProjectStatus,
}

/// Request body for a board move.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveProjectStage {
    pub workflow_stage: WorkflowStage,
}

/// One project card on the board.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BoardCard {
    pub id: DbId,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub workflow_stage: WorkflowStage,
    pub due_date: Option<Date>,
    pub author_contact_id: Option<DbId>,
    pub author_name: Option<String>,
    pub open_task_count: i64,
}

/// One board column.
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub stage: WorkflowStage,
    pub title: &'static str,
    pub projects: Vec<BoardCard>,
}

impl BoardColumn {
    /// Group cards into the six stage columns, in stage order. Card order
    /// within a column is preserved.
    pub fn group(cards: Vec<BoardCard>) -> Vec<BoardColumn> {
        let mut columns: Vec<BoardColumn> = WorkflowStage::ALL
            .iter()
            .map(|&stage| BoardColumn {
                stage,
                title: stage.title(),
                projects: Vec::new(),
            })
            .collect();
        for card in cards {
            columns[card.workflow_stage.position()].projects.push(card);
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: DbId, stage: WorkflowStage) -> BoardCard {
        BoardCard {
            id,
            title: format!("Book {id}"),
            status: ProjectStatus::InProgress,
            workflow_stage: stage,
            due_date: None,
            author_contact_id: None,
            author_name: None,
            open_task_count: 0,
        }
    }

    #[test]
    fn empty_board_has_six_columns() {
        let columns = BoardColumn::group(Vec::new());
        let stages: Vec<_> = columns.iter().map(|c| c.stage).collect();
        assert_eq!(stages, WorkflowStage::ALL.to_vec());
        assert!(columns.iter().all(|c| c.projects.is_empty()));
    }

    #[test]
    fn cards_land_in_their_column_in_order() {
        let columns = BoardColumn::group(vec![
            card(3, WorkflowStage::Design),
            card(1, WorkflowStage::Editing),
            card(2, WorkflowStage::Design),
        ]);
        let design: Vec<_> = columns[WorkflowStage::Design.position()]
            .projects
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(design, vec![3, 2]);
        assert_eq!(columns[WorkflowStage::Editing.position()].projects.len(), 1);
        assert_eq!(columns[0].title, "Manuscript Received");
    }
}
