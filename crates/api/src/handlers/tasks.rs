//! Handlers for production tasks, nested under `/projects/{project_id}/tasks`,
//! plus the caller's own task list at `/tasks/mine`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use imprint_core::audit::{action_types, entity_types, transition_details};
use imprint_core::contact_roles::ContactRoleKind;
use imprint_core::error::CoreError;
use imprint_core::permissions::Permission;
use imprint_core::production::validate_task_transition;
use imprint_core::types::DbId;
use imprint_core::validation::validate_input;
use imprint_db::models::production_task::{
    AssignTask, CreateProductionTask, MyTask, ProductionTask, TaskAssignee, TransitionTaskStatus,
    UpdateProductionTask,
};
use imprint_db::repositories::{ContactRoleRepo, ProductionTaskRepo, UserRepo};
use serde_json::json;

use super::contacts::find_contact;
use super::projects::find_project;
use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects/{project_id}/tasks
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateProductionTask>,
) -> AppResult<(StatusCode, Json<DataResponse<ProductionTask>>)> {
    validate_input(&input)?;
    user.require(Permission::ProductionWrite)?;
    find_project(&state, user.tenant_id, project_id).await?;

    let task = ProductionTaskRepo::create(
        &state.pool,
        user.tenant_id,
        project_id,
        Some(user.user_id),
        &input,
    )
    .await?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::CREATE, entity_types::PRODUCTION_TASK, task.id)
            .with_details(json!({ "project_id": project_id, "task_type": task.task_type })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(task))))
}

/// GET /api/v1/projects/{project_id}/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ProductionTask>>>> {
    user.require(Permission::ProductionRead)?;
    find_project(&state, user.tenant_id, project_id).await?;

    let tasks =
        ProductionTaskRepo::list_for_project(&state.pool, user.tenant_id, project_id).await?;
    Ok(Json(DataResponse::new(tasks)))
}

/// GET /api/v1/projects/{project_id}/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ProductionTask>>> {
    user.require(Permission::ProductionRead)?;
    let task = find_task(&state, user.tenant_id, project_id, id).await?;
    Ok(Json(DataResponse::new(task)))
}

/// PUT /api/v1/projects/{project_id}/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateProductionTask>,
) -> AppResult<Json<DataResponse<ProductionTask>>> {
    validate_input(&input)?;
    user.require(Permission::ProductionWrite)?;
    find_project(&state, user.tenant_id, project_id).await?;

    let updated = ProductionTaskRepo::update(&state.pool, user.tenant_id, project_id, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Production task", id))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPDATE, entity_types::PRODUCTION_TASK, id),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// POST /api/v1/projects/{project_id}/tasks/{id}/status
pub async fn transition_task_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<TransitionTaskStatus>,
) -> AppResult<Json<DataResponse<ProductionTask>>> {
    user.require(Permission::ProductionWrite)?;

    let existing = find_task(&state, user.tenant_id, project_id, id).await?;
    validate_task_transition(existing.status, input.status)?;

    let updated = ProductionTaskRepo::set_status(
        &state.pool,
        user.tenant_id,
        project_id,
        id,
        existing.status,
        input.status,
    )
    .await?
    .ok_or_else(|| AppError::stale("Production task"))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::STATUS_CHANGE, entity_types::PRODUCTION_TASK, id)
            .with_details(transition_details(existing.status.as_str(), updated.status.as_str())),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// POST /api/v1/projects/{project_id}/tasks/{id}/assign
///
/// Assign the task to a vendor/author contact, to an active user, or (with an
/// empty body) to nobody.
pub async fn assign_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<AssignTask>,
) -> AppResult<Json<DataResponse<ProductionTask>>> {
    let assignee = match (input.contact_id, input.user_id) {
        (Some(_), Some(_)) => {
            return Err(AppError::Core(CoreError::Validation(
                "Assign a task to a contact or a user, not both".into(),
            )))
        }
        (Some(contact_id), None) => TaskAssignee::Contact(contact_id),
        (None, Some(user_id)) => TaskAssignee::User(user_id),
        (None, None) => TaskAssignee::Nobody,
    };
    user.require(Permission::ProductionWrite)?;
    find_task(&state, user.tenant_id, project_id, id).await?;

    match assignee {
        TaskAssignee::Contact(contact_id) => {
            find_contact(&state, user.tenant_id, contact_id).await?;
            let assignable: Vec<ContactRoleKind> = ContactRoleKind::ALL
                .iter()
                .copied()
                .filter(|k| k.is_assignable())
                .collect();
            if !ContactRoleRepo::has_any_role(&state.pool, user.tenant_id, contact_id, &assignable)
                .await?
            {
                return Err(AppError::Core(CoreError::Validation(format!(
                    "contact_id: contact {contact_id} must hold an active vendor or author role"
                ))));
            }
        }
        TaskAssignee::User(user_id) => {
            let target = UserRepo::find_in_tenant(&state.pool, user.tenant_id, user_id)
                .await?
                .ok_or_else(|| AppError::not_found("User", user_id))?;
            if !target.is_active {
                return Err(AppError::Core(CoreError::Validation(format!(
                    "user_id: user {user_id} is deactivated"
                ))));
            }
        }
        TaskAssignee::Nobody => {}
    }

    let updated = ProductionTaskRepo::assign(&state.pool, user.tenant_id, project_id, id, assignee)
        .await?
        .ok_or_else(|| AppError::not_found("Production task", id))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::ASSIGN, entity_types::PRODUCTION_TASK, id).with_details(
            json!({
                "contact_id": assignee.contact_id(),
                "user_id": assignee.user_id(),
            }),
        ),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// DELETE /api/v1/projects/{project_id}/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    user.require(Permission::ProductionWrite)?;
    find_project(&state, user.tenant_id, project_id).await?;

    if !ProductionTaskRepo::delete(&state.pool, user.tenant_id, project_id, id).await? {
        return Err(AppError::not_found("Production task", id));
    }

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::DELETE, entity_types::PRODUCTION_TASK, id)
            .with_details(json!({ "project_id": project_id })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tasks/mine
///
/// Open tasks assigned to the caller across all live projects.
pub async fn list_my_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<MyTask>>>> {
    user.require(Permission::ProductionRead)?;
    let tasks =
        ProductionTaskRepo::list_open_for_user(&state.pool, user.tenant_id, user.user_id).await?;
    Ok(Json(DataResponse::new(tasks)))
}

/// Resolve a task on a live project. A deleted project hides its tasks.
async fn find_task(
    state: &AppState,
    tenant_id: DbId,
    project_id: DbId,
    id: DbId,
) -> AppResult<ProductionTask> {
    find_project(state, tenant_id, project_id).await?;
    ProductionTaskRepo::find_by_id(&state.pool, tenant_id, project_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Production task", id))
}
