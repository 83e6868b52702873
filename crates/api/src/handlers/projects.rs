//! Handlers for the `/projects` resource: CRUD, status transitions, board
//! moves and manuscript uploads.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use imprint_core::audit::{action_types, entity_types, transition_details};
use imprint_core::contact_roles::ContactRoleKind;
use imprint_core::error::CoreError;
use imprint_core::files::{key_belongs_to_tenant, manuscript_key, validate_upload, UploadKind};
use imprint_core::permissions::Permission;
use imprint_core::production::{plan_stage_move, validate_project_transition};
use imprint_core::signing::{signed_url, SignedUrl};
use imprint_core::types::DbId;
use imprint_core::validation::{normalize_isbn, validate_input};
use imprint_db::models::production_project::{
    BoardColumn, CreateProductionProject, MoveProjectStage, ProductionProject, ProjectListParams,
    TransitionProjectStatus, UpdateProductionProject,
};
use imprint_db::repositories::{ContactRoleRepo, ProductionProjectRepo};
use serde_json::json;
use uuid::Uuid;

use super::upload::read_upload;
use crate::audit::{self, AuditEvent};
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut input): Json<CreateProductionProject>,
) -> AppResult<(StatusCode, Json<DataResponse<ProductionProject>>)> {
    validate_input(&input)?;
    input.isbn = clean_isbn(input.isbn.as_deref())?;
    user.require(Permission::ProductionWrite)?;

    if let Some(author_id) = input.author_contact_id {
        ensure_author(&state, user.tenant_id, author_id).await?;
    }

    let project =
        ProductionProjectRepo::create(&state.pool, user.tenant_id, Some(user.user_id), &input)
            .await?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::CREATE, entity_types::PRODUCTION_PROJECT, project.id)
            .with_details(json!({ "title": project.title })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(project))))
}

/// GET /api/v1/projects
///
/// Optional filters: `status`, `stage`, `author_contact_id`.
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ProjectListParams>,
) -> AppResult<Json<DataResponse<Vec<ProductionProject>>>> {
    user.require(Permission::ProductionRead)?;
    let projects = ProductionProjectRepo::list(&state.pool, user.tenant_id, &params).await?;
    Ok(Json(DataResponse::new(projects)))
}

/// GET /api/v1/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProductionProject>>> {
    user.require(Permission::ProductionRead)?;
    let project = find_project(&state, user.tenant_id, id).await?;
    Ok(Json(DataResponse::new(project)))
}

/// PUT /api/v1/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateProductionProject>,
) -> AppResult<Json<DataResponse<ProductionProject>>> {
    validate_input(&input)?;
    input.isbn = clean_isbn(input.isbn.as_deref())?;
    user.require(Permission::ProductionWrite)?;

    let existing = find_project(&state, user.tenant_id, id).await?;
    if let Some(author_id) = input.author_contact_id {
        if existing.author_contact_id != Some(author_id) {
            ensure_author(&state, user.tenant_id, author_id).await?;
        }
    }

    let updated = ProductionProjectRepo::update(&state.pool, user.tenant_id, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Production project", id))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPDATE, entity_types::PRODUCTION_PROJECT, id),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// DELETE /api/v1/projects/{id}
///
/// Soft delete. Tasks and proofs stay in place but are no longer reachable
/// through any route once their project is gone.
pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    user.require(Permission::ProductionDelete)?;

    if !ProductionProjectRepo::soft_delete(&state.pool, user.tenant_id, id).await? {
        return Err(AppError::not_found("Production project", id));
    }

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::DELETE, entity_types::PRODUCTION_PROJECT, id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Status and board
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{id}/status
pub async fn transition_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionProjectStatus>,
) -> AppResult<Json<DataResponse<ProductionProject>>> {
    user.require(Permission::ProductionWrite)?;

    let existing = find_project(&state, user.tenant_id, id).await?;
    validate_project_transition(existing.status, input.status)?;

    let updated =
        ProductionProjectRepo::set_status(&state.pool, user.tenant_id, id, existing.status, input.status)
            .await?
            .ok_or_else(|| AppError::stale("Production project"))?;

    tracing::info!(project_id = id, from = %existing.status, to = %updated.status, "Project status changed");
    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::STATUS_CHANGE, entity_types::PRODUCTION_PROJECT, id)
            .with_details(transition_details(existing.status.as_str(), updated.status.as_str())),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// POST /api/v1/projects/{id}/stage
///
/// Board drag. Only adjacent columns are reachable; the move may also start
/// or complete the project.
pub async fn move_stage(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<MoveProjectStage>,
) -> AppResult<Json<DataResponse<ProductionProject>>> {
    user.require(Permission::ProductionWrite)?;

    let existing = find_project(&state, user.tenant_id, id).await?;
    let stage_move = plan_stage_move(existing.status, existing.workflow_stage, input.workflow_stage)?;

    let updated = ProductionProjectRepo::apply_stage_move(
        &state.pool,
        user.tenant_id,
        id,
        existing.status,
        existing.workflow_stage,
        &stage_move,
    )
    .await?
    .ok_or_else(|| AppError::stale("Production project"))?;

    let mut details = json!({
        "from": existing.workflow_stage,
        "to": updated.workflow_stage,
    });
    if let Some(status) = stage_move.new_status {
        details["status"] = transition_details(existing.status.as_str(), status.as_str());
    }
    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::STAGE_MOVE, entity_types::PRODUCTION_PROJECT, id)
            .with_details(details),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// GET /api/v1/projects/board
pub async fn get_board(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<BoardColumn>>>> {
    user.require(Permission::ProductionRead)?;
    let cards = ProductionProjectRepo::board_cards(&state.pool, user.tenant_id).await?;
    Ok(Json(DataResponse::new(BoardColumn::group(cards))))
}

// ---------------------------------------------------------------------------
// Manuscript
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{id}/manuscript
///
/// Multipart upload with a `file` field. Replaces any earlier manuscript.
pub async fn upload_manuscript(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<ProductionProject>>> {
    user.require(Permission::ProductionWrite)?;
    let existing = find_project(&state, user.tenant_id, id).await?;

    let upload = read_upload(multipart).await?;
    validate_upload(UploadKind::Manuscript, &upload.file_name, upload.bytes.len())?;

    let unique = Uuid::now_v7().simple().to_string();
    let key = manuscript_key(user.tenant_id, id, &unique, &upload.file_name);
    state.file_store.put(&key, &upload.bytes).await?;

    let updated = match ProductionProjectRepo::set_manuscript(
        &state.pool,
        user.tenant_id,
        id,
        &key,
        &upload.file_name,
    )
    .await
    {
        Ok(Some(project)) => project,
        Ok(None) => {
            discard_file(&state, &key).await;
            return Err(AppError::not_found("Production project", id));
        }
        Err(e) => {
            discard_file(&state, &key).await;
            return Err(e.into());
        }
    };

    if let Some(old_key) = existing.manuscript_storage_key.as_deref() {
        discard_file(&state, old_key).await;
    }

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPLOAD, entity_types::PRODUCTION_PROJECT, id).with_details(
            json!({ "file_name": upload.file_name, "size_bytes": upload.bytes.len() }),
        ),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// GET /api/v1/projects/{id}/manuscript/url
pub async fn manuscript_url(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SignedUrl>>> {
    user.require(Permission::ProductionRead)?;
    let project = find_project(&state, user.tenant_id, id).await?;

    let key = project.manuscript_storage_key.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Manuscript for project",
            id,
        })
    })?;
    let link = download_link(&state, user.tenant_id, &key)?;
    Ok(Json(DataResponse::new(link)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) async fn find_project(
    state: &AppState,
    tenant_id: DbId,
    id: DbId,
) -> AppResult<ProductionProject> {
    ProductionProjectRepo::find_by_id(&state.pool, tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Production project", id))
}

/// Signed, expiring link to `key` on this server.
pub(crate) fn download_link(state: &AppState, tenant_id: DbId, key: &str) -> AppResult<SignedUrl> {
    tenant_link(&state.config, tenant_id, key, chrono::Utc::now().timestamp())
}

/// Only keys under the caller's tenant prefix are ever signed.
fn tenant_link(config: &ServerConfig, tenant_id: DbId, key: &str, now: i64) -> AppResult<SignedUrl> {
    if !key_belongs_to_tenant(key, tenant_id) {
        tracing::error!(tenant_id, key, "Refusing to sign a storage key outside the tenant");
        return Err(AppError::Core(CoreError::Forbidden(
            "File belongs to another tenant".into(),
        )));
    }
    Ok(signed_url(
        &config.public_base_url,
        config.file_signing_secret.as_bytes(),
        key,
        now,
        config.signed_url_ttl_secs,
    ))
}

/// Best-effort removal of a stored object that no row points at.
pub(crate) async fn discard_file(state: &AppState, key: &str) {
    if let Err(e) = state.file_store.delete(key).await {
        tracing::warn!(key, error = %e, "Failed to delete orphaned file");
    }
}

async fn ensure_author(state: &AppState, tenant_id: DbId, contact_id: DbId) -> AppResult<()> {
    if ContactRoleRepo::has_any_role(
        &state.pool,
        tenant_id,
        contact_id,
        &[ContactRoleKind::Author],
    )
    .await?
    {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "author_contact_id: contact {contact_id} does not hold an active author role"
        ))))
    }
}

fn clean_isbn(raw: Option<&str>) -> Result<Option<String>, CoreError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(isbn) => normalize_isbn(isbn).map(Some),
    }
}
