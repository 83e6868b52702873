//! Handlers for the `/users` resource (tenant user administration).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use imprint_core::audit::{action_types, entity_types};
use imprint_core::error::CoreError;
use imprint_core::permissions::Permission;
use imprint_core::roles::{can_assign_role, validate_role, ROLE_OWNER};
use imprint_core::types::DbId;
use imprint_core::validation::validate_input;
use imprint_db::models::user::{CreateUser, CreateUserRequest, UpdateUser, UserResponse};
use imprint_db::repositories::UserRepo;
use serde_json::json;

use crate::audit::{self, AuditEvent};
use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    user.require(Permission::UsersManage)?;
    let users = UserRepo::list(&state.pool, user.tenant_id).await?;
    Ok(Json(DataResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    validate_input(&input)?;
    user.require(Permission::UsersManage)?;

    validate_role(&input.role)?;
    ensure_can_assign(&user, &input.role)?;
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create = CreateUser {
        email: input.email.trim().to_lowercase(),
        name: input.name.trim().to_string(),
        password_hash,
        role: input.role,
    };
    let created = UserRepo::create(&state.pool, user.tenant_id, &create).await?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::CREATE, entity_types::USER, created.id)
            .with_details(json!({ "email": created.email, "role": created.role })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(created.into()))))
}

/// PUT /api/v1/users/{id}
///
/// Change a user's name, role or active flag. The tenant always keeps at
/// least one active owner, and callers cannot deactivate themselves.
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    validate_input(&input)?;
    user.require(Permission::UsersManage)?;

    let existing = UserRepo::find_in_tenant(&state.pool, user.tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    if let Some(role) = &input.role {
        validate_role(role)?;
        ensure_can_assign(&user, &existing.role)?;
        ensure_can_assign(&user, role)?;
    } else if existing.role == ROLE_OWNER {
        ensure_can_assign(&user, ROLE_OWNER)?;
    }

    if input.is_active == Some(false) && id == user.user_id {
        return Err(AppError::Core(CoreError::Conflict(
            "You cannot deactivate your own account".into(),
        )));
    }

    let loses_owner = existing.role == ROLE_OWNER
        && existing.is_active
        && (input.role.as_deref().is_some_and(|r| r != ROLE_OWNER)
            || input.is_active == Some(false));
    if loses_owner && UserRepo::count_active_owners(&state.pool, user.tenant_id).await? <= 1 {
        return Err(AppError::Core(CoreError::Conflict(
            "A tenant must keep at least one active owner".into(),
        )));
    }

    let patch = UpdateUser {
        name: input.name.map(|n| n.trim().to_string()),
        role: input.role,
        is_active: input.is_active,
    };
    let updated = UserRepo::update(&state.pool, user.tenant_id, id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPDATE, entity_types::USER, id).with_details(json!({
            "role": { "from": existing.role, "to": updated.role },
            "is_active": { "from": existing.is_active, "to": updated.is_active },
        })),
    )
    .await;

    Ok(Json(DataResponse::new(updated.into())))
}

fn ensure_can_assign(actor: &AuthUser, role: &str) -> AppResult<()> {
    if can_assign_role(&actor.role, role) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(format!(
            "Role '{}' cannot grant or change the '{role}' role",
            actor.role
        ))))
    }
}
