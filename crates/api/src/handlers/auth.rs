//! Handlers for the `/auth` resource (register, login, refresh, logout, me).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use imprint_core::audit::{action_types, entity_types};
use imprint_core::error::CoreError;
use imprint_core::permissions::permissions_for;
use imprint_core::roles::ROLE_OWNER;
use imprint_core::validation::{validate_input, SLUG};
use imprint_db::models::session::CreateSession;
use imprint_db::models::tenant::{CreateTenant, Tenant};
use imprint_db::models::user::{CreateUser, User, UserResponse};
use imprint_db::repositories::{SessionRepo, TenantRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::audit::{self, AuditEvent};
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Consecutive failed logins before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Minutes an account stays locked after too many failures.
const LOCK_DURATION_MINS: i64 = 15;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub tenant_name: String,
    #[validate(length(min = 2, max = 63, message = "must be 2-63 characters"))]
    pub tenant_slug: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: String,
    #[validate(length(min = 12, max = 256, message = "must be 12-256 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by register, login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub tenant: Tenant,
    #[serde(flatten)]
    pub auth: AuthResponse,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub permissions: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a tenant together with its first user, who becomes the owner.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RegisterResponse>>)> {
    validate_input(&input)?;
    let slug = input.tenant_slug.trim().to_lowercase();
    if !SLUG.is_match(&slug) {
        return Err(AppError::Core(CoreError::Validation(
            "tenant_slug: must be lower-case letters, digits and single dashes".into(),
        )));
    }
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let tenant_input = CreateTenant {
        name: input.tenant_name.trim().to_string(),
        slug,
    };
    let owner_input = CreateUser {
        email: input.email.trim().to_lowercase(),
        name: input.name.trim().to_string(),
        password_hash,
        role: ROLE_OWNER.to_string(),
    };
    let (tenant, owner) = TenantRepo::create_with_owner(&state.pool, &tenant_input, &owner_input).await?;

    tracing::info!(tenant_id = tenant.id, user_id = owner.id, "Registered tenant");
    audit::record_as(
        &state.pool,
        tenant.id,
        Some(owner.id),
        AuditEvent::new(action_types::CREATE, entity_types::TENANT, tenant.id)
            .with_details(serde_json::json!({ "slug": tenant.slug })),
    )
    .await;

    let auth = create_auth_response(&state, owner).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(RegisterResponse { tenant, auth })),
    ))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let user = UserRepo::find_by_email(&state.pool, input.email.trim())
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let failures = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            let until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
        }
        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    audit::record_as(
        &state.pool,
        user.tenant_id,
        Some(user.id),
        AuditEvent::new(action_types::LOGIN, entity_types::USER, user.id),
    )
    .await;

    let response = create_auth_response(&state, user).await?;
    Ok(Json(DataResponse::new(response)))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new token pair. The old session is revoked.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        ))
    };

    let token_hash = hash_refresh_token(&input.refresh_token);
    let session = SessionRepo::find_active_by_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(invalid)?;

    // A concurrent refresh with the same token loses here.
    if !SessionRepo::revoke(&state.pool, session.id).await? {
        return Err(invalid());
    }

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let response = create_auth_response(&state, user).await?;
    Ok(Json(DataResponse::new(response)))
}

/// POST /api/v1/auth/logout
///
/// Revoke every session of the caller. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.user_id).await?;
    tracing::debug!(user_id = user.user_id, revoked, "Revoked sessions on logout");
    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::LOGOUT, entity_types::USER, user.user_id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<MeResponse>>> {
    let row = UserRepo::find_in_tenant(&state.pool, user.tenant_id, user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user.user_id))?;

    let permissions = permissions_for(&row.role).iter().map(|p| p.as_str()).collect();
    Ok(Json(DataResponse::new(MeResponse {
        user: row.into(),
        permissions,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue a token pair for `user` and persist the refresh session.
async fn create_auth_response(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let access_token =
        generate_access_token(user.id, user.tenant_id, &user.role, &state.config.jwt)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    let session = CreateSession {
        user_id: user.id,
        refresh_token_hash: refresh_hash,
        expires_at: Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days),
    };
    SessionRepo::create(&state.pool, &session).await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: user.into(),
    })
}
