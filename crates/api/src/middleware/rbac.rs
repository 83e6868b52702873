//! Permission-gated extractors.
//!
//! Each wraps [`AuthUser`] and rejects with 403 when the caller's role lacks
//! the permission. Resource handlers call [`AuthUser::require`] themselves so
//! a body is validated before the permission check.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use imprint_core::permissions::Permission;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `audit.read`.
pub struct RequireAuditReader(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuditReader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require(Permission::AuditRead)?;
        Ok(RequireAuditReader(user))
    }
}
