//! Handler for querying the audit trail.

use axum::extract::{Query, State};
use axum::Json;
use imprint_db::models::audit::{AuditLog, AuditQuery};
use imprint_db::repositories::AuditLogRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuditReader;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/audit-logs
///
/// Newest first. Filters: `entity_type`, `entity_id`, `user_id`,
/// `action_type`, `limit`, `offset`.
pub async fn list_audit_logs(
    State(state): State<AppState>,
    RequireAuditReader(user): RequireAuditReader,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<Vec<AuditLog>>>> {
    let logs = AuditLogRepo::query(&state.pool, user.tenant_id, &params).await?;
    Ok(Json(DataResponse::new(logs)))
}
