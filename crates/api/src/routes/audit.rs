//! Route definitions for the `/audit-logs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Routes mounted at `/audit-logs`.
///
/// ```text
/// GET /  -> list_audit_logs (requires audit.read)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(audit::list_audit_logs))
}
