//! Route definitions for the caller's own tasks.

use axum::routing::get;
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET /mine  -> list_my_tasks
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/mine", get(tasks::list_my_tasks))
}
