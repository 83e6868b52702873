//! Route definitions for signed file downloads.

use axum::routing::get;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Routes mounted at `/files`. Authenticated by link signature, not token.
///
/// ```text
/// GET /{*key}?expires=&signature=  -> download
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{*key}", get(files::download))
}
