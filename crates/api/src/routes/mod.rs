pub mod audit;
pub mod auth;
pub mod contacts;
pub mod files;
pub mod health;
pub mod invoices;
pub mod projects;
pub mod tasks;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register tenant + owner (public)
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout
/// /auth/me                                         current user + permissions
///
/// /users                                           list, create (users.manage)
/// /users/{id}                                      update
///
/// /contacts                                        list, create
/// /contacts/{id}                                   get, update, delete
/// /contacts/{id}/roles                             add role
/// /contacts/{id}/roles/{role}                      update, remove role
/// /contacts/{id}/tax-info                          get (masked), set, delete
/// /contacts/{id}/tax-info/reveal                   reveal plaintext (audited)
///
/// /projects                                        list, create
/// /projects/board                                  Kanban columns
/// /projects/{id}                                   get, update, delete
/// /projects/{id}/status                            status transition
/// /projects/{id}/stage                             board move
/// /projects/{id}/manuscript                        upload (multipart)
/// /projects/{id}/manuscript/url                    signed download link
/// /projects/{project_id}/tasks                     list, create
/// /projects/{project_id}/tasks/{id}                get, update, delete
/// /projects/{project_id}/tasks/{id}/status         status transition
/// /projects/{project_id}/tasks/{id}/assign         assign contact / user / nobody
/// /projects/{project_id}/proofs                    list, upload (multipart)
/// /projects/{project_id}/proofs/{id}               get
/// /projects/{project_id}/proofs/{id}/url           signed download link
/// /projects/{project_id}/proofs/{id}/approve       approve
/// /projects/{project_id}/proofs/{id}/request-corrections
///
/// /tasks/mine                                      open tasks assigned to caller
///
/// /invoices                                        list, create
/// /invoices/mark-overdue                           overdue sweep
/// /invoices/{id}                                   get, update, delete (draft)
/// /invoices/{id}/status                            status transition
/// /invoices/{id}/payments                          record payment
///
/// /audit-logs                                      query (audit.read)
///
/// /files/{*key}                                    signed download (no token)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/contacts", contacts::router())
        .nest("/projects", projects::router())
        .nest("/tasks", tasks::router())
        .nest("/invoices", invoices::router())
        .nest("/audit-logs", audit::router())
        .nest("/files", files::router())
}
