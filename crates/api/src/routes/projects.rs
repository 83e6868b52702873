//! Route definitions for the `/projects` resource.
//!
//! Also nests tasks and proofs under `/projects/{project_id}/...`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use imprint_core::files::MAX_UPLOAD_BYTES;

use crate::handlers::{projects, proofs, tasks};
use crate::state::AppState;

/// Room for multipart boundaries and the `notes` field on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                         -> list_projects
/// POST   /                                         -> create_project
/// GET    /board                                    -> get_board
/// GET    /{id}                                     -> get_project
/// PUT    /{id}                                     -> update_project
/// DELETE /{id}                                     -> delete_project (soft)
/// POST   /{id}/status                              -> transition_status
/// POST   /{id}/stage                               -> move_stage
/// POST   /{id}/manuscript                          -> upload_manuscript (multipart)
/// GET    /{id}/manuscript/url                      -> manuscript_url
///
/// GET    /{project_id}/tasks                       -> list_tasks
/// POST   /{project_id}/tasks                       -> create_task
/// GET    /{project_id}/tasks/{id}                  -> get_task
/// PUT    /{project_id}/tasks/{id}                  -> update_task
/// DELETE /{project_id}/tasks/{id}                  -> delete_task
/// POST   /{project_id}/tasks/{id}/status           -> transition_task_status
/// POST   /{project_id}/tasks/{id}/assign           -> assign_task
///
/// GET    /{project_id}/proofs                      -> list_proofs
/// POST   /{project_id}/proofs                      -> upload_proof (multipart)
/// GET    /{project_id}/proofs/{id}                 -> get_proof
/// GET    /{project_id}/proofs/{id}/url             -> proof_url
/// POST   /{project_id}/proofs/{id}/approve         -> approve_proof
/// POST   /{project_id}/proofs/{id}/request-corrections -> request_corrections
/// ```
pub fn router() -> Router<AppState> {
    let upload_limit = DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES);

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/{id}/status", post(tasks::transition_task_status))
        .route("/{id}/assign", post(tasks::assign_task));

    let proof_routes = Router::new()
        .route(
            "/",
            get(proofs::list_proofs)
                .post(proofs::upload_proof)
                .layer(upload_limit.clone()),
        )
        .route("/{id}", get(proofs::get_proof))
        .route("/{id}/url", get(proofs::proof_url))
        .route("/{id}/approve", post(proofs::approve_proof))
        .route(
            "/{id}/request-corrections",
            post(proofs::request_corrections),
        );

    Router::new()
        .route(
            "/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/board", get(projects::get_board))
        .route(
            "/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/{id}/status", post(projects::transition_status))
        .route("/{id}/stage", post(projects::move_stage))
        .route(
            "/{id}/manuscript",
            post(projects::upload_manuscript).layer(upload_limit),
        )
        .route("/{id}/manuscript/url", get(projects::manuscript_url))
        .nest("/{project_id}/tasks", task_routes)
        .nest("/{project_id}/proofs", proof_routes)
}
