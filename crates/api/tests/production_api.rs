//! Integration tests for projects, the board, tasks, proofs and manuscript
//! downloads. Need a Postgres reachable through `DATABASE_URL`.

mod common;

use axum::http::StatusCode;
use std::sync::Arc;

use common::{
    body_bytes, body_json, build_test_app, build_test_app_with_mailer,
    build_test_app_with_storage, create_contact_with_role, delete_auth, get, get_auth,
    post_file_auth, post_json_auth, put_json_auth, register_tenant, FailingMailer,
    RecordingMailer,
};
use imprint_core::types::DbId;
use sqlx::PgPool;

async fn create_project(pool: &PgPool, token: &str, title: &str) -> DbId {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        serde_json::json!({ "title": title, "isbn": "978-0-306-40615-7" }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Projects and board
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn new_project_starts_as_draft_in_first_column(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let id = create_project(&pool, &token, "Night Tides").await;

    let json = body_json(get_auth(build_test_app(pool.clone()), &format!("/api/v1/projects/{id}"), &token).await).await;
    assert_eq!(json["data"]["status"], "draft");
    assert_eq!(json["data"]["workflow_stage"], "manuscript_received");
    assert_eq!(json["data"]["isbn"], "9780306406157");

    let board = body_json(get_auth(build_test_app(pool), "/api/v1/projects/board", &token).await).await;
    let columns = board["data"].as_array().unwrap();
    assert_eq!(columns.len(), 6);
    assert_eq!(columns[0]["stage"], "manuscript_received");
    assert_eq!(columns[0]["projects"][0]["id"], id);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn project_author_must_hold_author_role(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let vendor = create_contact_with_role(&pool, &token, "Inkwell", "vendor").await;

    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/projects",
        serde_json::json!({ "title": "Night Tides", "author_contact_id": vendor }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn status_changes_follow_the_state_machine(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let id = create_project(&pool, &token, "Night Tides").await;
    let uri = format!("/api/v1/projects/{id}/status");

    let response = post_json_auth(build_test_app(pool.clone()), &uri, serde_json::json!({ "status": "completed" }), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(build_test_app(pool.clone()), &uri, serde_json::json!({ "status": "in_progress" }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let logs = body_json(
        get_auth(
            build_test_app(pool),
            &format!("/api/v1/audit-logs?entity_type=production_project&entity_id={id}&action_type=status_change"),
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(logs["data"][0]["details_json"]["from"], "draft");
    assert_eq!(logs["data"][0]["details_json"]["to"], "in_progress");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn dragging_a_draft_forward_starts_it(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let id = create_project(&pool, &token, "Night Tides").await;
    let uri = format!("/api/v1/projects/{id}/stage");

    let response = post_json_auth(build_test_app(pool.clone()), &uri, serde_json::json!({ "workflow_stage": "design" }), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT, "columns may only be skipped one at a time");

    let response = post_json_auth(build_test_app(pool), &uri, serde_json::json!({ "workflow_stage": "editing" }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["workflow_stage"], "editing");
    assert_eq!(json["data"]["status"], "in_progress");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleted_project_hides_its_tasks_and_proofs(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let project = create_project(&pool, &token, "Night Tides").await;
    let dir = tempfile::tempdir().unwrap();

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project}/tasks"),
        serde_json::json!({ "title": "Copyedit chapters 1-5" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let task = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_file_auth(
        build_test_app_with_storage(pool.clone(), dir.path()),
        &format!("/api/v1/projects/{project}/proofs"),
        "galley.pdf",
        b"%PDF",
        None,
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let proof = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = delete_auth(build_test_app(pool.clone()), &format!("/api/v1/projects/{project}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let task_uri = format!("/api/v1/projects/{project}/tasks/{task}");
    let proof_uri = format!("/api/v1/projects/{project}/proofs/{proof}");
    let app = || build_test_app(pool.clone());

    assert_eq!(get_auth(app(), &task_uri, &token).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        put_json_auth(app(), &task_uri, serde_json::json!({ "title": "Renamed" }), &token).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        post_json_auth(app(), &format!("{task_uri}/status"), serde_json::json!({ "status": "in_progress" }), &token)
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        post_json_auth(app(), &format!("{task_uri}/assign"), serde_json::json!({}), &token).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(delete_auth(app(), &task_uri, &token).await.status(), StatusCode::NOT_FOUND);

    assert_eq!(get_auth(app(), &proof_uri, &token).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get_auth(app(), &format!("{proof_uri}/url"), &token).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        post_json_auth(app(), &format!("{proof_uri}/approve"), serde_json::json!({}), &token).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        post_json_auth(
            app(),
            &format!("{proof_uri}/request-corrections"),
            serde_json::json!({ "notes": "Fix the gutter" }),
            &token,
        )
        .await
        .status(),
        StatusCode::NOT_FOUND
    );
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tasks_assign_to_vendors_and_users(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let project = create_project(&pool, &token, "Night Tides").await;
    let vendor = create_contact_with_role(&pool, &token, "Inkwell", "vendor").await;
    let customer = create_contact_with_role(&pool, &token, "Bookshop", "customer").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project}/tasks"),
        serde_json::json!({ "title": "Copyedit chapters 1-5", "task_type": "copyediting" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let task = body_json(response).await["data"]["id"].as_i64().unwrap();
    let assign = format!("/api/v1/projects/{project}/tasks/{task}/assign");

    let response = post_json_auth(build_test_app(pool.clone()), &assign, serde_json::json!({ "contact_id": customer }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(build_test_app(pool.clone()), &assign, serde_json::json!({ "contact_id": vendor }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["assignee_contact_id"], vendor);

    let me = body_json(get_auth(build_test_app(pool.clone()), "/api/v1/auth/me", &token).await).await;
    let my_id = me["data"]["id"].as_i64().unwrap();
    let response = post_json_auth(build_test_app(pool.clone()), &assign, serde_json::json!({ "user_id": my_id }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["assignee_user_id"], my_id);
    assert!(json["data"]["assignee_contact_id"].is_null());

    let mine = body_json(get_auth(build_test_app(pool), "/api/v1/tasks/mine", &token).await).await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);
    assert_eq!(mine["data"][0]["project_title"], "Night Tides");
}

// ---------------------------------------------------------------------------
// Proofs and files
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn proofs_are_versioned_and_reviewed(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let project = create_project(&pool, &token, "Night Tides").await;
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("/api/v1/projects/{project}/proofs");

    let app = build_test_app_with_storage(pool.clone(), dir.path());
    let response = post_file_auth(app, &uri, "galley.pdf", b"%PDF first", Some("first pass"), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = body_json(response).await;
    assert_eq!(first["data"]["version"], 1);
    assert_eq!(first["data"]["status"], "pending_review");

    let app = build_test_app_with_storage(pool.clone(), dir.path());
    let response = post_file_auth(app, &uri, "galley.pdf", b"%PDF second", None, &token).await;
    let second = body_json(response).await;
    assert_eq!(second["data"]["version"], 2);
    let proof_id = second["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("{uri}/{proof_id}/request-corrections"),
        serde_json::json!({ "notes": "   " }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("{uri}/{proof_id}/approve"),
        serde_json::json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "approved");

    // A decided proof cannot be reviewed again.
    let response = post_json_auth(
        build_test_app(pool),
        &format!("{uri}/{proof_id}/approve"),
        serde_json::json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn proof_with_disallowed_extension_is_rejected(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let project = create_project(&pool, &token, "Night Tides").await;

    let response = post_file_auth(
        build_test_app(pool),
        &format!("/api/v1/projects/{project}/proofs"),
        "payload.exe",
        b"MZ",
        None,
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn manuscript_round_trips_through_a_signed_link(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let project = create_project(&pool, &token, "Night Tides").await;
    let dir = tempfile::tempdir().unwrap();

    let response = post_file_auth(
        build_test_app_with_storage(pool.clone(), dir.path()),
        &format!("/api/v1/projects/{project}/manuscript"),
        "Night Tides.docx",
        b"manuscript body",
        None,
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["manuscript_file_name"], "Night Tides.docx");

    let link = body_json(
        get_auth(
            build_test_app_with_storage(pool.clone(), dir.path()),
            &format!("/api/v1/projects/{project}/manuscript/url"),
            &token,
        )
        .await,
    )
    .await;
    let url = link["data"]["url"].as_str().unwrap();
    let path = url.strip_prefix(common::PUBLIC_BASE_URL).unwrap();

    let response = get(build_test_app_with_storage(pool, dir.path()), path).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"manuscript body");
}

// ---------------------------------------------------------------------------
// Correction notices
// ---------------------------------------------------------------------------

/// Create a project whose author is a contact named "Ada" at `hello@ada.test`,
/// upload one proof and return `(project_id, proof_id)`.
async fn project_with_authored_proof(pool: &PgPool, token: &str) -> (DbId, DbId) {
    let author = create_contact_with_role(pool, token, "Ada", "author").await;
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        serde_json::json!({ "title": "Night Tides", "author_contact_id": author }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let project = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_file_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project}/proofs"),
        "galley.pdf",
        b"%PDF",
        None,
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let proof = body_json(response).await["data"]["id"].as_i64().unwrap();
    (project, proof)
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn requesting_corrections_emails_the_author(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let (project, proof) = project_with_authored_proof(&pool, &token).await;
    let mailer = Arc::new(RecordingMailer::default());

    let response = post_json_auth(
        build_test_app_with_mailer(pool, mailer.clone()),
        &format!("/api/v1/projects/{project}/proofs/{proof}/request-corrections"),
        serde_json::json!({ "notes": "Widow on page 12" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "hello@ada.test");
    assert_eq!(sent[0].subject, "[quill Press] Corrections requested: Night Tides (proof v1)");
    assert!(sent[0].body.contains("Widow on page 12"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn mail_failure_does_not_fail_the_review(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let (project, proof) = project_with_authored_proof(&pool, &token).await;

    let response = post_json_auth(
        build_test_app_with_mailer(pool, Arc::new(FailingMailer)),
        &format!("/api/v1/projects/{project}/proofs/{proof}/request-corrections"),
        serde_json::json!({ "notes": "Widow on page 12" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "corrections_requested");
}
