//! Integration tests for registration, login, token refresh, logout and
//! user management. Need a Postgres reachable through `DATABASE_URL`.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, get_auth, post_json, post_json_auth, put_json_auth, register_tenant,
};
use sqlx::PgPool;

const OWNER_PASSWORD: &str = "correct-horse-42";

async fn login(pool: &PgPool, email: &str, password: &str) -> axum::http::Response<axum::body::Body> {
    let body = serde_json::json!({ "email": email, "password": password });
    post_json(build_test_app(pool.clone()), "/api/v1/auth/login", body).await
}

// ---------------------------------------------------------------------------
// Registration and login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn register_creates_tenant_and_owner(pool: PgPool) {
    let body = serde_json::json!({
        "tenant_name": "Lantern Books",
        "tenant_slug": "lantern",
        "email": "ada@lantern.test",
        "name": "Ada",
        "password": OWNER_PASSWORD,
    });
    let response = post_json(build_test_app(pool.clone()), "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["tenant"]["slug"], "lantern");
    assert_eq!(json["data"]["user"]["role"], "owner");
    assert!(json["data"]["access_token"].is_string());
    assert!(json["data"]["refresh_token"].is_string());
    assert_eq!(json["data"]["expires_in"], 900);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_tenant_slug_returns_409(pool: PgPool) {
    register_tenant(&pool, "lantern").await;

    let body = serde_json::json!({
        "tenant_name": "Another Lantern",
        "tenant_slug": "lantern",
        "email": "other@lantern.test",
        "name": "Other",
        "password": OWNER_PASSWORD,
    });
    let response = post_json(build_test_app(pool), "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn login_with_correct_password_succeeds(pool: PgPool) {
    register_tenant(&pool, "quill").await;

    let response = login(&pool, "owner@quill.test", OWNER_PASSWORD).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["email"], "owner@quill.test");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn wrong_password_and_unknown_email_both_return_401(pool: PgPool) {
    register_tenant(&pool, "quill").await;

    let response = login(&pool, "owner@quill.test", "wrong-password-1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = body_json(response).await;

    let response = login(&pool, "ghost@quill.test", "wrong-password-1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = body_json(response).await;

    assert_eq!(wrong_password["error"], unknown_email["error"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn account_locks_after_repeated_failures(pool: PgPool) {
    register_tenant(&pool, "quill").await;

    for _ in 0..5 {
        let response = login(&pool, "owner@quill.test", "wrong-password-1").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(&pool, "owner@quill.test", OWNER_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn refresh_rotates_the_token(pool: PgPool) {
    register_tenant(&pool, "quill").await;
    let json = body_json(login(&pool, "owner@quill.test", OWNER_PASSWORD).await).await;
    let refresh_token = json["data"]["refresh_token"].as_str().unwrap().to_string();

    let body = serde_json::json!({ "refresh_token": refresh_token });
    let response =
        post_json(build_test_app(pool.clone()), "/api/v1/auth/refresh", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["data"]["refresh_token"], refresh_token);

    // The consumed token cannot be replayed.
    let response = post_json(build_test_app(pool), "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    register_tenant(&pool, "quill").await;
    let json = body_json(login(&pool, "owner@quill.test", OWNER_PASSWORD).await).await;
    let access = json["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = json["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/auth/logout",
        serde_json::json!({}),
        &access,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = serde_json::json!({ "refresh_token": refresh });
    let response = post_json(build_test_app(pool), "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn me_lists_role_permissions(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;

    let response = get_auth(build_test_app(pool), "/api/v1/auth/me", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "owner");
    let permissions: Vec<&str> = json["data"]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap())
        .collect();
    assert!(permissions.contains(&"users.manage"));
    assert!(permissions.contains(&"tax_info.manage"));
}

// ---------------------------------------------------------------------------
// User management
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn owner_adds_an_editor_who_can_log_in(pool: PgPool) {
    let (tenant_id, token) = register_tenant(&pool, "quill").await;

    let body = serde_json::json!({
        "email": "ed@quill.test",
        "name": "Ed",
        "password": "editor-pass-123",
        "role": "editor",
    });
    let response = post_json_auth(build_test_app(pool.clone()), "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["data"]["tenant_id"], tenant_id);
    assert!(created["data"].get("password_hash").is_none());

    let response = login(&pool, "ed@quill.test", "editor-pass-123").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn admin_cannot_mint_owners(pool: PgPool) {
    let (_, owner_token) = register_tenant(&pool, "quill").await;
    let body = serde_json::json!({
        "email": "admin@quill.test",
        "name": "Admin",
        "password": "admin-pass-1234",
        "role": "admin",
    });
    let response =
        post_json_auth(build_test_app(pool.clone()), "/api/v1/users", body, &owner_token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(login(&pool, "admin@quill.test", "admin-pass-1234").await).await;
    let admin_token = json["data"]["access_token"].as_str().unwrap().to_string();

    let body = serde_json::json!({
        "email": "boss@quill.test",
        "name": "Boss",
        "password": "boss-pass-12345",
        "role": "owner",
    });
    let response = post_json_auth(build_test_app(pool), "/api/v1/users", body, &admin_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn owner_cannot_deactivate_themselves(pool: PgPool) {
    let (_, token) = register_tenant(&pool, "quill").await;
    let me = body_json(get_auth(build_test_app(pool.clone()), "/api/v1/auth/me", &token).await).await;
    let my_id = me["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/v1/users/{my_id}"),
        serde_json::json!({ "is_active": false }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn users_of_other_tenants_are_invisible(pool: PgPool) {
    let (_, quill_token) = register_tenant(&pool, "quill").await;
    let (_, lantern_token) = register_tenant(&pool, "lantern").await;
    let lantern_me =
        body_json(get_auth(build_test_app(pool.clone()), "/api/v1/auth/me", &lantern_token).await)
            .await;
    let lantern_owner = lantern_me["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/users/{lantern_owner}"),
        serde_json::json!({ "name": "Hijacked" }),
        &quill_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(get_auth(build_test_app(pool), "/api/v1/users", &quill_token).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
