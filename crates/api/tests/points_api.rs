//! HTTP-level integration tests for the `/points` API endpoints.
//!
//! Uses Axum's tower::ServiceExt to send requests directly to the router.
//! Ledger state is set up through the API itself so each test exercises the
//! full handler -> repository -> database path.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_json};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn grant(app: &axum::Router, user: Uuid, amount: i64, ttl_days: i64) {
    let response = post_json(
        app.clone(),
        "/api/v1/points/add",
        json!({ "user_id": user, "amount": amount, "ttl_days": ttl_days }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn balance_of(app: &axum::Router, user: Uuid) -> i64 {
    let response = get(app.clone(), &format!("/api/v1/points/{user}/balance")).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["total_amount"].as_i64().unwrap()
}

async fn reserve(app: &axum::Router, user: Uuid, amount: i64) -> String {
    let response = post_json(
        app.clone(),
        "/api/v1/points/reserve",
        json!({ "user_id": user, "amount": amount }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["reservation_id"]
        .as_str()
        .unwrap()
        .to_string()
}

// ---------------------------------------------------------------------------
// Test: GET /health reports database health
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_ok(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: POST /points/add creates a deposit and returns it
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn add_points_returns_created_transaction(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    let response = post_json(
        app,
        "/api/v1/points/add",
        json!({ "user_id": user, "amount": 100, "ttl_days": 3 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["user_id"], json!(user));
    assert_eq!(json["amount"], 100);
    assert_eq!(json["remaining_amount"], 100);
    assert_eq!(json["type"], "deposit");
    assert_eq!(json["status"], "completed");
    assert!(json["expires_at"].is_string());
    assert!(json["created_at"].is_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn add_points_without_ttl_never_expires(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/points/add",
        json!({ "user_id": Uuid::new_v4(), "amount": 10, "ttl_days": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json.get("expires_at").is_none());
}

// ---------------------------------------------------------------------------
// Test: validation failures
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn add_points_rejects_non_positive_amount(pool: PgPool) {
    let app = build_test_app(pool);

    for amount in [0, -5] {
        let response = post_json(
            app.clone(),
            "/api/v1/points/add",
            json!({ "user_id": Uuid::new_v4(), "amount": amount, "ttl_days": 0 }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn add_points_rejects_negative_ttl(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/points/add",
        json!({ "user_id": Uuid::new_v4(), "amount": 10, "ttl_days": -1 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../migrations")]
async fn add_points_rejects_malformed_user_id(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/points/add",
        json!({ "user_id": "not-a-uuid", "amount": 10, "ttl_days": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "Bad request: invalid user_id");
}

#[sqlx::test(migrations = "../../migrations")]
async fn withdraw_rejects_non_positive_amount(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/points/withdraw",
        json!({ "user_id": Uuid::new_v4(), "amount": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: withdraw and balance round trip
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn withdraw_reduces_balance(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 100, 0).await;
    assert_eq!(balance_of(&app, user).await, 100);

    let response = post_json(
        app.clone(),
        "/api/v1/points/withdraw",
        json!({ "user_id": user, "amount": 30 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "points withdrawn successfully"
    );

    assert_eq!(balance_of(&app, user).await, 70);
}

#[sqlx::test(migrations = "../../migrations")]
async fn withdraw_beyond_balance_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 70, 0).await;

    let response = post_json(
        app.clone(),
        "/api/v1/points/withdraw",
        json!({ "user_id": user, "amount": 9999 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INSUFFICIENT_FUNDS");

    // The failed debit left the balance untouched.
    assert_eq!(balance_of(&app, user).await, 70);
}

// ---------------------------------------------------------------------------
// Test: balance path id handling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn balance_of_unknown_user_is_zero(pool: PgPool) {
    let app = build_test_app(pool);
    assert_eq!(balance_of(&app, Uuid::new_v4()).await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn balance_with_malformed_path_id_is_404(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(app, "/api/v1/points/not-a-uuid/balance").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../migrations")]
async fn balance_with_nil_path_id_is_404(pool: PgPool) {
    let app = build_test_app(pool);

    let nil = Uuid::nil();
    let response = get(app, &format!("/api/v1/points/{nil}/balance")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: expiring points window
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn expiring_points_defaults_to_seven_days(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 100, 3).await;
    grant(&app, user, 50, 10).await;

    let response = get(app.clone(), &format!("/api/v1/points/{user}/expiring")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["days"], 7);
    let buckets = json["expiring_points"].as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["amount"], 100);
}

#[sqlx::test(migrations = "../../migrations")]
async fn expiring_points_honors_days_param(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 100, 3).await;
    grant(&app, user, 50, 10).await;

    let response = get(
        app.clone(),
        &format!("/api/v1/points/{user}/expiring?days=30"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["days"], 30);
    assert_eq!(json["expiring_points"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn expiring_points_rejects_non_positive_days(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    let response = get(app, &format!("/api/v1/points/{user}/expiring?days=0")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../migrations")]
async fn expiring_points_rejects_malformed_days(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    let response = get(app, &format!("/api/v1/points/{user}/expiring?days=abc")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: reserve / commit / rollback flows
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn reserve_then_commit_keeps_balance(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 100, 0).await;
    let reservation = reserve(&app, user, 50).await;

    // Reserved points leave the available pool immediately.
    assert_eq!(balance_of(&app, user).await, 50);

    let response = post_json(
        app.clone(),
        "/api/v1/points/commit",
        json!({ "reservation_id": reservation }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "reservation committed successfully"
    );

    // Committing does not move the balance again.
    assert_eq!(balance_of(&app, user).await, 50);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reserve_then_rollback_restores_balance(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 100, 0).await;
    let reservation = reserve(&app, user, 50).await;
    assert_eq!(balance_of(&app, user).await, 50);

    let response = post_json(
        app.clone(),
        "/api/v1/points/rollback",
        json!({ "reservation_id": reservation }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "reservation rolled back successfully"
    );

    assert_eq!(balance_of(&app, user).await, 100);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reserve_beyond_balance_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 10, 0).await;

    let response = post_json(
        app,
        "/api/v1/points/reserve",
        json!({ "user_id": user, "amount": 11 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INSUFFICIENT_FUNDS");
}

#[sqlx::test(migrations = "../../migrations")]
async fn commit_of_unknown_reservation_is_404(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/points/commit",
        json!({ "reservation_id": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "reservation not found or already processed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn commit_rejects_malformed_reservation_id(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/points/commit",
        json!({ "reservation_id": "nope" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Bad request: invalid reservation_id"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn double_commit_is_404(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 100, 0).await;
    let reservation = reserve(&app, user, 40).await;

    let first = post_json(
        app.clone(),
        "/api/v1/points/commit",
        json!({ "reservation_id": reservation }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_json(
        app.clone(),
        "/api/v1/points/commit",
        json!({ "reservation_id": reservation }),
    )
    .await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);

    assert_eq!(balance_of(&app, user).await, 60);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rollback_after_rollback_is_404(pool: PgPool) {
    let app = build_test_app(pool);
    let user = Uuid::new_v4();

    grant(&app, user, 100, 0).await;
    let reservation = reserve(&app, user, 40).await;

    let first = post_json(
        app.clone(),
        "/api/v1/points/rollback",
        json!({ "reservation_id": reservation }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_json(
        app.clone(),
        "/api/v1/points/rollback",
        json!({ "reservation_id": reservation }),
    )
    .await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);

    assert_eq!(balance_of(&app, user).await, 100);
}
