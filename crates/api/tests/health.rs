//! Integration tests for the health endpoint and the shared middleware stack.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, test_state};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn health_check_returns_ok_with_json(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["active_generation_tasks"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_route_returns_404(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn response_contains_x_request_id_header(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("response must carry x-request-id");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn websocket_requires_a_valid_token(pool: PgPool) {
    let state = test_state(pool);

    let missing = get(build_test_app(state.clone()), "/api/v1/ws").await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let invalid = get(build_test_app(state), "/api/v1/ws?token=not-a-jwt").await;
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(invalid).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}
