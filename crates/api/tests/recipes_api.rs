//! HTTP-level integration tests for the `/recipes` endpoints.
//!
//! Requests go through the full router via `tower::ServiceExt::oneshot`.
//! Generation runs against a stub provider and an in-memory image store.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, delete, get, post_empty, post_json, seed_user, test_state,
    test_state_with, token_for, wait_for_generation,
};
use serde_json::json;
use souschef_api::state::AppState;
use souschef_db::models::user::CreateUser;
use souschef_db::repositories::UserRepo;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// POST /api/v1/recipes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn create_requires_authentication(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let response = post_json(app, "/api/v1/recipes", json!({ "prompt": "soup" }), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_rejects_oversized_prompt(pool: PgPool) {
    let user = seed_user(&pool, "long").await;
    let app = build_test_app(test_state(pool));
    let prompt = "a".repeat(1001);

    let response = post_json(
        app,
        "/api/v1/recipes",
        json!({ "prompt": prompt }),
        Some(&token_for(user.id)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_rejects_blank_prompt(pool: PgPool) {
    let user = seed_user(&pool, "blank").await;
    let app = build_test_app(test_state(pool));

    let response = post_json(
        app,
        "/api/v1/recipes",
        json!({ "prompt": "   " }),
        Some(&token_for(user.id)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_returns_draft_and_generation_fills_it(pool: PgPool) {
    let user = seed_user(&pool, "chef").await;
    let state = test_state(pool.clone());

    let response = post_json(
        build_test_app(state.clone()),
        "/api/v1/recipes",
        json!({ "prompt": "a warming soup" }),
        Some(&token_for(user.id)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let draft = body_json(response).await;
    let id = draft["data"]["id"].as_i64().unwrap();
    assert!(draft["data"]["title"].is_null());
    assert_eq!(draft["data"]["created_by"], user.id);

    let recipe = wait_for_generation(&pool, id).await.expect("recipe kept");
    assert_eq!(recipe.title.as_deref(), Some("Tomato Soup"));
    assert_eq!(
        recipe.image_url.as_deref(),
        Some(format!("https://images.test/recipes/{id}/image.png").as_str())
    );

    let response = get(build_test_app(state), &format!("/api/v1/recipes/{id}")).await;
    let detail = body_json(response).await;
    assert_eq!(detail["data"]["title"], "Tomato Soup");
    assert_eq!(detail["data"]["owner_username"], "chef");
    assert_eq!(detail["data"]["ingredients"].as_array().unwrap().len(), 2);
    let tags: Vec<_> = detail["data"]["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["hashtag"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(tags, vec!["soup"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn shared_key_users_are_rate_limited(pool: PgPool) {
    let user = seed_user(&pool, "busy").await;
    let state = test_state_with(pool, 2);
    let token = token_for(user.id);

    for _ in 0..2 {
        let response = post_json(
            build_test_app(state.clone()),
            "/api/v1/recipes",
            json!({ "prompt": "pasta" }),
            Some(&token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let response = post_json(
        build_test_app(state),
        "/api/v1/recipes",
        json!({ "prompt": "pasta" }),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["code"], "RATE_LIMITED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn personal_key_users_skip_the_shared_limiter(pool: PgPool) {
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            username: "own-key".into(),
            use_personal_api_key: true,
            encrypted_api_key: Some("c2VhbGVk".into()),
            unit_system: None,
            requirements: None,
        },
    )
    .await
    .unwrap();
    let state = test_state_with(pool, 1);
    let token = token_for(user.id);

    for _ in 0..3 {
        let response = post_json(
            build_test_app(state.clone()),
            "/api/v1/recipes",
            json!({ "prompt": "curry" }),
            Some(&token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_generation_removes_the_draft(pool: PgPool) {
    // Personal key with no decryption key configured: the run rolls back.
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            username: "locked".into(),
            use_personal_api_key: true,
            encrypted_api_key: Some("c2VhbGVk".into()),
            unit_system: None,
            requirements: None,
        },
    )
    .await
    .unwrap();
    let state = test_state(pool.clone());

    let response = post_json(
        build_test_app(state),
        "/api/v1/recipes",
        json!({ "prompt": "curry" }),
        Some(&token_for(user.id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    assert!(wait_for_generation(&pool, id).await.is_none());
}

// ---------------------------------------------------------------------------
// GET /api/v1/recipes/{id} and /history/{history_id}
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn get_unknown_recipe_returns_404(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let response = get(app, "/api/v1/recipes/999999").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn history_lists_the_generation_exchange(pool: PgPool) {
    let user = seed_user(&pool, "historian").await;
    let state = test_state(pool.clone());

    let response = post_json(
        build_test_app(state.clone()),
        "/api/v1/recipes",
        json!({ "prompt": "tomato soup please" }),
        Some(&token_for(user.id)),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    wait_for_generation(&pool, id).await.expect("recipe kept");

    let response = get(build_test_app(state.clone()), &format!("/api/v1/recipes/{id}")).await;
    let detail = body_json(response).await;
    let history_id = detail["data"]["history_id"].as_i64().unwrap();

    let response = get(
        build_test_app(state),
        &format!("/api/v1/recipes/history/{history_id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let entries = body_json(response).await;
    let entries = entries["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["seq"], 1);
    assert_eq!(entries[0]["prompt"], "tomato soup please");
    assert_eq!(entries[0]["response"]["title"], "Tomato Soup");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_history_returns_404(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let response = get(app, "/api/v1/recipes/history/424242").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Trash: DELETE /recipes/{id}, POST /recipes/{id}/restore
// ---------------------------------------------------------------------------

async fn generated_recipe(pool: &PgPool, state: &AppState, token: &str) -> i64 {
    let response = post_json(
        build_test_app(state.clone()),
        "/api/v1/recipes",
        json!({ "prompt": "soup" }),
        Some(token),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    wait_for_generation(pool, id).await.expect("recipe kept");
    id
}

#[sqlx::test(migrations = "../db/migrations")]
async fn only_the_owner_can_delete(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let stranger = seed_user(&pool, "stranger").await;
    let state = test_state(pool.clone());
    let id = generated_recipe(&pool, &state, &token_for(owner.id)).await;
    let uri = format!("/api/v1/recipes/{id}");

    let response = delete(build_test_app(state.clone()), &uri, &token_for(stranger.id)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete(build_test_app(state.clone()), &uri, &token_for(owner.id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(build_test_app(state), &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn restore_brings_a_trashed_recipe_back(pool: PgPool) {
    let owner = seed_user(&pool, "restorer").await;
    let stranger = seed_user(&pool, "nosy").await;
    let state = test_state(pool.clone());
    let token = token_for(owner.id);
    let id = generated_recipe(&pool, &state, &token).await;

    // Not in the trash yet.
    let restore_uri = format!("/api/v1/recipes/{id}/restore");
    let response = post_empty(build_test_app(state.clone()), &restore_uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    delete(build_test_app(state.clone()), &format!("/api/v1/recipes/{id}"), &token).await;

    let response = post_empty(
        build_test_app(state.clone()),
        &restore_uri,
        &token_for(stranger.id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_empty(build_test_app(state.clone()), &restore_uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], id);

    let response = get(build_test_app(state), &format!("/api/v1/recipes/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn restore_after_grace_window_conflicts(pool: PgPool) {
    let owner = seed_user(&pool, "late").await;
    let state = test_state(pool.clone());
    let token = token_for(owner.id);
    let id = generated_recipe(&pool, &state, &token).await;

    sqlx::query("UPDATE recipes SET deleted_at = NOW() - INTERVAL '31 days' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let restore_uri = format!("/api/v1/recipes/{id}/restore");
    let response = post_empty(build_test_app(state), &restore_uri, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
