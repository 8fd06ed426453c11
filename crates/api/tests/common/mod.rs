#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use governor::Quota;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use souschef_api::auth::jwt::{generate_access_token, JwtConfig};
use souschef_api::config::ServerConfig;
use souschef_api::middleware::rate_limit::{IpRateLimiter, SharedKeyLimiter};
use souschef_api::router::build_app_router;
use souschef_api::state::AppState;
use souschef_api::ws::WsManager;
use souschef_core::recipe::{Ingredient, RecipeDef, UnitSystem};
use souschef_core::storage::{ImageStore, StorageError};
use souschef_core::types::DbId;
use souschef_db::models::recipe::Recipe;
use souschef_db::models::user::{CreateUser, User};
use souschef_db::repositories::{RecipeRepo, UserRepo};
use souschef_db::store::PgRecipeStore;
use souschef_events::EventBus;
use souschef_pipeline::{CredentialResolver, GenerationConfig, GenerationOrchestrator};
use souschef_provider::{ApiCredential, GenerationProvider, ProviderError, RecipeRequest};

pub const JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        trash_grace_days: 30,
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Provider that returns a fixed recipe and a tiny PNG.
pub struct StubProvider;

#[async_trait]
impl GenerationProvider for StubProvider {
    async fn generate_recipe(
        &self,
        _request: &RecipeRequest,
        _credential: &ApiCredential,
    ) -> Result<RecipeDef, ProviderError> {
        Ok(stub_recipe())
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _credential: &ApiCredential,
    ) -> Result<Vec<u8>, ProviderError> {
        Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

pub fn stub_recipe() -> RecipeDef {
    RecipeDef {
        title: "Tomato Soup".into(),
        ingredients: vec![
            Ingredient {
                name: "tomatoes".into(),
                unit: "grams".into(),
                amount: 800.0,
            },
            Ingredient {
                name: "onion".into(),
                unit: "pieces".into(),
                amount: 1.0,
            },
        ],
        instructions: vec!["Soften the onion".into(), "Simmer with tomatoes".into()],
        cook_time: 30,
        image_prompt: "A bowl of tomato soup".into(),
        unit_system: UnitSystem::Metric,
        hashtags: vec!["#Soup".into()],
        linked_recipe_suggestions: vec![],
    }
}

/// Object store keeping uploads in memory.
#[derive(Default)]
pub struct MemoryImageStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_deletes: bool,
}

impl MemoryImageStore {
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub fn put(&self, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), vec![1, 2, 3]);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload_image(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(format!("https://images.test/{key}"))
    }

    async fn delete_image(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_deletes {
            return Err(StorageError::Delete {
                key: key.to_string(),
                message: "bucket unavailable".into(),
            });
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// State wired to the test database, the stub provider and an in-memory
/// image store. The shared-key bucket holds `shared_key_burst` tokens that
/// do not refill during a test.
pub fn test_state_with(pool: PgPool, shared_key_burst: u32) -> AppState {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());
    let images: Arc<dyn ImageStore> = Arc::new(MemoryImageStore::default());

    let orchestrator = GenerationOrchestrator::new(
        Arc::new(PgRecipeStore::new(pool.clone())),
        images,
        Arc::new(StubProvider),
        CredentialResolver::new(Some("sk-platform-test".into()), None),
        Arc::clone(&event_bus),
        GenerationConfig {
            timeout: Duration::from_secs(10),
        },
    );

    let burst = std::num::NonZeroU32::new(shared_key_burst).unwrap();
    AppState {
        pool,
        config: Arc::new(config),
        ws_manager: Arc::new(WsManager::new()),
        event_bus,
        orchestrator: Arc::new(orchestrator),
        ip_limiter: Arc::new(IpRateLimiter::per_ip_default()),
        shared_key_limiter: Arc::new(SharedKeyLimiter::new(Quota::per_hour(burst))),
    }
}

pub fn test_state(pool: PgPool) -> AppState {
    test_state_with(pool, 100)
}

/// Full application router, same middleware stack as production.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &PgPool, username: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            use_personal_api_key: false,
            encrypted_api_key: None,
            unit_system: Some("metric".into()),
            requirements: None,
        },
    )
    .await
    .unwrap()
}

pub fn token_for(user_id: DbId) -> String {
    let config = test_config();
    generate_access_token(user_id, &config.jwt).unwrap()
}

/// Poll until the run for `recipe_id` has settled: populated, or gone.
pub async fn wait_for_generation(pool: &PgPool, recipe_id: DbId) -> Option<Recipe> {
    for _ in 0..100 {
        match RecipeRepo::find_by_id(pool, recipe_id).await.unwrap() {
            Some(recipe) if recipe.is_draft() => {}
            Some(recipe) if recipe.image_url.is_none() => {}
            other => return other,
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    RecipeRepo::find_by_id(pool, recipe_id).await.unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, req: Request<Body>) -> Response {
    app.oneshot(req).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn post_empty(app: Router, uri: &str, token: &str) -> Response {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response {
    let req = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
