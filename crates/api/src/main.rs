use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use souschef_core::storage::ImageStore;
use souschef_db::store::{PgRecipeStore, RecipeStore};
use souschef_events::EventBus;
use souschef_pipeline::{CredentialResolver, GenerationConfig, GenerationOrchestrator};
use souschef_provider::{GenerationProvider, OpenAiProvider, ProviderConfig};
use souschef_storage::{S3ImageStore, StorageConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use souschef_api::background;
use souschef_api::config::ServerConfig;
use souschef_api::middleware::rate_limit::{IpRateLimiter, SharedKeyLimiter};
use souschef_api::notifications::NotificationRouter;
use souschef_api::router::build_app_router;
use souschef_api::state::AppState;
use souschef_api::ws::{self, WsManager};

const DEFAULT_LOG_FILTER: &str = "souschef_api=debug,souschef_pipeline=debug,tower_http=debug";

/// How long each background task gets to notice cancellation.
const TASK_STOP_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Configuration loaded");

    let pool = connect_database().await;
    let images: Arc<dyn ImageStore> = Arc::new(
        S3ImageStore::connect(StorageConfig::from_env().expect("S3_BUCKET must be set")).await,
    );

    let event_bus = Arc::new(EventBus::default());
    let orchestrator = Arc::new(build_orchestrator(
        &pool,
        Arc::clone(&images),
        Arc::clone(&event_bus),
    ));

    let ws_manager = Arc::new(WsManager::new());
    let heartbeat = ws::start_heartbeat(Arc::clone(&ws_manager));
    let notifications =
        tokio::spawn(NotificationRouter::new(Arc::clone(&ws_manager)).run(event_bus.subscribe()));

    let ip_limiter = Arc::new(IpRateLimiter::per_ip_default());
    let background_cancel = CancellationToken::new();
    let background_jobs = vec![
        tokio::spawn(background::recipe_purge::run(
            pool.clone(),
            images,
            config.trash_grace_days,
            background_cancel.clone(),
        )),
        tokio::spawn(background::limiter_sweep::run(
            Arc::clone(&ip_limiter),
            background_cancel.clone(),
        )),
    ];

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
        orchestrator: Arc::clone(&orchestrator),
        ip_limiter,
        shared_key_limiter: Arc::new(SharedKeyLimiter::platform_default()),
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Could not bind {addr}: {e}"));
    tracing::info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("HTTP server failed");

    tracing::info!("No longer accepting connections");

    // Cancelled runs roll back and delete their drafts before this returns.
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, orchestrator.shutdown()).await.is_err() {
        tracing::warn!(
            active = orchestrator.active_tasks(),
            "Generation runs still active after the shutdown timeout"
        );
    }

    background_cancel.cancel();
    for job in background_jobs {
        wait_briefly(job).await;
    }

    // The router exits once the last bus sender is gone.
    drop(orchestrator);
    drop(event_bus);
    wait_briefly(notifications).await;

    ws_manager.shutdown_all().await;
    heartbeat.abort();

    tracing::info!("Shutdown complete");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect, verify and migrate. Any failure aborts startup.
async fn connect_database() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = souschef_db::create_pool(&url)
        .await
        .expect("Could not connect to the database");
    souschef_db::health_check(&pool)
        .await
        .expect("Database is not answering queries");
    souschef_db::run_migrations(&pool)
        .await
        .expect("Database migrations failed");

    tracing::info!("Database ready");
    pool
}

fn build_orchestrator(
    pool: &PgPool,
    images: Arc<dyn ImageStore>,
    event_bus: Arc<EventBus>,
) -> GenerationOrchestrator {
    let store: Arc<dyn RecipeStore> = Arc::new(PgRecipeStore::new(pool.clone()));

    let provider_config = ProviderConfig::from_env();
    tracing::info!(
        text_model = %provider_config.text_model,
        image_model = %provider_config.image_model,
        "Provider models selected"
    );
    let provider: Arc<dyn GenerationProvider> = Arc::new(
        OpenAiProvider::new(provider_config).expect("Could not build the provider HTTP client"),
    );

    let credentials = CredentialResolver::from_env()
        .expect("API_KEY_ENCRYPTION_KEY must be a base64-encoded 32-byte key");

    GenerationOrchestrator::new(
        store,
        images,
        provider,
        credentials,
        event_bus,
        GenerationConfig::from_env(),
    )
}

async fn wait_briefly(handle: JoinHandle<()>) {
    if tokio::time::timeout(TASK_STOP_GRACE, handle).await.is_err() {
        tracing::warn!("Background task did not stop in time");
    }
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("SIGINT received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
