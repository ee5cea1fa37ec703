//! FlowSync Orchestrator Server
//!
//! An async Rust server that sits beside a BPMN process engine and keeps
//! an external to-do system in sync around task completion and process
//! start.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowsync_orchestrator::{
    clients::RestEngineClient,
    config::{AppConfig, UpstreamConfig},
    gateway::HttpTodoGateway,
    handlers,
    model::GraphCache,
    services::{ProcessStartOrchestrator, TaskCompletionOrchestrator, TaskFormService},
    state::AppState,
};

/// Initialize tracing/logging.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flowsync_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router with all routes.
fn build_router(state: AppState) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .with_state(state.clone());

    let task_routes = Router::new()
        .route("/api/tasks/{task_id}/complete", post(handlers::complete_task))
        .route("/api/tasks/{task_id}/form", get(handlers::task_form))
        .route("/api/tasks/{task_id}/variables", get(handlers::task_variables))
        .with_state(state.clone());

    let instance_routes = Router::new()
        .route("/api/process-instances", post(handlers::start_instance))
        .route(
            "/api/query/process-instance",
            post(handlers::query_instance_by_task),
        )
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .merge(task_routes)
        .merge(instance_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting FlowSync Orchestrator"
    );

    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    let upstream_config = UpstreamConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load upstream config, using defaults");
        UpstreamConfig::default()
    });

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        engine_url = %upstream_config.engine_url,
        todo_url = %upstream_config.todo_url,
        "Configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(upstream_config.http_timeout_secs))
        .build()?;

    // One REST client implements all three engine-side ports
    let engine_client = Arc::new(RestEngineClient::new(&upstream_config.engine_url, http.clone()));
    let gateway = Arc::new(HttpTodoGateway::new(&upstream_config.todo_url, http));
    let graphs = Arc::new(GraphCache::new());

    let completion = TaskCompletionOrchestrator::new(
        engine_client.clone(),
        engine_client.clone(),
        engine_client.clone(),
        gateway.clone(),
        graphs.clone(),
    );
    let start = ProcessStartOrchestrator::new(
        engine_client.clone(),
        engine_client.clone(),
        engine_client.clone(),
        gateway,
        graphs,
    );
    let task_forms = TaskFormService::new(engine_client.clone(), engine_client);

    let state = AppState::new(app_config.clone(), completion, start, task_forms);

    let app = build_router(state);

    let addr: SocketAddr = app_config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
