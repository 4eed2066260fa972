//! # Authorization HTTP Server
//!
//! Thin HTTP front for the Orgward authorization core. Serves statement
//! enforcement for other backend services and a health probe.
//!
//! ## Endpoints
//!
//! - `POST /v1/enforce` - Decide one request, or an array of requests
//! - `GET /health` - Health check with scope cache statistics
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `RUST_LOG` - Log filter (default: info)
//! - `SCOPE_CACHE_TTL_SECS` - Sliding TTL for the scope cache (default: 60)
//! - `DIRECTORY_FILE` - Optional JSON directory fixture to serve from

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    serve, Router,
};
use orgward_authz::{AuthzCore, AuthzError, CoreConfig, DirectoryFixture, EnforceRequest, InMemoryDirectory};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state
#[derive(Clone)]
struct AppState {
    core: Arc<AuthzCore>,
    start_time: std::time::Instant,
}

/// Error envelope returned for every failed request
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    success: bool,
    msg: String,
}

/// Application error type
#[derive(Debug)]
struct AppError(AuthzError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorBody {
            code,
            success: false,
            msg: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        AppError(err)
    }
}

/// Body of `POST /v1/enforce`: one request or a batch
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnforceBody {
    One(EnforceRequest),
    Many(Vec<EnforceRequest>),
}

/// Reply shape mirrors the body shape
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EnforceReply {
    One(bool),
    Many(Vec<bool>),
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    version: String,
    scope_cache_entries: usize,
    scope_cache_hit_rate: f64,
}

/// POST /v1/enforce - decide enforcement requests
async fn enforce(
    State(state): State<AppState>,
    Json(body): Json<EnforceBody>,
) -> Result<Json<EnforceReply>, AppError> {
    match body {
        EnforceBody::One(request) => {
            let allowed = state.core.enforce(&request).await?;
            info!(
                subject = %request.subject,
                action = %request.action,
                allowed,
                "enforce"
            );
            Ok(Json(EnforceReply::One(allowed)))
        }
        EnforceBody::Many(requests) => {
            let answers = state.core.enforce_batch(&requests).await?;
            info!(count = requests.len(), "enforce batch");
            Ok(Json(EnforceReply::Many(answers)))
        }
    }
}

/// GET /health - health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.core.scope_resolver().stats();

    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: orgward_authz::VERSION.to_string(),
        scope_cache_entries: stats.entries,
        scope_cache_hit_rate: stats.hit_rate(),
    })
}

/// Create the HTTP router with all endpoints
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/v1/enforce", post(enforce))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

/// Load the directory, from the fixture file when one is configured
async fn load_directory() -> anyhow::Result<InMemoryDirectory> {
    match std::env::var("DIRECTORY_FILE") {
        Ok(path) => {
            info!("Loading directory fixture from {}", path);
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading directory fixture {}", path))?;
            let fixture: DirectoryFixture = serde_json::from_str(&raw)
                .with_context(|| format!("parsing directory fixture {}", path))?;
            InMemoryDirectory::from_fixture(fixture)
                .await
                .context("seeding directory fixture")
        }
        Err(_) => {
            info!("DIRECTORY_FILE not set, starting with an empty directory");
            Ok(InMemoryDirectory::new())
        }
    }
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Orgward Authorization Server v{}", orgward_authz::VERSION);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let scope_ttl_secs: u64 = std::env::var("SCOPE_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    info!("Configuration:");
    info!("  Port: {}", port);
    info!("  Scope cache TTL: {}s", scope_ttl_secs);

    let directory = load_directory().await?;

    let config = CoreConfig {
        scope_cache_ttl: Duration::from_secs(scope_ttl_secs),
        ..CoreConfig::default()
    };
    let core = AuthzCore::with_config(Arc::new(directory), config);

    let state = AppState {
        core: Arc::new(core),
        start_time: std::time::Instant::now(),
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Server shut down gracefully");
    Ok(())
}
