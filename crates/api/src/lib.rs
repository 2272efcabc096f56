//! SecOps API Server
//!
//! REST API for the device registry, alert-handling policies, alert
//! ingestion and processing, and drone command stubs.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use data_validator::Validator;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limit;
mod routes;

pub use self::config::Settings;
pub use logging::init_logging;

use error::json_error;
use rate_limit::create_governor_config;
use storage::Repository;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Arc<dyn Repository>,
    /// Payload validator
    pub validator: Validator,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus exporter, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state around a repository
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            validator: Validator::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Use a specific validator
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Expose metrics through the given exporter handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/devices",
            get(routes::devices::list_devices).post(routes::devices::create_device),
        )
        .route("/devices/:id/heartbeat", post(routes::devices::heartbeat))
        .route(
            "/policies",
            get(routes::policies::list_policies).post(routes::policies::create_policy),
        )
        .route(
            "/alerts",
            get(routes::alerts::list_alerts).post(routes::alerts::receive_alert),
        )
        .route("/alerts/process", post(routes::alerts::process_alert))
        .route("/actions/rth", post(routes::actions::return_to_home))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler; also verifies the store is reachable
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.repository.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "ok",
            version: state.version.clone(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        })
        .into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "error", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => json_error(StatusCode::NOT_FOUND, "metrics are not enabled"),
    }
}

async fn not_found_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// Run the server until Ctrl-C
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let repository = storage::open(&settings.database.url, settings.database.max_connections)
        .await
        .context("failed to open store")?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let state = Arc::new(
        AppState::new(repository)
            .with_validator(Validator::new(settings.validation.clone()))
            .with_metrics(metrics),
    );

    let mut app = create_router(state);
    if settings.rate_limit.enabled {
        let config = create_governor_config(&settings.rate_limit)?;
        info!(
            "Rate limiting enabled (burst {}, one request per {}s)",
            settings.rate_limit.burst_size, settings.rate_limit.per_second
        );
        app = app.layer(GovernorLayer { config });
    }

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting API server on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
