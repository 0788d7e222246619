//! Drive Monitor API Server
//!
//! REST API for the driver monitoring dashboard. The dashboard owns the
//! camera and pushes stills; this server runs the sampling loop.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use classifier::{ClassifierClient, HttpBackend};
use media_capture::CaptureState;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use mitigation::PacedPlayer;
use serde::Serialize;
use session::MonitoringSession;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod routes;
mod settings;

pub use error::ApiError;
pub use settings::{AppConfig, DmsPreset, LoggingConfig, ServerConfig};

/// Application state shared across handlers
pub struct AppState {
    pub session: MonitoringSession,
    /// Same player the session's mitigations play through
    pub player: Arc<PacedPlayer>,
    /// Absent when no global recorder was installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(session: MonitoringSession, player: Arc<PacedPlayer>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            session,
            player,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    /// Wire a session against the HTTP inference backend
    pub fn from_config(config: &AppConfig, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let backend = HttpBackend::new(config.backend.clone())?;
        let client = ClassifierClient::new(Arc::new(backend));
        let player = Arc::new(PacedPlayer::new());
        let session = MonitoringSession::builder(config.session.clone(), client, player.clone())
            .dms(config.dms_config())
            .alerts(config.alerts.clone())
            .build();
        Ok(Self::new(session, player, metrics))
    }
}

/// Health response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub session_running: bool,
    pub capture: CaptureState,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/capture/permission", post(routes::capture::set_permission))
        .route("/api/v1/capture/frame", post(routes::capture::push_frame))
        .route("/api/v1/capture/pause", post(routes::capture::pause))
        .route("/api/v1/capture/resume", post(routes::capture::resume))
        .route("/api/v1/session/start", post(routes::session::start))
        .route("/api/v1/session/stop", post(routes::session::stop))
        .route("/api/v1/session/status", get(routes::session::status))
        .route("/api/v1/alerts/acknowledge", post(routes::alerts::acknowledge))
        .route("/api/v1/alerts/buzzer", get(routes::alerts::buzzer))
        .route("/api/v1/notices", get(routes::alerts::get_notices))
        .route("/api/v1/notices/:id", delete(routes::alerts::dismiss_notice))
        .route("/api/v1/mitigation", post(routes::session::trigger_mitigation))
        .route("/api/v1/summary", post(routes::session::summarize))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        session_running: state.session.is_running(),
        capture: state.session.status().capture,
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let result = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the server
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let metrics = PrometheusBuilder::new().install_recorder()?;
    let state = Arc::new(AppState::from_config(&config, Some(metrics))?);
    let app = create_router(state.clone());

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session.stop();
    info!("API server stopped");
    Ok(())
}
