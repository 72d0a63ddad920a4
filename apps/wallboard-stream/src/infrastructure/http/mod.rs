//! HTTP & WebSocket API
//!
//! One axum router serves market data, the subscriber stream and the
//! operational endpoints.
//!
//! # Endpoints
//!
//! - `GET /data/snapshot` - Full snapshot as JSON (503 on build failure)
//! - `GET /data/a-shares` - Mainland benchmark indices decorated for display
//! - `GET /data/latest` - Wallboard view: A-share board plus FX, commodities,
//!   US stocks and summary
//! - `GET /ws/stream` - WebSocket upgrade for live snapshots
//! - `GET /ws/status` - Subscriber count and broadcast loop state
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (fails once shutdown starts)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::SnapshotService;
use crate::domain::market::{CategoryPayload, IndexBoard, MarketSummary};
use crate::domain::subscription::RegistryStatus;
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::websocket::{ConnectionSettings, serve_socket};

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Active market data provider.
    pub provider: &'static str,
    /// Subscriber registry state.
    pub subscribers: RegistryStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving live data.
    Healthy,
    /// Serving, but without an upstream data source.
    Degraded,
    /// Shutting down.
    Unhealthy,
}

/// Body of `/data/a-shares`.
#[derive(Debug, Clone, Serialize)]
pub struct AShareView {
    /// Snapshot time.
    pub timestamp: DateTime<Utc>,
    /// Decorated benchmark indices keyed by code.
    pub indices: IndexBoard,
    /// Number of entries in `indices`.
    pub count: usize,
}

/// Body of `/data/latest`.
#[derive(Debug, Clone, Serialize)]
pub struct LatestView {
    /// Snapshot time.
    pub timestamp: DateTime<Utc>,
    /// Decorated A-share benchmarks.
    pub a_shares: IndexBoard,
    /// FX rates.
    pub fx: CategoryPayload,
    /// Commodity futures.
    pub commodities: CategoryPayload,
    /// US indices and stocks.
    pub us_stocks: CategoryPayload,
    /// Breadth summary.
    pub summary: MarketSummary,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for request handlers.
pub struct ApiState {
    version: String,
    started_at: Instant,
    service: SnapshotService,
    provider: &'static str,
    connection: ConnectionSettings,
    shutdown: CancellationToken,
}

impl ApiState {
    /// Create handler state. `shutdown` also closes open WebSocket streams.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        service: SnapshotService,
        provider: &'static str,
        connection: ConnectionSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            version: version.into(),
            started_at: Instant::now(),
            service,
            provider,
            connection,
            shutdown,
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// Build the application router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/data/snapshot", get(snapshot_handler))
        .route("/data/a-shares", get(a_shares_handler))
        .route("/data/latest", get(latest_handler))
        .route("/ws/stream", get(stream_handler))
        .route("/ws/status", get(stream_status_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// HTTP server for the wallboard API.
pub struct ApiServer {
    port: u16,
    state: Arc<ApiState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<ApiState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Bind the configured port and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ApiServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiServerError::BindFailed(self.port, e.to_string()))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiServerError::ServerFailed` on a fatal server error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ApiServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ApiServerError::ServerFailed(e.to_string()))?;
        tracing::info!(addr = %local_addr, "API server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ApiServerError::ServerFailed(e.to_string()))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn snapshot_handler(State(state): State<Arc<ApiState>>) -> Response {
    match state.service.get_snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => snapshot_unavailable(&e),
    }
}

async fn a_shares_handler(State(state): State<Arc<ApiState>>) -> Response {
    match state.service.get_snapshot().await {
        Ok(snapshot) => {
            let indices = snapshot.a_share_board();
            Json(AShareView {
                timestamp: snapshot.timestamp,
                count: indices.len(),
                indices,
            })
            .into_response()
        }
        Err(e) => snapshot_unavailable(&e),
    }
}

async fn latest_handler(State(state): State<Arc<ApiState>>) -> Response {
    match state.service.get_snapshot().await {
        Ok(snapshot) => Json(LatestView {
            timestamp: snapshot.timestamp,
            a_shares: snapshot.a_share_board(),
            fx: snapshot.fx.clone(),
            commodities: snapshot.commodities.clone(),
            us_stocks: snapshot.us_stocks.clone(),
            summary: snapshot.summary,
        })
        .into_response(),
        Err(e) => snapshot_unavailable(&e),
    }
}

fn snapshot_unavailable(error: &impl std::fmt::Display) -> Response {
    tracing::warn!(error = %error, "Snapshot request failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: format!("Failed to fetch snapshot: {error}"),
        }),
    )
        .into_response()
}

async fn stream_handler(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> Response {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    let service = state.service.clone();
    let connection = state.connection;
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, service, connection, shutdown))
}

async fn stream_status_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.service.status())
}

async fn health_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    if state.shutdown.is_cancelled() {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    } else {
        (StatusCode::OK, "READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

fn build_health_response(state: &ApiState) -> HealthResponse {
    HealthResponse {
        status: determine_health_status(state.shutdown.is_cancelled(), state.provider),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        provider: state.provider,
        subscribers: state.service.status(),
    }
}

fn determine_health_status(shutting_down: bool, provider: &str) -> HealthStatus {
    if shutting_down {
        HealthStatus::Unhealthy
    } else if provider == "null" {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

// =============================================================================
// Errors
// =============================================================================

/// API server errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
