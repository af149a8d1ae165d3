//! # Demo HTTP server
//!
//! Runs the provider behind a trusting reverse proxy.
//!
//! ## Endpoints
//!
//! - `GET /whoami` - Reconcile the proxy-asserted identity with the session cookie
//! - `GET /health` - Liveness and directory counts
//! - `GET /metrics` - Prometheus text format metrics
//!
//! ## Example
//!
//! ```no_run
//! use vouch::config::VouchConfig;
//! use vouch::server::{create_router, AppState};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(VouchConfig::default());
//! let state = Arc::new(AppState::new(config)?);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8300").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod whoami;

pub use error::{ApiError, ApiErrorBody};

use crate::config::{ConfigError, VouchConfig};
use crate::directory::{Directory, MemorySessions};
use crate::identity::RemoteIdentityProvider;
use crate::metrics::PrometheusHandle;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<VouchConfig>,
    pub directory: Arc<Directory>,
    pub sessions: Arc<MemorySessions>,
    pub provider: Arc<RemoteIdentityProvider>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    pub prometheus_handle: PrometheusHandle,
}

impl AppState {
    /// Build the directory, session store and provider from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for a bad directory seed or provider
    /// section.
    pub fn new(config: Arc<VouchConfig>) -> Result<Self, ConfigError> {
        let directory = Directory::from_config(&config.directory).map_err(|e| {
            ConfigError::Validation {
                field: "directory.users".to_string(),
                message: e.to_string(),
            }
        })?;
        let directory = Arc::new(directory);
        let sessions = Arc::new(
            MemorySessions::new(directory.clone())
                .with_ttl(Duration::from_secs(config.directory.session_ttl_secs)),
        );
        let provider = Arc::new(RemoteIdentityProvider::from_config(
            &config.provider,
            directory.clone(),
            sessions.clone(),
        )?);

        // A global recorder may already be installed (tests, embedding)
        let prometheus_handle = crate::metrics::setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, using detached handle: {}", e);
            crate::metrics::detached_handle()
        });

        Ok(Self {
            config,
            directory,
            sessions,
            provider,
            start_time: Instant::now(),
            prometheus_handle,
        })
    }
}

/// Create the router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/whoami", get(whoami::handle))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub users: usize,
    pub sessions: usize,
    pub pending_syncs: usize,
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        users: state.directory.user_count(),
        sessions: state.sessions.len(),
        pending_syncs: state.provider.pending_syncs(),
    })
}

/// GET /metrics (Prometheus text format)
async fn render_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.prometheus_handle.render(),
    )
}
