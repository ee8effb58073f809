//! Sensor Registry API Server
//!
//! REST API over the sensor store: registration, lookup, retagging and
//! nearest-sensor queries.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sensor_store::{MemorySensorStore, SensorStore, SqliteSensorStore, StoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod config;
mod error;
mod routes;

pub use crate::config::{AppConfig, LogFormat, LoggingConfig, StoreBackend};
pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    /// Sensor store backend
    pub store: Arc<dyn SensorStore>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus handle, when a recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state around a store
    pub fn new(store: Arc<dyn SensorStore>) -> Self {
        Self {
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .route(
            "/sensor",
            get(routes::sensors::search)
                .put(routes::sensors::create)
                .post(routes::sensors::update),
        )
        .route("/sensor/:id", get(routes::sensors::get_by_id))
        .route("/sensor/:id/tags", get(routes::sensors::get_tags))
        .route("/nearest", get(routes::nearest::nearest))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the configured store backend
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn SensorStore>, StoreError> {
    let store: Arc<dyn SensorStore> = match config.database.backend {
        StoreBackend::Sqlite => Arc::new(
            SqliteSensorStore::connect(
                &config.database.url,
                config.database.max_connections,
                config.database.acquire_timeout(),
                config.store.clone(),
            )
            .await?,
        ),
        StoreBackend::Memory => Arc::new(MemorySensorStore::with_config(config.store.clone())),
    };
    info!(backend = store.backend_name(), "Sensor store ready");
    Ok(store)
}

/// Initialize logging
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error + Send + Sync>> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Run the server until interrupted
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store = build_store(&config).await?;
    let state = Arc::new(AppState::new(store).with_metrics(init_metrics()?));
    let app = create_router(state, config.server.request_timeout());

    info!("Starting API server on {}", config.server.address);

    let listener = tokio::net::TcpListener::bind(&config.server.address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
