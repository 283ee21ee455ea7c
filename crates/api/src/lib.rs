//! Obesity Prediction API Server
//!
//! REST API that classifies health attributes into obesity categories,
//! records every prediction and serves aggregate statistics.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod routes;
pub mod service;

use crate::config::{AppConfig, LoggingConfig, ModelBackend};
use crate::service::PredictionService;
use feature_codec::FeatureCodec;
use inference_engine::InferenceEngine;
use stats_engine::StatsEngine;
use storage::HistoryStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub stats: Arc<StatsEngine>,
    pub store: Arc<HistoryStore>,
    pub engine: Arc<InferenceEngine>,
    pub codec: FeatureCodec,
    /// Cap on `GET /predictions`
    pub recent_limit: usize,
    pub version: &'static str,
    pub start_time: Instant,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<HistoryStore>, engine: Arc<InferenceEngine>, recent_limit: usize) -> Self {
        Self {
            service: Arc::new(PredictionService::new(engine.clone(), store.clone())),
            stats: Arc::new(StatsEngine::new(store.clone())),
            store,
            engine,
            codec: FeatureCodec::new(),
            recent_limit,
            version: env!("CARGO_PKG_VERSION"),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve a Prometheus recorder at `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub prediction_count: Option<i64>,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub inference: ComponentHealth,
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(routes::predict::predict))
        .route("/predictions", get(routes::predictions::get_predictions))
        .route("/total_predictions", get(routes::predictions::get_total))
        .route("/features", get(routes::features::get_features))
        .route("/predictions/distribution", get(routes::stats::get_distribution))
        .route("/predictions/gender-stats", get(routes::stats::get_gender_stats))
        .route("/predictions/age-stats", get(routes::stats::get_age_stats))
        .route("/predictions/activity-stats", get(routes::stats::get_activity_stats))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (database, prediction_count) = match state.store.count().await {
        Ok(count) => (
            ComponentHealth {
                status: "ok".to_string(),
                detail: None,
            },
            Some(count),
        ),
        Err(e) => {
            warn!("Health check could not reach the store: {}", e);
            (
                ComponentHealth {
                    status: "unavailable".to_string(),
                    detail: None,
                },
                None,
            )
        }
    };
    let healthy = prediction_count.is_some();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            inference: ComponentHealth {
                status: "ok".to_string(),
                detail: Some(state.engine.backend().to_string()),
            },
            database,
        },
        prediction_count,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = config.max_level()?;
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Build the store, classifier and shared state from configuration
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let decoder = config.model.decoder()?;
    let engine = match config.model.backend {
        ModelBackend::Onnx => InferenceEngine::onnx(&config.model.path, decoder)?,
        ModelBackend::Bmi => {
            warn!("Using BMI rules instead of a trained model");
            InferenceEngine::rule_based(decoder)
        }
    };

    let store = HistoryStore::new(config.storage.clone());
    if let Err(e) = store.ensure_connected().await {
        warn!("Prediction store not reachable yet, will retry on demand: {}", e);
    }

    Ok(AppState::new(
        Arc::new(store),
        Arc::new(engine),
        config.server.recent_limit,
    ))
}

/// Run the server
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let metrics = PrometheusBuilder::new().install_recorder()?;
    let state = build_state(&config).await?.with_metrics(metrics);
    let app = create_router(state);

    info!("Starting API server on {}", config.server.addr);

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
