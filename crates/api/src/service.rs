//! Prediction Service
//!
//! validate → encode → classify → persist → respond, for one request.

use chrono::Utc;
use feature_codec::{FeatureCodec, FeatureVector, ValidationError};
use inference_engine::{ClassLabel, InferenceEngine, InferenceError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use storage::{HistoryStore, NewPrediction, StorageError};
use thiserror::Error;
use tracing::debug;

/// Failures of a single prediction request
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Classifier failure: {0}")]
    Classifier(#[from] InferenceError),
    #[error("History store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Failed to persist prediction: {0}")]
    Persistence(String),
}

impl PredictionError {
    /// Metric label for the failure
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Validation(_) => "validation",
            PredictionError::Classifier(_) => "classifier",
            PredictionError::StoreUnavailable(_) => "store_unavailable",
            PredictionError::Persistence(_) => "persistence",
        }
    }
}

impl From<StorageError> for PredictionError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Unavailable(detail) => PredictionError::StoreUnavailable(detail),
            other => PredictionError::Persistence(other.to_string()),
        }
    }
}

/// Successful prediction response
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub prediction: ClassLabel,
    pub prediction_id: String,
    pub features_used: &'static [&'static str],
}

/// Classifies and records prediction requests
pub struct PredictionService {
    codec: FeatureCodec,
    engine: Arc<InferenceEngine>,
    store: Arc<HistoryStore>,
}

impl PredictionService {
    pub fn new(engine: Arc<InferenceEngine>, store: Arc<HistoryStore>) -> Self {
        Self {
            codec: FeatureCodec::new(),
            engine,
            store,
        }
    }

    /// Classify a raw request and persist the outcome.
    ///
    /// A failed insert fails the whole request even though a label was
    /// already computed.
    pub async fn classify(&self, raw: &Map<String, Value>) -> Result<PredictionResult, PredictionError> {
        let start = Instant::now();
        let result = self.run(raw).await;

        match &result {
            Ok(outcome) => {
                metrics::counter!("predictions_total", "label" => outcome.prediction.as_str())
                    .increment(1);
                metrics::histogram!("prediction_latency_seconds")
                    .record(start.elapsed().as_secs_f64());
            }
            Err(e) => {
                metrics::counter!("prediction_failures_total", "kind" => e.kind()).increment(1);
            }
        }
        result
    }

    async fn run(&self, raw: &Map<String, Value>) -> Result<PredictionResult, PredictionError> {
        let input = self.codec.parse(raw)?;
        let features = FeatureVector::from_record(&input);

        let inference = self.engine.predict(&features)?;
        debug!("Classified request as {}", inference.label);

        let record = NewPrediction {
            input,
            features,
            label: inference.label,
            created_at: Utc::now(),
        };
        let prediction_id = self.store.insert(&record).await?;

        Ok(PredictionResult {
            prediction: inference.label,
            prediction_id,
            features_used: self.codec.feature_order(),
        })
    }
}
