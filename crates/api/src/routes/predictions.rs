//! Prediction History Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;
use storage::PredictionRecord;

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Maximum number of records, capped by the configured limit
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub total_predictions: i64,
}

/// Most recent predictions, newest first
pub async fn get_predictions(
    State(state): State<AppState>,
    Query(params): Query<PredictionQuery>,
) -> Result<Json<Vec<PredictionRecord>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(state.recent_limit)
        .min(state.recent_limit);

    let records = state
        .store
        .recent(limit)
        .await
        .map_err(|e| ApiError::internal("failed to retrieve prediction history", e))?;
    Ok(Json(records))
}

/// Number of stored predictions
pub async fn get_total(State(state): State<AppState>) -> Result<Json<TotalResponse>, ApiError> {
    let total = state
        .stats
        .total()
        .await
        .map_err(|e| ApiError::internal("failed to count predictions", e))?;
    Ok(Json(TotalResponse {
        total_predictions: total,
    }))
}
