//! Prediction Route

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;

use crate::error::ApiError;
use crate::service::PredictionResult;
use crate::AppState;

/// Classify one input record
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let raw = match payload {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("request body must be a JSON object")),
    };

    let result = state.service.classify(&raw).await?;
    Ok(Json(result))
}
