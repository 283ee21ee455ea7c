//! Feature Schema Route

use axum::{extract::State, Json};
use feature_codec::FeatureSchema;

use crate::AppState;

/// Feature order and per-field validation rules
pub async fn get_features(State(state): State<AppState>) -> Json<FeatureSchema> {
    Json(state.codec.schema())
}
