//! Statistics Routes

use axum::{extract::State, Json};
use stats_engine::{ActivityStats, AgeBucketStats, GenderStats, LabelCounts};

use crate::error::ApiError;
use crate::AppState;

pub async fn get_distribution(State(state): State<AppState>) -> Result<Json<LabelCounts>, ApiError> {
    let distribution = state
        .stats
        .class_distribution()
        .await
        .map_err(|e| ApiError::internal("failed to compute class distribution", e))?;
    Ok(Json(distribution))
}

pub async fn get_gender_stats(State(state): State<AppState>) -> Result<Json<GenderStats>, ApiError> {
    let stats = state
        .stats
        .gender_stats()
        .await
        .map_err(|e| ApiError::internal("failed to compute gender statistics", e))?;
    Ok(Json(stats))
}

pub async fn get_age_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<AgeBucketStats>>, ApiError> {
    let stats = state
        .stats
        .age_stats()
        .await
        .map_err(|e| ApiError::internal("failed to compute age statistics", e))?;
    Ok(Json(stats))
}

pub async fn get_activity_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActivityStats>>, ApiError> {
    let stats = state
        .stats
        .activity_stats()
        .await
        .map_err(|e| ApiError::internal("failed to compute activity statistics", e))?;
    Ok(Json(stats))
}
