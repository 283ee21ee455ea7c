//! Storage Layer
//!
//! Append-only prediction history on SQLite, with a small typed builder
//! for the grouped aggregations the statistics views run.

mod history;
mod query;

pub use history::{HistoryStore, NewPrediction, PredictionRecord, StoreConfig};
pub use query::{AggregateQuery, AggregateRow, Column, GroupKey, GroupValue, Metric, MetricValue, NumericColumn};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    Query(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StorageError::Unavailable(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::Corrupt(e.to_string())
            }
            other => StorageError::Query(other.to_string()),
        }
    }
}
