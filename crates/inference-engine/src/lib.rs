//! Obesity Inference Engine
//!
//! Scores encoded feature vectors against a frozen classifier and decodes
//! the raw class index into one of the seven obesity categories.

mod engine;
mod labels;
mod onnx;
mod rules;

pub use engine::{Classifier, InferenceEngine, InferenceResult};
pub use labels::{ClassLabel, LabelDecoder};
pub use onnx::OnnxClassifier;
pub use rules::BmiClassifier;

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Classifier returned unknown class index {0}")]
    UnknownClass(i64),
    #[error("Invalid label table: {0}")]
    InvalidLabels(String),
}
