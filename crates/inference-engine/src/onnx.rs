//! Frozen ONNX classifier backed by tract

use crate::engine::Classifier;
use crate::InferenceError;
use feature_codec::{FeatureVector, FEATURE_DIMENSION};
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::info;

type RunnableOnnx = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Classifier exported to ONNX (e.g. a scikit-learn forest via skl2onnx).
///
/// Expects a single `float32[1, 11]` input and reads the predicted class
/// index from the first output as `int64`.
pub struct OnnxClassifier {
    plan: RunnableOnnx,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading ONNX model from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, FEATURE_DIMENSION]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)))?;

        info!("Model loaded successfully");
        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        let values = features.to_f32();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, FEATURE_DIMENSION), values)
            .map_err(|e| InferenceError::InvalidInputShape {
                expected: format!("[1, {}]", FEATURE_DIMENSION),
                actual: e.to_string(),
            })?
            .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let labels = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".into()))?;
        let view = labels
            .to_array_view::<i64>()
            .map_err(|e| InferenceError::InferenceFailed(format!("label output: {}", e)))?;

        view.iter()
            .next()
            .copied()
            .ok_or_else(|| InferenceError::InferenceFailed("empty label output".into()))
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
