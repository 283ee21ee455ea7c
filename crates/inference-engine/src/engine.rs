//! Inference Engine Implementation

use crate::labels::{ClassLabel, LabelDecoder};
use crate::onnx::OnnxClassifier;
use crate::rules::BmiClassifier;
use crate::InferenceError;
use feature_codec::FeatureVector;
use std::path::Path;
use tracing::{debug, info};

/// A frozen classifier scoring one encoded vector at a time.
///
/// Implementations must be side-effect free; the engine shares a single
/// instance across all request handlers.
pub trait Classifier: Send + Sync {
    /// Raw class index for `features`
    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

/// Result of inference operation
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// Decoded label
    pub label: ClassLabel,
    /// Raw index the classifier produced
    pub class_index: i64,
    /// Inference latency in microseconds
    pub latency_us: u64,
}

/// Classifier plus the decoder matching its training-time label encoding
pub struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    decoder: LabelDecoder,
}

impl InferenceEngine {
    pub fn new(classifier: Box<dyn Classifier>, decoder: LabelDecoder) -> Self {
        info!("Creating inference engine with {} classifier", classifier.name());
        Self { classifier, decoder }
    }

    /// Load a frozen ONNX model artifact
    pub fn onnx(path: impl AsRef<Path>, decoder: LabelDecoder) -> Result<Self, InferenceError> {
        let classifier = OnnxClassifier::load(path)?;
        Ok(Self::new(Box::new(classifier), decoder))
    }

    /// BMI threshold rules, for development without a model artifact
    pub fn rule_based(decoder: LabelDecoder) -> Self {
        let classifier = BmiClassifier::new(decoder.clone());
        Self::new(Box::new(classifier), decoder)
    }

    /// Classify one feature vector. Failures are not retried.
    pub fn predict(&self, features: &FeatureVector) -> Result<InferenceResult, InferenceError> {
        let start = std::time::Instant::now();

        let class_index = self.classifier.predict(features)?;
        let label = self.decoder.decode(class_index)?;

        let latency_us = start.elapsed().as_micros() as u64;
        debug!("Inference produced {} (index {}) in {}us", label, class_index, latency_us);

        Ok(InferenceResult {
            label,
            class_index,
            latency_us,
        })
    }

    pub fn decoder(&self) -> &LabelDecoder {
        &self.decoder
    }

    pub fn backend(&self) -> &str {
        self.classifier.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_codec::FeatureCodec;
    use serde_json::{json, Map, Value};

    struct FixedClassifier(i64);

    impl Classifier for FixedClassifier {
        fn predict(&self, _features: &FeatureVector) -> Result<i64, InferenceError> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn features(height: f64, weight: f64) -> FeatureVector {
        let raw: Map<String, Value> = serde_json::from_value(json!({
            "Age": 30, "Gender": "Male", "Height": height, "Weight": weight, "FAF": 1,
            "SMOKE": "no", "FAVC": "no", "family_history_with_overweight": "no",
            "CAEC": "Never", "CALC": "Never", "MTRANS": "Bike"
        }))
        .unwrap();
        FeatureCodec::new().encode(&raw).unwrap()
    }

    #[test]
    fn test_index_decoded_through_table() {
        let engine = InferenceEngine::new(Box::new(FixedClassifier(4)), LabelDecoder::default());
        let result = engine.predict(&features(1.75, 70.0)).unwrap();
        assert_eq!(result.class_index, 4);
        assert_eq!(result.label, ClassLabel::ObesityTypeIII);
    }

    #[test]
    fn test_unknown_index_is_an_error() {
        let engine = InferenceEngine::new(Box::new(FixedClassifier(42)), LabelDecoder::default());
        let err = engine.predict(&features(1.75, 70.0)).unwrap_err();
        assert!(matches!(err, InferenceError::UnknownClass(42)));
    }

    #[test]
    fn test_rule_based_engine() {
        let engine = InferenceEngine::rule_based(LabelDecoder::default());
        assert_eq!(engine.backend(), "bmi-rules");
        let result = engine.predict(&features(1.75, 70.0)).unwrap();
        assert_eq!(result.label, ClassLabel::NormalWeight);
    }

    #[test]
    fn test_missing_model_artifact() {
        let err = InferenceEngine::onnx("does/not/exist.onnx", LabelDecoder::default())
            .err()
            .unwrap();
        assert!(matches!(err, InferenceError::ModelLoadError(_)));
    }
}
