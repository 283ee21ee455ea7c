//! Rule-based classifier over body mass index

use crate::engine::Classifier;
use crate::labels::{ClassLabel, LabelDecoder};
use crate::InferenceError;
use feature_codec::FeatureVector;

/// WHO-style BMI bands, upper bound exclusive
const BMI_BANDS: [(f64, ClassLabel); 6] = [
    (18.5, ClassLabel::InsufficientWeight),
    (25.0, ClassLabel::NormalWeight),
    (27.5, ClassLabel::OverweightLevelI),
    (30.0, ClassLabel::OverweightLevelII),
    (35.0, ClassLabel::ObesityTypeI),
    (40.0, ClassLabel::ObesityTypeII),
];

/// Classifies by BMI alone. Used when no model artifact is configured.
pub struct BmiClassifier {
    decoder: LabelDecoder,
}

impl BmiClassifier {
    pub fn new(decoder: LabelDecoder) -> Self {
        Self { decoder }
    }

    pub fn label_for(bmi: f64) -> ClassLabel {
        BMI_BANDS
            .iter()
            .find(|(upper, _)| bmi < *upper)
            .map(|(_, label)| *label)
            .unwrap_or(ClassLabel::ObesityTypeIII)
    }
}

impl Classifier for BmiClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        let (height, weight) = match (features.get("Height"), features.get("Weight")) {
            (Some(h), Some(w)) if h > 0.0 => (h, w),
            _ => {
                return Err(InferenceError::InferenceFailed(
                    "feature vector lacks a usable Height/Weight".into(),
                ))
            }
        };
        let label = Self::label_for(weight / (height * height));
        self.decoder
            .index_of(label)
            .ok_or_else(|| InferenceError::InvalidLabels(format!("{} missing from decoder", label)))
    }

    fn name(&self) -> &str {
        "bmi-rules"
    }
}
