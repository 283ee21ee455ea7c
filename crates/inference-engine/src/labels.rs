//! Class Labels and Index Decoding

use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Obesity category predicted by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassLabel {
    #[serde(rename = "Insufficient_Weight")]
    InsufficientWeight,
    #[serde(rename = "Normal_Weight")]
    NormalWeight,
    #[serde(rename = "Overweight_Level_I")]
    OverweightLevelI,
    #[serde(rename = "Overweight_Level_II")]
    OverweightLevelII,
    #[serde(rename = "Obesity_Type_I")]
    ObesityTypeI,
    #[serde(rename = "Obesity_Type_II")]
    ObesityTypeII,
    #[serde(rename = "Obesity_Type_III")]
    ObesityTypeIII,
}

impl ClassLabel {
    /// Every label, in reporting order
    pub const ALL: [ClassLabel; 7] = [
        ClassLabel::InsufficientWeight,
        ClassLabel::NormalWeight,
        ClassLabel::OverweightLevelI,
        ClassLabel::OverweightLevelII,
        ClassLabel::ObesityTypeI,
        ClassLabel::ObesityTypeII,
        ClassLabel::ObesityTypeIII,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::InsufficientWeight => "Insufficient_Weight",
            ClassLabel::NormalWeight => "Normal_Weight",
            ClassLabel::OverweightLevelI => "Overweight_Level_I",
            ClassLabel::OverweightLevelII => "Overweight_Level_II",
            ClassLabel::ObesityTypeI => "Obesity_Type_I",
            ClassLabel::ObesityTypeII => "Obesity_Type_II",
            ClassLabel::ObesityTypeIII => "Obesity_Type_III",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClassLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| InferenceError::InvalidLabels(format!("unknown class label {:?}", s)))
    }
}

/// Maps raw classifier output indices back to labels.
///
/// The table must match the encoder used at training time. The default is
/// the alphabetical order a scikit-learn `LabelEncoder` produces.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDecoder {
    classes: Vec<ClassLabel>,
}

impl LabelDecoder {
    /// Build a decoder from an index-ordered table covering every class once
    pub fn new(classes: Vec<ClassLabel>) -> Result<Self, InferenceError> {
        for label in ClassLabel::ALL {
            let occurrences = classes.iter().filter(|c| **c == label).count();
            if occurrences != 1 {
                return Err(InferenceError::InvalidLabels(format!(
                    "{} appears {} times, expected once",
                    label, occurrences
                )));
            }
        }
        Ok(Self { classes })
    }

    /// Build a decoder from label names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, InferenceError> {
        let classes = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<ClassLabel>, _>>()?;
        Self::new(classes)
    }

    pub fn decode(&self, index: i64) -> Result<ClassLabel, InferenceError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.classes.get(i))
            .copied()
            .ok_or(InferenceError::UnknownClass(index))
    }

    /// Index the classifier uses for `label`
    pub fn index_of(&self, label: ClassLabel) -> Option<i64> {
        self.classes
            .iter()
            .position(|c| *c == label)
            .map(|i| i as i64)
    }

    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }
}

impl Default for LabelDecoder {
    fn default() -> Self {
        Self {
            classes: vec![
                ClassLabel::InsufficientWeight,
                ClassLabel::NormalWeight,
                ClassLabel::ObesityTypeI,
                ClassLabel::ObesityTypeII,
                ClassLabel::ObesityTypeIII,
                ClassLabel::OverweightLevelI,
                ClassLabel::OverweightLevelII,
            ],
        }
    }
}
