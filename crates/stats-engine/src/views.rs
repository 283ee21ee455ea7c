//! Statistics view types

use inference_engine::ClassLabel;
use serde::Serialize;
use std::collections::BTreeMap;

/// Age bucket boundaries; the last bucket is open-ended
pub const AGE_BOUNDARIES: [i64; 7] = [14, 20, 30, 40, 50, 60, 100];

/// Bucket labels, one per bucket in ascending order
pub const AGE_RANGES: [&str; 6] = ["14-19", "20-29", "30-39", "40-49", "50-59", "60+"];

/// Per-label counts. Keys iterate and serialize in class order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct LabelCounts(BTreeMap<ClassLabel, i64>);

impl LabelCounts {
    /// Every class present with a count of zero
    pub fn zero_filled() -> Self {
        Self(ClassLabel::ALL.iter().map(|label| (*label, 0)).collect())
    }

    pub fn add(&mut self, label: ClassLabel, count: i64) {
        *self.0.entry(label).or_insert(0) += count;
    }

    pub fn get(&self, label: ClassLabel) -> Option<i64> {
        self.0.get(&label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassLabel, i64)> + '_ {
        self.0.iter().map(|(label, count)| (*label, *count))
    }
}

/// Prediction counts per gender, then per label
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct GenderStats(BTreeMap<String, LabelCounts>);

impl GenderStats {
    pub fn add(&mut self, gender: &str, label: ClassLabel, count: i64) {
        self.0.entry(gender.to_string()).or_default().add(label, count);
    }

    pub fn get(&self, gender: &str) -> Option<&LabelCounts> {
        self.0.get(gender)
    }

    pub fn genders(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// One age bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBucketStats {
    pub age_range: &'static str,
    pub count: i64,
    /// Mean weight rounded to one decimal, 0 for an empty bucket
    pub avg_weight: f64,
    pub predictions: Vec<ClassLabel>,
}

impl AgeBucketStats {
    pub(crate) fn empty(age_range: &'static str) -> Self {
        Self {
            age_range,
            count: 0,
            avg_weight: 0.0,
            predictions: Vec::new(),
        }
    }
}

/// One physical activity level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStats {
    pub activity_level: Option<&'static str>,
    /// Mean weight rounded to the nearest kilogram
    pub avg_weight: i64,
    pub count: i64,
}

/// Readable name of a FAF level
pub fn activity_label(faf: i64) -> Option<&'static str> {
    match faf {
        0 => Some("Sedentary"),
        1 => Some("Light (1-2 days)"),
        2 => Some("Moderate (3-4 days)"),
        3 => Some("Active (5+ days)"),
        _ => None,
    }
}
