//! Client-facing field rules

use crate::codec::FEATURE_ORDER;
use crate::record::{
    Frequency, Transport, AGE_RANGE, FAF_RANGE, GENDER_VALUES, HEIGHT_RANGE, WEIGHT_RANGE,
    YES_NO_VALUES,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Validation rule for a single input field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRule {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<&'static [&'static str]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl FieldRule {
    fn integer(range: (i64, i64)) -> Self {
        Self {
            kind: "integer",
            min: Some(range.0 as f64),
            max: Some(range.1 as f64),
            unit: None,
            values: None,
            description: None,
        }
    }

    fn float(range: (f64, f64), unit: &'static str) -> Self {
        Self {
            kind: "float",
            min: Some(range.0),
            max: Some(range.1),
            unit: Some(unit),
            values: None,
            description: None,
        }
    }

    fn one_of(values: &'static [&'static str]) -> Self {
        Self {
            kind: "string",
            min: None,
            max: None,
            unit: None,
            values: Some(values),
            description: None,
        }
    }
}

/// Feature order plus the rule for every required field
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSchema {
    pub feature_order: &'static [&'static str],
    #[serde(serialize_with = "ordered_rules")]
    pub required_fields: Vec<(&'static str, FieldRule)>,
}

impl FeatureSchema {
    pub fn new() -> Self {
        let faf = FieldRule {
            description: Some("0=none, 1=1-2 days, 2=3-4 days, 3=5+ days"),
            ..FieldRule::integer(FAF_RANGE)
        };
        Self {
            feature_order: &FEATURE_ORDER,
            required_fields: vec![
                ("Age", FieldRule::integer(AGE_RANGE)),
                ("Gender", FieldRule::one_of(GENDER_VALUES)),
                ("Height", FieldRule::float(HEIGHT_RANGE, "meters")),
                ("Weight", FieldRule::float(WEIGHT_RANGE, "kg")),
                ("FAF", faf),
                ("SMOKE", FieldRule::one_of(YES_NO_VALUES)),
                ("FAVC", FieldRule::one_of(YES_NO_VALUES)),
                ("family_history_with_overweight", FieldRule::one_of(YES_NO_VALUES)),
                ("CAEC", FieldRule::one_of(Frequency::VALUES)),
                ("CALC", FieldRule::one_of(Frequency::VALUES)),
                ("MTRANS", FieldRule::one_of(Transport::VALUES)),
            ],
        }
    }

    pub fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.required_fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, rule)| rule)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new()
    }
}

fn ordered_rules<S: Serializer>(
    rules: &[(&'static str, FieldRule)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(rules.len()))?;
    for (name, rule) in rules {
        map.serialize_entry(name, rule)?;
    }
    map.end()
}
