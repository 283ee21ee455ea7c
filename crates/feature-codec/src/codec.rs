//! Feature Vector Assembly

use crate::error::ValidationError;
use crate::record::{
    is_yes, Frequency, InputRecord, Transport, AGE_RANGE, FAF_RANGE, GENDER_VALUES, HEIGHT_RANGE,
    WEIGHT_RANGE, YES_NO_VALUES,
};
use crate::schema::FeatureSchema;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

/// Number of features the classifier consumes
pub const FEATURE_DIMENSION: usize = 11;

/// Feature layout the classifier was trained on
pub const FEATURE_ORDER: [&str; FEATURE_DIMENSION] = [
    "Age",
    "Gender",
    "Height",
    "Weight",
    "FAF",
    "SMOKE",
    "FAVC",
    "family_history_with_overweight",
    "CAEC",
    "CALC",
    "MTRANS",
];

/// Encoded classifier input, one value per entry of [`FEATURE_ORDER`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_DIMENSION],
}

impl FeatureVector {
    /// Encode an already validated record
    pub fn from_record(record: &InputRecord) -> Self {
        let flag = |yes: bool| if yes { 1.0 } else { 0.0 };
        Self {
            values: [
                record.age as f64,
                flag(record.is_male()),
                record.height,
                record.weight,
                record.faf as f64,
                flag(is_yes(&record.smoke)),
                flag(is_yes(&record.favc)),
                flag(is_yes(&record.family_history_with_overweight)),
                f64::from(record.caec.ordinal()),
                f64::from(record.calc.ordinal()),
                f64::from(record.mtrans.ordinal()),
            ],
        }
    }

    pub fn values(&self) -> &[f64; FEATURE_DIMENSION] {
        &self.values
    }

    /// Single precision copy for model runtimes
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }

    /// Look up a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_ORDER
            .iter()
            .position(|f| *f == name)
            .map(|i| self.values[i])
    }

    /// Pairs of feature name and value, in layout order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_ORDER.iter().copied().zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_DIMENSION))?;
        for (name, value) in self.named() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Validates raw request payloads and encodes them for the classifier.
///
/// Stateless; checks run in a fixed order and stop at the first failure:
/// presence of every field, numeric ranges, then enum coercion.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureCodec;

impl FeatureCodec {
    pub fn new() -> Self {
        Self
    }

    /// Canonical feature order exposed to clients
    pub fn feature_order(&self) -> &'static [&'static str] {
        &FEATURE_ORDER
    }

    /// Field rules served to clients building input forms
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new()
    }

    /// Validate a raw payload into an [`InputRecord`]
    pub fn parse(&self, raw: &Map<String, Value>) -> Result<InputRecord, ValidationError> {
        let result = parse_record(raw);
        if let Err(e) = &result {
            debug!("Rejected input: {}", e);
        }
        result
    }

    /// Validate and encode a raw payload
    pub fn encode(&self, raw: &Map<String, Value>) -> Result<FeatureVector, ValidationError> {
        self.parse(raw).map(|record| FeatureVector::from_record(&record))
    }
}

fn parse_record(raw: &Map<String, Value>) -> Result<InputRecord, ValidationError> {
    for field in FEATURE_ORDER {
        require(raw, field)?;
    }

    let age = read_int(raw, "Age")?;
    check_range("Age", age as f64, (AGE_RANGE.0 as f64, AGE_RANGE.1 as f64))?;
    let height = read_float(raw, "Height")?;
    check_range("Height", height, HEIGHT_RANGE)?;
    let weight = read_float(raw, "Weight")?;
    check_range("Weight", weight, WEIGHT_RANGE)?;
    let faf = read_int(raw, "FAF")?;
    check_range("FAF", faf as f64, (FAF_RANGE.0 as f64, FAF_RANGE.1 as f64))?;

    Ok(InputRecord {
        age,
        height,
        weight,
        faf,
        gender: read_text(raw, "Gender", GENDER_VALUES)?,
        smoke: read_text(raw, "SMOKE", YES_NO_VALUES)?,
        favc: read_text(raw, "FAVC", YES_NO_VALUES)?,
        family_history_with_overweight: read_text(
            raw,
            "family_history_with_overweight",
            YES_NO_VALUES,
        )?,
        caec: Frequency::parse("CAEC", &read_text(raw, "CAEC", Frequency::VALUES)?)?,
        calc: Frequency::parse("CALC", &read_text(raw, "CALC", Frequency::VALUES)?)?,
        mtrans: Transport::parse("MTRANS", &read_text(raw, "MTRANS", Transport::VALUES)?)?,
    })
}

/// Null counts as absent.
fn require<'a>(raw: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ValidationError> {
    match raw.get(field) {
        Some(Value::Null) | None => Err(ValidationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn check_range(field: &'static str, value: f64, range: (f64, f64)) -> Result<(), ValidationError> {
    if value < range.0 || value > range.1 {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min: range.0,
            max: range.1,
        })
    } else {
        Ok(())
    }
}

/// Integers arrive as JSON integers, integral floats, or decimal strings.
fn read_int(raw: &Map<String, Value>, field: &'static str) -> Result<i64, ValidationError> {
    let value = require(raw, field)?;
    let invalid = || ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    };
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i),
            None => n
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
                .ok_or_else(invalid),
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn read_float(raw: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    let value = require(raw, field)?;
    let invalid = || ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).ok_or_else(invalid)
}

fn read_text(
    raw: &Map<String, Value>,
    field: &'static str,
    allowed: &'static [&'static str],
) -> Result<String, ValidationError> {
    match require(raw, field)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(ValidationError::InvalidEnum {
            field,
            value: other.to_string(),
            allowed,
        }),
    }
}
