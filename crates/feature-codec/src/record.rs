//! Validated Input Record

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Accepted age range in whole years
pub const AGE_RANGE: (i64, i64) = (14, 100);
/// Accepted height range in meters
pub const HEIGHT_RANGE: (f64, f64) = (1.4, 2.2);
/// Accepted weight range in kilograms
pub const WEIGHT_RANGE: (f64, f64) = (40.0, 200.0);
/// Accepted physical activity frequency levels
pub const FAF_RANGE: (i64, i64) = (0, 3);

pub(crate) const GENDER_VALUES: &[&str] = &["Male", "Female"];
pub(crate) const YES_NO_VALUES: &[&str] = &["yes", "no"];

/// Consumption frequency used by CAEC and CALC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Never,
    Sometimes,
    Frequently,
    Always,
}

impl Frequency {
    /// Accepted spellings, in ordinal order
    pub const VALUES: &'static [&'static str] = &["Never", "Sometimes", "Frequently", "Always"];

    /// Parse the exact enum spelling
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        match value {
            "Never" => Ok(Frequency::Never),
            "Sometimes" => Ok(Frequency::Sometimes),
            "Frequently" => Ok(Frequency::Frequently),
            "Always" => Ok(Frequency::Always),
            _ => Err(ValidationError::InvalidEnum {
                field,
                value: value.to_string(),
                allowed: Self::VALUES,
            }),
        }
    }

    /// Rank-preserving integer code
    pub fn ordinal(&self) -> u8 {
        match self {
            Frequency::Never => 0,
            Frequency::Sometimes => 1,
            Frequency::Frequently => 2,
            Frequency::Always => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        Self::VALUES[self.ordinal() as usize]
    }
}

/// Main transportation mode (MTRANS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    Automobile,
    Bike,
    Motorbike,
    #[serde(rename = "Public_Transportation")]
    PublicTransportation,
    Walking,
}

impl Transport {
    /// Accepted spellings, in ordinal order
    pub const VALUES: &'static [&'static str] = &[
        "Automobile",
        "Bike",
        "Motorbike",
        "Public_Transportation",
        "Walking",
    ];

    /// Parse the exact enum spelling
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        match value {
            "Automobile" => Ok(Transport::Automobile),
            "Bike" => Ok(Transport::Bike),
            "Motorbike" => Ok(Transport::Motorbike),
            "Public_Transportation" => Ok(Transport::PublicTransportation),
            "Walking" => Ok(Transport::Walking),
            _ => Err(ValidationError::InvalidEnum {
                field,
                value: value.to_string(),
                allowed: Self::VALUES,
            }),
        }
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            Transport::Automobile => 0,
            Transport::Bike => 1,
            Transport::Motorbike => 2,
            Transport::PublicTransportation => 3,
            Transport::Walking => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        Self::VALUES[self.ordinal() as usize]
    }
}

/// A validated prediction request.
///
/// Field names serialize exactly as callers send them. Gender and the
/// yes/no answers keep the caller's spelling; the encoded feature vector
/// is where they get normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Gender")]
    pub gender: String,
    /// Meters
    #[serde(rename = "Height")]
    pub height: f64,
    /// Kilograms
    #[serde(rename = "Weight")]
    pub weight: f64,
    /// Physical activity frequency, 0-3
    #[serde(rename = "FAF")]
    pub faf: i64,
    #[serde(rename = "SMOKE")]
    pub smoke: String,
    #[serde(rename = "FAVC")]
    pub favc: String,
    pub family_history_with_overweight: String,
    #[serde(rename = "CAEC")]
    pub caec: Frequency,
    #[serde(rename = "CALC")]
    pub calc: Frequency,
    #[serde(rename = "MTRANS")]
    pub mtrans: Transport,
}

impl InputRecord {
    /// Anything other than the exact string "Male" counts as female.
    pub fn is_male(&self) -> bool {
        self.gender == "Male"
    }
}

/// Case-insensitive "yes"; every other answer is "no".
pub(crate) fn is_yes(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_ordinals() {
        for (i, name) in Frequency::VALUES.iter().enumerate() {
            let parsed = Frequency::parse("CAEC", name).unwrap();
            assert_eq!(parsed.ordinal() as usize, i);
            assert_eq!(parsed.as_str(), *name);
        }
        assert_eq!(Frequency::parse("CAEC", "Frequently").unwrap().ordinal(), 2);
    }

    #[test]
    fn test_frequency_is_case_sensitive() {
        let err = Frequency::parse("CALC", "never").unwrap_err();
        assert_eq!(err.field(), "CALC");
    }

    #[test]
    fn test_transport_ordinals() {
        assert_eq!(Transport::parse("MTRANS", "Automobile").unwrap().ordinal(), 0);
        assert_eq!(Transport::parse("MTRANS", "Walking").unwrap().ordinal(), 4);
        assert_eq!(
            Transport::parse("MTRANS", "Public_Transportation").unwrap(),
            Transport::PublicTransportation
        );
        assert!(Transport::parse("MTRANS", "Train").is_err());
    }

    #[test]
    fn test_transport_serializes_with_underscore() {
        let json = serde_json::to_string(&Transport::PublicTransportation).unwrap();
        assert_eq!(json, "\"Public_Transportation\"");
    }

    #[test]
    fn test_yes_is_case_insensitive() {
        assert!(is_yes("yes"));
        assert!(is_yes("YES"));
        assert!(is_yes("Yes"));
        assert!(!is_yes("no"));
        assert!(!is_yes("y"));
    }
}
