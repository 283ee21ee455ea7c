//! Feature Codec
//!
//! Validates raw prediction requests and encodes them into the fixed
//! numeric layout the frozen classifier was trained on.

mod codec;
mod error;
mod record;
mod schema;

pub use codec::{FeatureCodec, FeatureVector, FEATURE_DIMENSION, FEATURE_ORDER};
pub use error::ValidationError;
pub use record::{Frequency, InputRecord, Transport};
pub use schema::{FeatureSchema, FieldRule};
