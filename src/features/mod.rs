//! Feature contract and request → feature vector assembly.

mod builder;
mod schema;
mod timestamp;

pub use builder::{FeatureBuilder, RawRequest};
pub use schema::{FeatureKind, FeatureSchema, FeatureSource, FeatureSpec, ValueRange};
pub use timestamp::hour_of_day;

pub(crate) use schema::SchemaDocument;

use crate::error::ScoringError;
use serde::Serialize;

/// Model input aligned 1:1 with a [`FeatureSchema`].
///
/// Only built by [`FeatureBuilder`] or [`FeatureVector::from_values`], both of
/// which guarantee the length matches the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: Vec<f64>,
    defaulted: Vec<String>,
}

impl FeatureVector {
    /// Wrap raw values already in schema order.
    pub fn from_values(schema: &FeatureSchema, values: Vec<f64>) -> Result<Self, ScoringError> {
        if values.len() != schema.len() {
            return Err(ScoringError::schema_mismatch(format!(
                "vector has {} values, schema {} declares {}",
                values.len(),
                schema.version(),
                schema.len()
            )));
        }
        Ok(Self {
            values,
            defaulted: Vec::new(),
        })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Schema names whose values came from schema defaults, in schema order.
    pub fn defaulted_fields(&self) -> &[String] {
        &self.defaulted
    }
}
