//! Request → feature vector: validate coordinates, derive hour, fill context.

use super::{hour_of_day, FeatureSchema, FeatureSource, FeatureSpec, FeatureVector};
use crate::error::ScoringError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const LATITUDE_BOUNDS: (f64, f64) = (-90.0, 90.0);
const LONGITUDE_BOUNDS: (f64, f64) = (-180.0, 180.0);

/// Inbound scoring request. Contextual features are top-level keys; `null`
/// means "not measured" and takes the schema default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    #[serde(flatten)]
    pub context: BTreeMap<String, Option<f64>>,
}

impl RawRequest {
    pub fn new(timestamp: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: timestamp.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, name: impl Into<String>, value: f64) -> Self {
        self.context.insert(name.into(), Some(value));
        self
    }
}

pub struct FeatureBuilder {
    schema: Arc<FeatureSchema>,
}

impl FeatureBuilder {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn build(&self, request: &RawRequest) -> Result<FeatureVector, ScoringError> {
        let hour = hour_of_day(&request.timestamp)?;
        check_coordinate("latitude", request.latitude, LATITUDE_BOUNDS)?;
        check_coordinate("longitude", request.longitude, LONGITUDE_BOUNDS)?;

        for name in request.context.keys() {
            match self.schema.get(name) {
                Some(spec) if spec.source == FeatureSource::Context => {}
                Some(spec) => {
                    return Err(ScoringError::invalid_feature(
                        name,
                        format!("derived from {}, cannot be supplied directly", spec.source.as_str()),
                    ))
                }
                None => {
                    return Err(ScoringError::invalid_feature(
                        name,
                        format!("not a feature of schema {}", self.schema.version()),
                    ))
                }
            }
        }

        let mut values = Vec::with_capacity(self.schema.len());
        let mut defaulted = Vec::new();
        for spec in self.schema.features() {
            let value = match spec.source {
                FeatureSource::Latitude => request.latitude,
                FeatureSource::Longitude => request.longitude,
                FeatureSource::HourOfDay => f64::from(hour),
                FeatureSource::Context => match request.context.get(&spec.name).copied().flatten() {
                    Some(v) => v,
                    None => {
                        let default = spec.default.ok_or_else(|| {
                            ScoringError::invalid_feature(&spec.name, "required and has no schema default")
                        })?;
                        defaulted.push(spec.name.clone());
                        default
                    }
                },
            };
            check_value(spec, value)?;
            values.push(value);
        }

        if !defaulted.is_empty() {
            debug!(defaulted = ?defaulted, "context features filled from schema defaults");
        }
        Ok(FeatureVector { values, defaulted })
    }
}

fn check_coordinate(field: &str, value: f64, (min, max): (f64, f64)) -> Result<(), ScoringError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ScoringError::InvalidCoordinate {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

fn check_value(spec: &FeatureSpec, value: f64) -> Result<(), ScoringError> {
    let is_coordinate = matches!(spec.source, FeatureSource::Latitude | FeatureSource::Longitude);
    if let Some(range) = spec.range {
        if !range.contains(value) {
            if is_coordinate {
                return Err(ScoringError::InvalidCoordinate {
                    field: spec.name.clone(),
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
            return Err(ScoringError::invalid_feature(
                &spec.name,
                format!("{} is outside [{}, {}]", value, range.min, range.max),
            ));
        }
    }
    if !value.is_finite() {
        return Err(ScoringError::invalid_feature(&spec.name, "value is not finite"));
    }
    if spec.kind.is_integral() && value.fract() != 0.0 {
        return Err(ScoringError::invalid_feature(
            &spec.name,
            format!("{} feature must be a whole number, got {}", spec.kind.as_str(), value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureKind, FeatureSpec};

    fn builder() -> FeatureBuilder {
        let schema = FeatureSchema::new(
            "geofence-v1",
            vec![
                FeatureSpec::new("latitude", FeatureKind::Numeric, FeatureSource::Latitude),
                FeatureSpec::new("longitude", FeatureKind::Numeric, FeatureSource::Longitude),
                FeatureSpec::new("hour_of_day", FeatureKind::Ordinal, FeatureSource::HourOfDay).with_range(0.0, 23.0),
                FeatureSpec::new("crime_rate", FeatureKind::Numeric, FeatureSource::Context)
                    .with_default(1.0)
                    .with_range(0.0, 10.0),
                FeatureSpec::new("geo_risk", FeatureKind::Numeric, FeatureSource::Context).with_default(1.0),
                FeatureSpec::new("crowd_density", FeatureKind::Numeric, FeatureSource::Context).with_default(1.0),
                FeatureSpec::new("restricted_zone", FeatureKind::CategoricalInt, FeatureSource::Context)
                    .with_default(0.0)
                    .with_range(0.0, 1.0),
            ],
        )
        .unwrap();
        FeatureBuilder::new(Arc::new(schema))
    }

    #[test]
    fn fills_defaults_in_schema_order() {
        let req = RawRequest::new("2025-09-19T15:22:03", 10.9360826, 76.9544039);
        let v = builder().build(&req).unwrap();
        assert_eq!(v.as_slice(), &[10.9360826, 76.9544039, 15.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(
            v.defaulted_fields(),
            &["crime_rate", "geo_risk", "crowd_density", "restricted_zone"]
        );
    }

    #[test]
    fn supplied_context_is_not_marked_defaulted() {
        let mut req = RawRequest::new("2025-09-19T22:00:00Z", -33.0, 151.0)
            .with_context("restricted_zone", 1.0)
            .with_context("crime_rate", 4.5);
        req.context.insert("geo_risk".into(), None);
        let v = builder().build(&req).unwrap();
        assert_eq!(v.as_slice(), &[-33.0, 151.0, 22.0, 4.5, 1.0, 1.0, 1.0]);
        assert_eq!(v.defaulted_fields(), &["geo_risk", "crowd_density"]);
    }

    #[test]
    fn coordinate_bounds_are_inclusive() {
        let b = builder();
        for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
            assert!(b.build(&RawRequest::new("2025-01-01T00:00:00", lat, lon)).is_ok());
        }
        for (lat, lon) in [(90.0001, 0.0), (0.0, -180.5), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            let err = b.build(&RawRequest::new("2025-01-01T00:00:00", lat, lon)).unwrap_err();
            assert_eq!(err.kind(), "InvalidCoordinate");
        }
    }

    #[test]
    fn bad_timestamp_fails_before_anything_else() {
        let err = builder().build(&RawRequest::new("not-a-date", 0.0, 0.0)).unwrap_err();
        assert_eq!(err.kind(), "InvalidTimestamp");
    }

    #[test]
    fn rejects_unknown_and_derived_keys() {
        let b = builder();
        let err = b
            .build(&RawRequest::new("2025-01-01T10:00:00", 0.0, 0.0).with_context("wind_speed", 3.0))
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidFeature { ref name, .. } if name == "wind_speed"));

        let err = b
            .build(&RawRequest::new("2025-01-01T10:00:00", 0.0, 0.0).with_context("hour_of_day", 3.0))
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidFeature { ref name, .. } if name == "hour_of_day"));
    }

    #[test]
    fn rejects_out_of_range_and_fractional_context() {
        let b = builder();
        let err = b
            .build(&RawRequest::new("2025-01-01T10:00:00", 0.0, 0.0).with_context("crime_rate", 11.0))
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidFeature");

        let err = b
            .build(&RawRequest::new("2025-01-01T10:00:00", 0.0, 0.0).with_context("restricted_zone", 0.5))
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidFeature");
    }

    #[test]
    fn missing_context_without_default_is_an_error() {
        let schema = FeatureSchema::new(
            "strict",
            vec![
                FeatureSpec::new("latitude", FeatureKind::Numeric, FeatureSource::Latitude),
                FeatureSpec::new("crowd_density", FeatureKind::Numeric, FeatureSource::Context),
            ],
        )
        .unwrap();
        let b = FeatureBuilder::new(Arc::new(schema));
        let err = b.build(&RawRequest::new("2025-01-01T10:00:00", 1.0, 2.0)).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidFeature { ref name, .. } if name == "crowd_density"));

        let v = b
            .build(&RawRequest::new("2025-01-01T10:00:00", 1.0, 2.0).with_context("crowd_density", 7.0))
            .unwrap();
        assert_eq!(v.as_slice(), &[1.0, 7.0]);
    }

    #[test]
    fn deserializes_flat_context_fields() {
        let req: RawRequest = serde_json::from_str(
            r#"{"latitude": 1.5, "longitude": 2.5, "timestamp": "2025-09-19T15:22:03", "crime_rate": 2.0, "geo_risk": null}"#,
        )
        .unwrap();
        assert_eq!(req.context.get("crime_rate"), Some(&Some(2.0)));
        assert_eq!(req.context.get("geo_risk"), Some(&None));
        assert_eq!(req.context.len(), 2);
    }
}
