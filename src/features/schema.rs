//! Feature schema: the ordered feature contract shared by training and serving.
//!
//! The schema is persisted next to the classifier. Its fingerprint covers the
//! ordered `name:kind:source` triples, so a reordered or renamed feature list
//! fails to load instead of silently feeding columns to the wrong split.

use crate::error::{ArtifactError, ScoringError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Ordinal,
    CategoricalInt,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Numeric => "numeric",
            FeatureKind::Ordinal => "ordinal",
            FeatureKind::CategoricalInt => "categorical_int",
        }
    }

    /// Ordinal and categorical features only take whole-number values.
    pub fn is_integral(&self) -> bool {
        !matches!(self, FeatureKind::Numeric)
    }
}

/// Where the builder takes a feature's value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    Latitude,
    Longitude,
    /// Derived from the request timestamp
    HourOfDay,
    /// Optional request field, filled from the schema default when absent
    Context,
}

impl FeatureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSource::Latitude => "latitude",
            FeatureSource::Longitude => "longitude",
            FeatureSource::HourOfDay => "hour_of_day",
            FeatureSource::Context => "context",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
    pub source: FeatureSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ValueRange>,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>, kind: FeatureKind, source: FeatureSource) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            default: None,
            range: None,
        }
    }

    pub fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(ValueRange::new(min, max));
        self
    }
}

/// On-disk form of the schema (`feature_schema.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SchemaDocument {
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    features: Vec<FeatureSpec>,
}

/// Ordered, validated feature contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDocument", into = "SchemaDocument")]
pub struct FeatureSchema {
    version: String,
    features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    pub fn new(version: impl Into<String>, features: Vec<FeatureSpec>) -> Result<Self, ArtifactError> {
        let version = version.into();
        if features.is_empty() {
            return Err(ArtifactError::invalid("feature schema", "no features declared"));
        }

        let mut names = HashSet::new();
        let mut derived = HashSet::new();
        for spec in &features {
            if spec.name.trim().is_empty() {
                return Err(ArtifactError::invalid("feature schema", "empty feature name"));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(ArtifactError::invalid(
                    "feature schema",
                    format!("duplicate feature {}", spec.name),
                ));
            }
            if spec.source != FeatureSource::Context && !derived.insert(spec.source) {
                return Err(ArtifactError::invalid(
                    "feature schema",
                    format!("more than one feature sourced from {}", spec.source.as_str()),
                ));
            }
            if let Some(range) = spec.range {
                if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                    return Err(ArtifactError::invalid(
                        "feature schema",
                        format!("{}: invalid range [{}, {}]", spec.name, range.min, range.max),
                    ));
                }
            }
            if let Some(default) = spec.default {
                if !default.is_finite() {
                    return Err(ArtifactError::invalid(
                        "feature schema",
                        format!("{}: default is not finite", spec.name),
                    ));
                }
                if spec.kind.is_integral() && default.fract() != 0.0 {
                    return Err(ArtifactError::invalid(
                        "feature schema",
                        format!("{}: {} default {} is not a whole number", spec.name, spec.kind.as_str(), default),
                    ));
                }
                if let Some(range) = spec.range {
                    if !range.contains(default) {
                        return Err(ArtifactError::invalid(
                            "feature schema",
                            format!("{}: default {} outside [{}, {}]", spec.name, default, range.min, range.max),
                        ));
                    }
                }
            }
        }

        Ok(Self { version, features })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Feature names in vector order.
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn default_for(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|f| f.default)
    }

    /// SHA-256 over the ordered `name:kind:source` lines, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for f in &self.features {
            hasher.update(format!("{}:{}:{}\n", f.name, f.kind.as_str(), f.source.as_str()).as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Check the schema against what the classifier was fit on.
    pub fn validate_against(
        &self,
        n_features: usize,
        feature_names: Option<&[String]>,
    ) -> Result<(), ScoringError> {
        if n_features != self.len() {
            return Err(ScoringError::schema_mismatch(format!(
                "classifier expects {} features, schema {} declares {}",
                n_features,
                self.version,
                self.len()
            )));
        }
        if let Some(trained) = feature_names {
            let serving = self.names();
            if trained.len() != serving.len() || trained.iter().zip(&serving).any(|(t, s)| t != s) {
                return Err(ScoringError::schema_mismatch(format!(
                    "classifier was fit on [{}], schema {} orders [{}]",
                    trained.join(", "),
                    self.version,
                    serving.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<SchemaDocument> for FeatureSchema {
    type Error = ArtifactError;

    fn try_from(doc: SchemaDocument) -> Result<Self, Self::Error> {
        let schema = FeatureSchema::new(doc.version, doc.features)?;
        if let Some(expected) = doc.fingerprint {
            let actual = schema.fingerprint();
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(ScoringError::schema_mismatch(format!(
                    "schema {} fingerprint {} does not match recorded {}",
                    schema.version, actual, expected
                ))
                .into());
            }
        }
        Ok(schema)
    }
}

impl From<FeatureSchema> for SchemaDocument {
    fn from(schema: FeatureSchema) -> Self {
        let fingerprint = Some(schema.fingerprint());
        SchemaDocument {
            version: schema.version,
            fingerprint,
            features: schema.features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geofence_features() -> Vec<FeatureSpec> {
        vec![
            FeatureSpec::new("latitude", FeatureKind::Numeric, FeatureSource::Latitude).with_range(-90.0, 90.0),
            FeatureSpec::new("longitude", FeatureKind::Numeric, FeatureSource::Longitude).with_range(-180.0, 180.0),
            FeatureSpec::new("hour_of_day", FeatureKind::Ordinal, FeatureSource::HourOfDay).with_range(0.0, 23.0),
            FeatureSpec::new("crime_rate", FeatureKind::Numeric, FeatureSource::Context).with_default(1.0),
            FeatureSpec::new("restricted_zone", FeatureKind::CategoricalInt, FeatureSource::Context)
                .with_default(0.0)
                .with_range(0.0, 1.0),
        ]
    }

    #[test]
    fn names_and_defaults_follow_declaration_order() {
        let schema = FeatureSchema::new("v1", geofence_features()).unwrap();
        assert_eq!(
            schema.names(),
            vec!["latitude", "longitude", "hour_of_day", "crime_rate", "restricted_zone"]
        );
        assert_eq!(schema.default_for("crime_rate"), Some(1.0));
        assert_eq!(schema.default_for("restricted_zone"), Some(0.0));
        assert_eq!(schema.default_for("latitude"), None);
        assert_eq!(schema.default_for("missing"), None);
    }

    #[test]
    fn fingerprint_changes_on_reorder() {
        let a = FeatureSchema::new("v1", geofence_features()).unwrap();
        let mut swapped = geofence_features();
        swapped.swap(3, 4);
        let b = FeatureSchema::new("v1", swapped).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_eq!(a.fingerprint(), FeatureSchema::new("v2", geofence_features()).unwrap().fingerprint());
    }

    #[test]
    fn rejects_bad_declarations() {
        let mut dup = geofence_features();
        dup.push(FeatureSpec::new("crime_rate", FeatureKind::Numeric, FeatureSource::Context));
        assert!(FeatureSchema::new("v1", dup).is_err());

        let mut two_hours = geofence_features();
        two_hours.push(FeatureSpec::new("hour2", FeatureKind::Ordinal, FeatureSource::HourOfDay));
        assert!(FeatureSchema::new("v1", two_hours).is_err());

        let mut frac = geofence_features();
        frac[4].default = Some(0.5);
        assert!(FeatureSchema::new("v1", frac).is_err());

        let mut outside = geofence_features();
        outside[4].default = Some(2.0);
        assert!(FeatureSchema::new("v1", outside).is_err());

        assert!(FeatureSchema::new("v1", Vec::new()).is_err());
    }

    #[test]
    fn validate_against_count_and_names() {
        let schema = FeatureSchema::new("v1", geofence_features()).unwrap();
        assert!(schema.validate_against(5, None).is_ok());

        let err = schema.validate_against(7, None).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");

        let mut trained: Vec<String> = schema.names().iter().map(|s| s.to_string()).collect();
        assert!(schema.validate_against(5, Some(&trained)).is_ok());
        trained.swap(0, 1);
        let err = schema.validate_against(5, Some(&trained)).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");
    }

    #[test]
    fn document_roundtrip_checks_fingerprint() {
        let schema = FeatureSchema::new("v1", geofence_features()).unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains(&schema.fingerprint()));
        let back: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);

        let tampered = json.replace("\"crime_rate\"", "\"crowd_density\"");
        assert!(serde_json::from_str::<FeatureSchema>(&tampered).is_err());
    }
}
