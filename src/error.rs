//! Error types: request-time scoring errors, startup artifact errors, config errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scoring a single request.
///
/// Client errors (bad timestamp, coordinates, feature values) map to 4xx at the
/// serving boundary; integrity errors (schema skew, unknown class) and
/// `ModelUnavailable` map to 5xx.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    #[error("invalid coordinate: {field} = {value} is outside [{min}, {max}]")]
    InvalidCoordinate {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid feature {name}: {reason}")]
    InvalidFeature { name: String, reason: String },

    #[error("schema mismatch: {details}")]
    SchemaMismatch { details: String },

    #[error("unknown class {class_id}: {reason}")]
    UnknownClass { class_id: i64, reason: String },

    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },
}

impl ScoringError {
    /// Stable machine-readable kind, used as `error_kind` in responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTimestamp { .. } => "InvalidTimestamp",
            Self::InvalidCoordinate { .. } => "InvalidCoordinate",
            Self::InvalidFeature { .. } => "InvalidFeature",
            Self::SchemaMismatch { .. } => "SchemaMismatch",
            Self::UnknownClass { .. } => "UnknownClass",
            Self::ModelUnavailable { .. } => "ModelUnavailable",
        }
    }

    /// True when the caller sent bad input; false for deployment/integrity faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimestamp { .. } | Self::InvalidCoordinate { .. } | Self::InvalidFeature { .. }
        )
    }

    pub(crate) fn schema_mismatch(details: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            details: details.into(),
        }
    }

    pub(crate) fn invalid_feature(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFeature {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading the model artifact at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {component}: {details}")]
    Invalid {
        component: &'static str,
        details: String,
    },

    #[error(transparent)]
    Integrity(#[from] ScoringError),
}

impl ArtifactError {
    pub(crate) fn invalid(component: &'static str, details: impl Into<String>) -> Self {
        Self::Invalid {
            component,
            details: details.into(),
        }
    }
}

/// Errors raised while loading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}
