//! Geofence risk scoring: schema-checked feature building and random forest inference.
//!
//! Modular structure:
//! - [`features`]: Feature schema, timestamp parsing, request → vector builder
//! - [`model`]: Random forest classifier, label encoder, artifact loading
//! - [`risk`]: Scoring service (build → predict → round → respond)
//! - [`http`]: Axum routes over the scoring service
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod error;
pub mod features;
pub mod http;
pub mod logging;
pub mod model;
pub mod risk;

pub use config::ServiceConfig;
pub use error::{ArtifactError, ConfigError, ScoringError};
pub use features::{FeatureBuilder, FeatureSchema, FeatureVector, RawRequest};
pub use logging::StructuredLogger;
pub use model::{load_risk_model, Classifier, PredictionResult, RiskModel};
pub use risk::{ScoreResponse, ScoringService};
