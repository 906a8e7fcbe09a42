//! Trained classifier + label decoder behind a single immutable `RiskModel`.

mod artifact;
mod encoder;
mod forest;

pub use artifact::{load_risk_model, CLASSIFIER_FILE, LABEL_ENCODER_FILE, SCHEMA_FILE};
pub use encoder::LabelEncoder;
pub use forest::{DecisionTree, RandomForest};

use crate::error::ScoringError;
use crate::features::{FeatureSchema, FeatureVector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// A fitted classifier over schema-ordered feature vectors.
///
/// `predict_proba` columns follow `classes()`, which is the classifier's own
/// class ordering and need not match label encoder ids.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Feature names recorded at fit time, if the trainer kept them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn classes(&self) -> &[i64];

    /// One column per entry of `classes()`. `features` must hold
    /// `n_features()` values; implementations return no columns otherwise.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;

    /// Class decision from already computed `predict_proba` output; by default
    /// the first column with maximum probability. Falls back to the first
    /// class when `proba` is empty.
    fn decide(&self, proba: &[f64]) -> i64 {
        let classes = self.classes();
        let mut best = 0;
        for (i, p) in proba.iter().enumerate().take(classes.len()) {
            if *p > proba[best] {
                best = i;
            }
        }
        classes.get(best).copied().unwrap_or_default()
    }

    fn predict(&self, features: &[f64]) -> i64 {
        self.decide(&self.predict_proba(features))
    }

    fn n_estimators(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_class: i64,
    /// Probability of `predicted_class`, in [0, 1]
    pub class_probability: f64,
    pub decoded_label: String,
}

pub struct RiskModel {
    schema: Arc<FeatureSchema>,
    classifier: Box<dyn Classifier>,
    encoder: LabelEncoder,
}

impl RiskModel {
    /// Pair a classifier with its schema and decoder, rejecting any skew between them.
    pub fn new(
        schema: Arc<FeatureSchema>,
        classifier: Box<dyn Classifier>,
        encoder: LabelEncoder,
    ) -> Result<Self, ScoringError> {
        schema.validate_against(classifier.n_features(), classifier.feature_names())?;

        let classes = classifier.classes();
        if classes.is_empty() {
            return Err(ScoringError::schema_mismatch("classifier declares no classes"));
        }
        let unique: HashSet<_> = classes.iter().collect();
        if unique.len() != classes.len() {
            return Err(ScoringError::schema_mismatch("classifier declares duplicate class ids"));
        }
        if let Some(id) = classes.iter().find(|c| !encoder.contains(**c)) {
            return Err(ScoringError::schema_mismatch(format!(
                "classifier class {} has no label among {} encoder classes",
                id,
                encoder.len()
            )));
        }

        let positional = classes.iter().enumerate().all(|(i, c)| i64::try_from(i) == Ok(*c));
        if !positional {
            info!(classes = ?classes, "classifier columns differ from encoder ids; lookup is by class id");
        }

        Ok(Self {
            schema,
            classifier,
            encoder,
        })
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn labels(&self) -> &[String] {
        self.encoder.classes()
    }

    pub fn classes(&self) -> &[i64] {
        self.classifier.classes()
    }

    pub fn n_estimators(&self) -> Option<usize> {
        self.classifier.n_estimators()
    }

    pub fn predict(&self, vector: &FeatureVector) -> Result<PredictionResult, ScoringError> {
        if vector.len() != self.schema.len() {
            return Err(ScoringError::schema_mismatch(format!(
                "vector has {} values, schema {} declares {}",
                vector.len(),
                self.schema.version(),
                self.schema.len()
            )));
        }
        let features = vector.as_slice();
        let classes = self.classifier.classes();

        let proba = self.classifier.predict_proba(features);
        if proba.len() != classes.len() {
            return Err(ScoringError::schema_mismatch(format!(
                "classifier returned {} probability columns for {} classes",
                proba.len(),
                classes.len()
            )));
        }

        let predicted_class = self.classifier.decide(&proba);
        let decoded_label = self.encoder.decode(predicted_class)?.to_string();
        let column = classes
            .iter()
            .position(|c| *c == predicted_class)
            .ok_or_else(|| ScoringError::UnknownClass {
                class_id: predicted_class,
                reason: "absent from the classifier's probability columns".to_string(),
            })?;
        let p = proba[column];
        let class_probability = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };

        Ok(PredictionResult {
            predicted_class,
            class_probability,
            decoded_label,
        })
    }
}
