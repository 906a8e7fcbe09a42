//! Scoring orchestration: build features → predict → round → assemble response.

use crate::error::ScoringError;
use crate::features::{FeatureBuilder, FeatureSchema, RawRequest};
use crate::model::RiskModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Scoring result returned to the caller, echoing the request inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub context: BTreeMap<String, Option<f64>>,
    /// Probability of `risk_level`, rounded to 3 decimals
    pub risk_score: f64,
    pub risk_level: String,
    /// Context features filled from schema defaults rather than measured
    pub defaulted_fields: Vec<String>,
}

/// Summary of the loaded artifact, for health and schema endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub schema_version: String,
    pub schema_fingerprint: String,
    pub features: Vec<String>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<usize>,
}

enum ServiceState {
    Ready { model: RiskModel, builder: FeatureBuilder },
    Unavailable { reason: String },
}

/// Owns the single shared model. Immutable after construction.
pub struct ScoringService {
    state: ServiceState,
}

/// Round half away from zero to 3 decimals.
pub fn round_score(p: f64) -> f64 {
    (p * 1000.0).round() / 1000.0
}

impl ScoringService {
    pub fn new(model: RiskModel) -> Self {
        let builder = FeatureBuilder::new(Arc::clone(model.schema()));
        Self {
            state: ServiceState::Ready { model, builder },
        }
    }

    /// A service that fails every request with `ModelUnavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ServiceState::Unavailable { reason: reason.into() },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready { .. })
    }

    fn ready(&self) -> Result<(&RiskModel, &FeatureBuilder), ScoringError> {
        match &self.state {
            ServiceState::Ready { model, builder } => Ok((model, builder)),
            ServiceState::Unavailable { reason } => Err(ScoringError::ModelUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    pub fn schema(&self) -> Result<&FeatureSchema, ScoringError> {
        self.ready().map(|(model, _)| model.schema().as_ref())
    }

    pub fn model_info(&self) -> Result<ModelInfo, ScoringError> {
        let (model, _) = self.ready()?;
        let schema = model.schema();
        Ok(ModelInfo {
            schema_version: schema.version().to_string(),
            schema_fingerprint: schema.fingerprint(),
            features: schema.names().iter().map(|s| s.to_string()).collect(),
            labels: model.labels().to_vec(),
            n_estimators: model.n_estimators(),
        })
    }

    pub fn score(&self, request: &RawRequest) -> Result<ScoreResponse, ScoringError> {
        let (model, builder) = self.ready()?;

        let vector = builder.build(request)?;
        let prediction = model.predict(&vector).map_err(|e| {
            error!(error = %e, kind = e.kind(), "prediction failed on a valid feature vector");
            e
        })?;
        debug!(
            class = prediction.predicted_class,
            probability = prediction.class_probability,
            level = %prediction.decoded_label,
            "scored"
        );

        Ok(ScoreResponse {
            timestamp: request.timestamp.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            context: request.context.clone(),
            risk_score: round_score(prediction.class_probability),
            risk_level: prediction.decoded_label,
            defaulted_fields: vector.defaulted_fields().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureKind, FeatureSource, FeatureSpec};
    use crate::model::{DecisionTree, LabelEncoder, RandomForest};

    fn service() -> ScoringService {
        let schema = FeatureSchema::new(
            "t1",
            vec![
                FeatureSpec::new("latitude", FeatureKind::Numeric, FeatureSource::Latitude),
                FeatureSpec::new("hour_of_day", FeatureKind::Ordinal, FeatureSource::HourOfDay),
                FeatureSpec::new("restricted_zone", FeatureKind::CategoricalInt, FeatureSource::Context)
                    .with_default(0.0),
            ],
        )
        .unwrap();
        // Night hours (> 18.5) lean High
        let tree = DecisionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![1, -2, -2],
            threshold: vec![18.5, -2.0, -2.0],
            value: vec![vec![1.0, 1.0], vec![1.0, 2.0], vec![2.0, 1.0]],
        };
        let forest = RandomForest::new(3, None, vec![0, 1], vec![tree]).unwrap();
        let encoder = LabelEncoder::new(vec!["High".into(), "Low".into()]).unwrap();
        ScoringService::new(RiskModel::new(Arc::new(schema), Box::new(forest), encoder).unwrap())
    }

    #[test]
    fn rounds_to_three_decimals() {
        assert_eq!(round_score(2.0 / 3.0), 0.667);
        assert_eq!(round_score(1.0 / 3.0), 0.333);
        assert_eq!(round_score(0.0), 0.0);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.0625), 0.063);
    }

    #[test]
    fn scores_and_echoes_inputs() {
        let s = service();
        let req = RawRequest::new("2025-09-19T21:10:00", 12.5, 77.0);
        let r = s.score(&req).unwrap();
        assert_eq!(r.risk_level, "High");
        assert_eq!(r.risk_score, 0.667);
        assert_eq!(r.timestamp, "2025-09-19T21:10:00");
        assert_eq!(r.latitude, 12.5);
        assert_eq!(r.defaulted_fields, vec!["restricted_zone"]);

        let r = s
            .score(&RawRequest::new("2025-09-19T09:00:00Z", 12.5, 77.0).with_context("restricted_zone", 1.0))
            .unwrap();
        assert_eq!(r.risk_level, "Low");
        assert!(r.defaulted_fields.is_empty());
        assert_eq!(r.context.get("restricted_zone"), Some(&Some(1.0)));
    }

    #[test]
    fn response_json_is_stable() {
        let s = service();
        let req = RawRequest::new("2025-09-19T21:10:00", 12.5, 77.0);
        let a = serde_json::to_vec(&s.score(&req).unwrap()).unwrap();
        let b = serde_json::to_vec(&s.score(&req).unwrap()).unwrap();
        assert_eq!(a, b);
        let v: serde_json::Value = serde_json::from_slice(&a).unwrap();
        assert_eq!(v["risk_level"], "High");
        assert_eq!(v["defaulted_fields"][0], "restricted_zone");
    }

    #[test]
    fn client_errors_pass_through() {
        let s = service();
        let err = s.score(&RawRequest::new("not-a-date", 0.0, 0.0)).unwrap_err();
        assert_eq!(err.kind(), "InvalidTimestamp");
        let err = s.score(&RawRequest::new("2025-09-19T10:00:00", 95.0, 0.0)).unwrap_err();
        assert_eq!(err.kind(), "InvalidCoordinate");
    }

    #[test]
    fn unavailable_service_fails_every_call() {
        let s = ScoringService::unavailable("classifier.json missing");
        assert!(!s.is_ready());
        for _ in 0..2 {
            let err = s.score(&RawRequest::new("2025-09-19T10:00:00", 0.0, 0.0)).unwrap_err();
            assert!(matches!(err, ScoringError::ModelUnavailable { ref reason } if reason.contains("classifier.json")));
        }
        assert_eq!(s.model_info().unwrap_err().kind(), "ModelUnavailable");
        assert!(s.schema().is_err());
    }

    #[test]
    fn model_info_describes_artifact() {
        let info = service().model_info().unwrap();
        assert_eq!(info.schema_version, "t1");
        assert_eq!(info.features, vec!["latitude", "hour_of_day", "restricted_zone"]);
        assert_eq!(info.labels, vec!["High", "Low"]);
        assert_eq!(info.n_estimators, Some(1));
        assert_eq!(info.schema_fingerprint.len(), 64);
    }
}
