//! HTTP handlers. Each one is a thin shell around `ScoringService`.

use super::error::InvalidRequest;
use crate::error::ScoringError;
use crate::features::{FeatureSchema, RawRequest};
use crate::risk::{ModelInfo, ScoreResponse, ScoringService};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

pub type SharedService = Arc<ScoringService>;

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Geofence Risk Prediction API is running" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    #[serde(flatten)]
    model: Option<ModelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub async fn health(State(service): State<SharedService>) -> Response {
    let mut body = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        model: None,
        reason: None,
    };
    match service.model_info() {
        Ok(model) => {
            body.model = Some(model);
            Json(body).into_response()
        }
        Err(e) => {
            body.status = "unavailable";
            body.reason = Some(e.to_string());
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

pub async fn schema(State(service): State<SharedService>) -> Result<Json<FeatureSchema>, ScoringError> {
    service.schema().map(|s| Json(s.clone()))
}

pub async fn predict(
    State(service): State<SharedService>,
    payload: Result<Json<RawRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, Response> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "rejected request body");
        InvalidRequest(rejection).into_response()
    })?;

    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id);
    match span.in_scope(|| service.score(&request)) {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            // Integrity failures are already logged by the service inside the span
            match &e {
                ScoringError::ModelUnavailable { .. } => {
                    warn!(%request_id, error = %e, kind = e.kind(), "request failed")
                }
                e if e.is_client_error() => {
                    debug!(%request_id, error = %e, kind = e.kind(), "rejected request")
                }
                _ => {}
            }
            Err(e.into_response())
        }
    }
}
