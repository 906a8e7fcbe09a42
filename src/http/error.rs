//! Error → HTTP response mapping.

use crate::error::ScoringError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_kind: &'static str,
    pub message: String,
}

pub fn status_for(err: &ScoringError) -> StatusCode {
    match err {
        ScoringError::InvalidTimestamp { .. }
        | ScoringError::InvalidCoordinate { .. }
        | ScoringError::InvalidFeature { .. } => StatusCode::BAD_REQUEST,
        ScoringError::SchemaMismatch { .. } | ScoringError::UnknownClass { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ScoringError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ScoringError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = ErrorBody {
            error_kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed or incomplete request body.
pub struct InvalidRequest(pub JsonRejection);

impl IntoResponse for InvalidRequest {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_kind: "InvalidRequest",
            message: self.0.body_text(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
