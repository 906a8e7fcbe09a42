//! Risk scoring: the request → response orchestration around the shared model.

mod service;

pub use service::{round_score, ModelInfo, ScoreResponse, ScoringService};
