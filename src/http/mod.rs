//! HTTP boundary (axum): routes requests into the shared `ScoringService`.

mod error;
mod handlers;

pub use error::{status_for, ErrorBody};
pub use handlers::SharedService;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the router with all routes bound to `service`.
pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/schema", get(handlers::schema))
        .route("/predict", post(handlers::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
