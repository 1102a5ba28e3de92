mod analyze;
mod health;
mod index;
mod metrics;

use crate::server::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

pub use analyze::{AnalyzeError, PredictionResponse};

pub fn api_routes(state: SharedState) -> Router {
    let body_limit = state.presentation.max_upload_bytes;

    Router::new()
        .route("/", get(index::index))
        .route("/analyze", post(analyze::analyze_page))
        .route("/api/predict", post(analyze::predict_json))
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
