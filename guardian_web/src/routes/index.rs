use crate::{
    page::PageView,
    server::{ModelStatus, SharedState},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn index(State(state): State<SharedState>) -> Response {
    let view = PageView {
        model_error: match &state.model {
            ModelStatus::Loaded(_) => None,
            ModelStatus::Unavailable(reason) => Some(reason.clone()),
        },
        ..Default::default()
    };

    match state.pages.render(&view) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}
