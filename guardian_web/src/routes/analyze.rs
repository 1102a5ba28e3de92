use crate::{
    page::{preview_data_uri, PageView, ResultView},
    server::{ModelStatus, SharedState},
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use bytes::Bytes;
use guardian_inference::{
    decode_upload, prepare, render, InferenceError, Label, PreprocessError, Verdict,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

const IMAGE_FIELD: &str = "image";

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Could not load the model. Error: {0}")]
    ModelUnavailable(String),
    #[error("No image was uploaded")]
    MissingImage,
    #[error("Invalid upload: {message}")]
    Multipart { status: StatusCode, message: String },
    #[error("{0}")]
    Preprocess(#[from] PreprocessError),
    #[error("{0}")]
    Inference(#[from] InferenceError),
    #[error("Analysis task failed: {0}")]
    Task(String),
}

impl AnalyzeError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalyzeError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AnalyzeError::MissingImage => StatusCode::BAD_REQUEST,
            AnalyzeError::Multipart { status, .. } => *status,
            AnalyzeError::Preprocess(PreprocessError::UnsupportedFormat(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AnalyzeError::Preprocess(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyzeError::Inference(_) | AnalyzeError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzeError::ModelUnavailable(_) => "model_unavailable",
            AnalyzeError::MissingImage => "missing_image",
            AnalyzeError::Multipart { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "too_large"
            }
            AnalyzeError::Multipart { .. } => "multipart",
            AnalyzeError::Preprocess(PreprocessError::UnsupportedFormat(_)) => "unsupported_format",
            AnalyzeError::Preprocess(PreprocessError::Decode(_)) => "decode",
            AnalyzeError::Preprocess(PreprocessError::InvalidImageFormat(_)) => {
                "invalid_image_format"
            }
            AnalyzeError::Inference(_) => "inference",
            AnalyzeError::Task(_) => "task",
        }
    }
}

impl From<MultipartError> for AnalyzeError {
    fn from(err: MultipartError) -> Self {
        AnalyzeError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub label: Label,
    pub score: f32,
    pub confidence: f32,
    pub confidence_percent: String,
    pub headline: &'static str,
}

async fn analyze(
    state: &SharedState,
    image_data: Bytes,
    route: &str,
) -> Result<(f32, Verdict), AnalyzeError> {
    let model = match &state.model {
        ModelStatus::Loaded(model) => model.clone(),
        ModelStatus::Unavailable(reason) => {
            return Err(AnalyzeError::ModelUnavailable(reason.clone()))
        }
    };

    let started = Instant::now();
    let score = tokio::task::spawn_blocking(move || -> Result<f32, AnalyzeError> {
        let image = decode_upload(&image_data)?;
        let input = prepare(&image)?;
        Ok(model.predict(&input)?)
    })
    .await
    .map_err(|e| AnalyzeError::Task(e.to_string()))??;

    state
        .metrics
        .record_prediction_duration(started.elapsed().as_millis() as u64, route);

    let delay_ms = state.presentation.analysis_delay_ms;
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let verdict = render(score);
    state.metrics.record_analysis(verdict.label.as_str());
    tracing::info!(
        "Verdict {} with confidence {} (score {:.4})",
        verdict.label.as_str(),
        verdict.confidence_percent(),
        score
    );

    Ok((score, verdict))
}

fn record_failure(state: &SharedState, err: &AnalyzeError) {
    state.metrics.record_analysis_error(err.kind());
    tracing::warn!("Analysis failed: {}", err);
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, AnalyzeError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let image_data = field.bytes().await?;
        if image_data.is_empty() {
            return Err(AnalyzeError::MissingImage);
        }
        return Ok(image_data);
    }

    Err(AnalyzeError::MissingImage)
}

#[instrument(skip(state, image_data))]
pub async fn predict_json(
    State(state): State<SharedState>,
    image_data: Bytes,
) -> Result<Json<PredictionResponse>, AnalyzeError> {
    let (score, verdict) = analyze(&state, image_data, "/api/predict")
        .await
        .inspect_err(|e| record_failure(&state, e))?;

    Ok(Json(PredictionResponse {
        label: verdict.label,
        score,
        confidence: verdict.confidence,
        confidence_percent: verdict.confidence_percent(),
        headline: verdict.headline(),
    }))
}

#[instrument(skip(state, multipart))]
pub async fn analyze_page(State(state): State<SharedState>, mut multipart: Multipart) -> Response {
    let mut view = PageView::default();

    let outcome = match &state.model {
        ModelStatus::Unavailable(reason) => {
            view.model_error = Some(reason.clone());
            Err(AnalyzeError::ModelUnavailable(reason.clone()))
        }
        ModelStatus::Loaded(_) => match read_image_field(&mut multipart).await {
            Ok(image_data) => {
                view.preview = preview_data_uri(&image_data);
                analyze(&state, image_data, "/analyze").await
            }
            Err(e) => Err(e),
        },
    };

    let status = match outcome {
        Ok((_, verdict)) => {
            view.result = Some(ResultView::from(&verdict));
            StatusCode::OK
        }
        Err(e) => {
            record_failure(&state, &e);
            if !matches!(e, AnalyzeError::ModelUnavailable(_)) {
                view.preview = None;
                view.error = Some(e.to_string());
            }
            e.status()
        }
    };

    match state.pages.render(&view) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}
