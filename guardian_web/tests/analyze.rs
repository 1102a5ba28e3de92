use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use guardian_inference::{
    config::ModelConfig, InferenceError, ModelLoadError, ModelService, ModelStore, OrtModelLoader,
};
use guardian_web::{
    config::PresentationConfig,
    load_model,
    routes::api_routes,
    server::{ModelStatus, SharedState},
    Metrics,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use std::{io::Cursor, sync::Arc};
use tower::ServiceExt;

const BOUNDARY: &str = "guardian-test-boundary";

struct StubModel(f32);

impl ModelService for StubModel {
    fn predict(&self, input: &Array4<f32>) -> Result<f32, InferenceError> {
        assert_eq!(input.shape(), &[1, 128, 128, 3]);
        Ok(self.0)
    }
}

struct BrokenModel;

impl ModelService for BrokenModel {
    fn predict(&self, input: &Array4<f32>) -> Result<f32, InferenceError> {
        Err(InferenceError::ShapeMismatch {
            expected: vec![1, 224, 224, 3],
            actual: input.shape().to_vec(),
        })
    }
}

fn app(model: ModelStatus) -> Router {
    app_with_presentation(model, PresentationConfig::default())
}

fn app_with_presentation(model: ModelStatus, presentation: PresentationConfig) -> Router {
    let metrics = Arc::new(Metrics::new().unwrap());
    let state = SharedState::new(model, presentation, metrics).unwrap();
    api_routes(state)
}

fn app_with_score(score: f32) -> Router {
    app(ModelStatus::Loaded(Arc::new(StubModel(score))))
}

fn slide_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([214, 120, 190])));
    let mut image_data = Vec::new();
    img.write_to(&mut Cursor::new(&mut image_data), ImageFormat::Png)
        .unwrap();
    image_data
}

fn multipart_request(field: &str, image_data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"slide.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(image_data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn predict_request(image_data: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(image_data))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_predict_json_malignant() {
    let router = app_with_score(0.73);

    let (status, body) = send(&router, predict_request(slide_png())).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["label"], "malignant");
    assert_eq!(json["confidence_percent"], "73.00%");
    assert_eq!(json["headline"], "Analysis Complete: Malignant Detected");
}

#[tokio::test]
async fn test_analyze_page_malignant() {
    let router = app_with_score(0.73);

    let (status, html) = send(&router, multipart_request("image", &slide_png())).await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Malignant Detected"));
    assert!(html.contains("73.00%"));
    assert!(html.contains("data:image/png;base64,"));
    assert!(!html.contains("Benign Detected"));
}

#[tokio::test]
async fn test_analyze_page_benign() {
    let router = app_with_score(0.2);

    let (status, html) = send(&router, multipart_request("image", &slide_png())).await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Benign Detected"));
    assert!(html.contains("80.00%"));
    assert!(!html.contains("Malignant Detected"));
}

#[tokio::test]
async fn test_missing_model_disables_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let model_config = ModelConfig {
        model_dir: dir.path().to_path_buf(),
        onnx_file: "breast_cancer_final_model.onnx".to_string(),
    };
    let store = ModelStore::new(OrtModelLoader, &model_config);

    assert!(matches!(
        store.initialize(),
        Err(ModelLoadError::NotFound(_))
    ));

    let status = load_model(&store);
    assert!(matches!(status, ModelStatus::Unavailable(_)));
    let router = app(status);

    let (status, html) = send(&router, get_request("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Could not load the model"));
    assert!(!html.contains("<form"));

    let (status, html) = send(&router, multipart_request("image", &slide_png())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!html.contains("Analysis Complete"));

    let (status, body) = send(&router, predict_request(slide_png())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Could not load the model"));

    let (_, body) = send(&router, get_request("/health")).await;
    assert!(body.contains("\"model\":\"unavailable\""));
}

#[tokio::test]
async fn test_bad_upload_keeps_serving() {
    let router = app_with_score(0.73);

    let (status, html) = send(&router, multipart_request("image", b"GIF89a not really")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(html.contains("Unsupported image format"));
    assert!(html.contains("<form"));

    let (status, body) = send(&router, predict_request(b"garbage".to_vec())).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body.contains("error"));

    let (status, html) = send(&router, multipart_request("image", &slide_png())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("73.00%"));
}

#[tokio::test]
async fn test_missing_image_field() {
    let router = app_with_score(0.73);

    let (status, html) = send(&router, multipart_request("document", &slide_png())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("No image was uploaded"));
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let presentation = PresentationConfig {
        analysis_delay_ms: 0,
        max_upload_bytes: 1024,
    };
    let router = app_with_presentation(
        ModelStatus::Loaded(Arc::new(StubModel(0.73))),
        presentation,
    );

    let (status, html) = send(&router, multipart_request("image", &[0u8; 4096])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!html.contains("Analysis Complete"));

    let (status, _) = send(&router, predict_request(vec![0u8; 4096])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_inference_error_is_reported() {
    let router = app(ModelStatus::Loaded(Arc::new(BrokenModel)));

    let (status, html) = send(&router, multipart_request("image", &slide_png())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.contains("does not match the expected"));

    let (status, _) = send(&router, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let router = app_with_score(0.9);

    let (status, body) = send(&router, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"Available\""));
    assert!(body.contains("\"model\":\"loaded\""));

    send(&router, predict_request(slide_png())).await;

    let (status, body) = send(&router, get_request("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("analyses_total"));
}
