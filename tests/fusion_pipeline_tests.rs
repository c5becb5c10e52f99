// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
// End-to-end pipeline and HTTP surface tests over stub models

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array2;
use tower::ServiceExt;

use safevision_node::api::{build_router, AppState};
use safevision_node::pipeline::{self, PipelineError};
use safevision_node::vision::{
    BoundingBox, DepthEstimator, DepthError, DepthGrid, Detection, DetectionError, Detector,
    FusionConfig, FusionEngine,
};

struct StubDetector {
    detections: Vec<Detection>,
    calls: AtomicUsize,
}

impl StubDetector {
    fn returning(detections: Vec<Detection>) -> Arc<Self> {
        Arc::new(Self {
            detections,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Detector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

struct StubDepth {
    value: f32,
    calls: AtomicUsize,
}

impl StubDepth {
    fn uniform(value: f32) -> Arc<Self> {
        Arc::new(Self {
            value,
            calls: AtomicUsize::new(0),
        })
    }
}

impl DepthEstimator for StubDepth {
    fn estimate_depth(&self, _image: &DynamicImage) -> Result<DepthGrid, DepthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Array2::from_elem((256, 256), self.value))
    }
}

struct SlowDetector;

impl Detector for SlowDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(vec![])
    }
}

fn detection(label: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection {
        label: label.to_string(),
        confidence: 0.9,
        bbox: BoundingBox { x1, y1, x2, y2 },
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 80, 120])));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn fusion_engine() -> FusionEngine {
    FusionEngine::new(FusionConfig::default())
}

#[tokio::test]
async fn pipeline_near_store_sign_is_unsafe_with_image() {
    let detector = StubDetector::returning(vec![detection("store-sign", 10.0, 10.0, 50.0, 50.0)]);
    let depth = StubDepth::uniform(0.4);

    let result = pipeline::run(
        detector.clone(),
        depth,
        &fusion_engine(),
        Duration::from_secs(5),
        &png_bytes(256, 256),
    )
    .await
    .unwrap();

    assert!(result.store_sign_detected);
    assert!(!result.is_safe);
    assert_eq!(result.message, "Watch out! A store sign is ahead!");
    assert_eq!(result.objects.len(), 1);
    assert!(result.objects[0].image.is_some());
}

#[tokio::test]
async fn pipeline_far_person_is_dropped() {
    let detector = StubDetector::returning(vec![detection("person", 0.0, 0.0, 20.0, 20.0)]);
    let depth = StubDepth::uniform(1.5);

    let result = pipeline::run(
        detector,
        depth,
        &fusion_engine(),
        Duration::from_secs(5),
        &png_bytes(256, 256),
    )
    .await
    .unwrap();

    assert!(result.objects.is_empty());
    assert!(result.is_safe);
    assert_eq!(result.message, "Safe to proceed.");
}

#[tokio::test]
async fn pipeline_no_detections_is_safe() {
    let detector = StubDetector::returning(vec![]);
    let depth = StubDepth::uniform(0.4);

    let result = pipeline::run(
        detector,
        depth,
        &fusion_engine(),
        Duration::from_secs(5),
        &png_bytes(128, 128),
    )
    .await
    .unwrap();

    assert!(result.objects.is_empty());
    assert!(!result.store_sign_detected);
    assert!(result.is_safe);
}

#[tokio::test]
async fn pipeline_rejects_malformed_bytes_before_inference() {
    let detector = StubDetector::returning(vec![]);
    let depth = StubDepth::uniform(0.4);

    let result = pipeline::run(
        detector.clone(),
        depth.clone(),
        &fusion_engine(),
        Duration::from_secs(5),
        b"definitely not an image",
    )
    .await;

    assert!(matches!(result.unwrap_err(), PipelineError::Decode(_)));
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    assert_eq!(depth.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pipeline_times_out_on_slow_inference() {
    let depth = StubDepth::uniform(0.4);

    let result = pipeline::run(
        Arc::new(SlowDetector),
        depth,
        &fusion_engine(),
        Duration::from_millis(20),
        &png_bytes(64, 64),
    )
    .await;

    assert!(matches!(result.unwrap_err(), PipelineError::Timeout(_)));
}

fn test_state(detector: Arc<dyn Detector>, depth: Arc<dyn DepthEstimator>) -> AppState {
    AppState {
        detector,
        depth,
        fusion: Arc::new(fusion_engine()),
        workflow: None,
        inference_timeout: Duration::from_secs(5),
    }
}

fn multipart_request(field_name: &str, data: &[u8]) -> Request<Body> {
    let boundary = "safevision-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"frame.png\"\r\n",
            field_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process-image")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn http_near_store_sign_returns_alert() {
    let detector = StubDetector::returning(vec![detection("store-sign", 10.0, 10.0, 50.0, 50.0)]);
    let app = build_router(test_state(detector, StubDepth::uniform(0.4)));

    let response = app
        .oneshot(multipart_request("image", &png_bytes(256, 256)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["storeSignDetected"], true);
    assert_eq!(json["isSafe"], false);
    assert_eq!(json["message"], "Watch out! A store sign is ahead!");
    assert!(json["objects"][0]["image"].is_string());
}

#[tokio::test]
async fn http_malformed_image_is_bad_request() {
    let detector = StubDetector::returning(vec![]);
    let app = build_router(test_state(detector, StubDepth::uniform(0.4)));

    let response = app
        .oneshot(multipart_request("image", b"not an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn http_missing_image_field_is_bad_request() {
    let detector = StubDetector::returning(vec![]);
    let app = build_router(test_state(detector, StubDepth::uniform(0.4)));

    let response = app
        .oneshot(multipart_request("not_image", &png_bytes(32, 32)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"], "Missing multipart field 'image'");
}

#[tokio::test]
async fn http_health_reports_models_loaded() {
    let detector = StubDetector::returning(vec![]);
    let app = build_router(test_state(detector, StubDepth::uniform(0.4)));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["modelsLoaded"], true);
}
