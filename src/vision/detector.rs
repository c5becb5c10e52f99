// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Object detection adapter
//!
//! Wraps the ONNX detection model behind the [`Detector`] trait and
//! normalizes its raw output tensor into a list of [`Detection`]s in
//! original-image pixel coordinates.

use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, ArrayViewD};
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// Fixed detector input resolution (square)
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// Label list for the default detector export, one entry per class id.
pub const DEFAULT_LABELS: &[&str] = &[
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "bus",
    "truck",
    "traffic-light",
    "stop-sign",
    "store-sign",
    "door",
    "stairs",
    "bench",
    "pole",
    "dog",
];

/// Errors produced by the detection adapter
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Detection inference failed: {0}")]
    Inference(String),

    #[error("Detector returned unexpected output shape: expected {expected}, got {got}")]
    InvalidOutputShape { expected: String, got: String },
}

impl From<ort::Error> for DetectionError {
    fn from(e: ort::Error) -> Self {
        DetectionError::Inference(e.to_string())
    }
}

/// Axis-aligned bounding box in original-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Box center in the same coordinate space as the corners
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// One object instance found by the detection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Object label/class
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box in original-image pixels
    pub bbox: BoundingBox,
}

/// Object detection seam: the pipeline only sees this trait, which lets
/// tests substitute stub detectors for the loaded ONNX session.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError>;
}

/// ONNX-backed detector
///
/// Standard exports embed a normalization preprocessing graph and take a
/// raw 0-255 float input named `images`. Some model revisions were
/// exported with that graph stripped; they expose the input as
/// `images_raw` instead. For those revisions the adapter runs the same
/// tensor through as an identity pass-through (degraded but valid) and
/// logs a correction once at load time. Inference always runs exactly
/// once per call; there is no patch-then-retry.
pub struct OnnxDetector {
    session: Mutex<Session>,
    labels: Vec<String>,
    confidence_threshold: f32,
    /// Set when the export is missing its normalization graph
    identity_norm: bool,
}

impl std::fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("labels", &self.labels.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("identity_norm", &self.identity_norm)
            .finish_non_exhaustive()
    }
}

impl OnnxDetector {
    /// Wrap a loaded session. The normalization capability check happens
    /// here, before any inference, by inspecting the input signature.
    pub fn new(session: Session, labels: Vec<String>, confidence_threshold: f32) -> Self {
        let input_names: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        let identity_norm = needs_identity_norm(&input_names);
        if identity_norm {
            warn!(
                "detector export is missing its normalization graph; \
                 treating it as an identity pass-through"
            );
        }

        Self {
            session: Mutex::new(session),
            labels,
            confidence_threshold,
            identity_norm,
        }
    }

    fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let resized = image
            .resize_exact(DETECTOR_INPUT_SIZE, DETECTOR_INPUT_SIZE, FilterType::Triangle)
            .to_rgb8();

        let size = DETECTOR_INPUT_SIZE as usize;
        let mut input = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input[[0, 0, y, x]] = pixel[0] as f32;
            input[[0, 1, y, x]] = pixel[1] as f32;
            input[[0, 2, y, x]] = pixel[2] as f32;
        }
        input
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
        let input = self.preprocess(image);

        let mut session = self
            .session
            .lock()
            .map_err(|e| DetectionError::Inference(format!("session lock poisoned: {}", e)))?;

        // Both exports consume the same tensor; only the input name differs.
        let outputs = if self.identity_norm {
            session.run(ort::inputs!["images_raw" => Value::from_array(input)?])?
        } else {
            session.run(ort::inputs!["images" => Value::from_array(input)?])?
        };

        let preds = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        decode_detections(
            preds.view(),
            image.width(),
            image.height(),
            self.confidence_threshold,
            &self.labels,
        )
    }
}

/// Decide from a session's input signature whether the export is
/// missing its normalization graph. Stripped exports rename the image
/// input from `images` to `images_raw`.
pub(crate) fn needs_identity_norm(input_names: &[&str]) -> bool {
    input_names.contains(&"images_raw")
}

/// Decode a raw `[1, N, 6]` detection tensor (`x1, y1, x2, y2, score,
/// class_id` per row, coordinates in model-input space) into detections
/// in original-image pixels.
///
/// Rows below the confidence threshold are skipped; surviving rows keep
/// the detector's emission order. Boxes are rescaled to the original
/// resolution and clamped to the image bounds.
pub(crate) fn decode_detections(
    preds: ArrayViewD<'_, f32>,
    orig_width: u32,
    orig_height: u32,
    confidence_threshold: f32,
    labels: &[String],
) -> Result<Vec<Detection>, DetectionError> {
    let shape = preds.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[2] != 6 {
        return Err(DetectionError::InvalidOutputShape {
            expected: "[1, N, 6]".to_string(),
            got: format!("{:?}", shape),
        });
    }
    let preds = preds
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|_| DetectionError::InvalidOutputShape {
            expected: "[1, N, 6]".to_string(),
            got: format!("{:?}", shape),
        })?;

    let sx = orig_width as f32 / DETECTOR_INPUT_SIZE as f32;
    let sy = orig_height as f32 / DETECTOR_INPUT_SIZE as f32;

    let mut detections = Vec::new();
    for row in 0..shape[1] {
        let confidence = preds[[0, row, 4]];
        if confidence < confidence_threshold {
            continue;
        }

        let class_id = preds[[0, row, 5]] as usize;
        let label = labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class-{}", class_id));

        let x1 = (preds[[0, row, 0]] * sx).clamp(0.0, orig_width as f32);
        let y1 = (preds[[0, row, 1]] * sy).clamp(0.0, orig_height as f32);
        let x2 = (preds[[0, row, 2]] * sx).clamp(0.0, orig_width as f32);
        let y2 = (preds[[0, row, 3]] * sy).clamp(0.0, orig_height as f32);

        // Degenerate boxes carry no usable location
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        detections.push(Detection {
            label,
            confidence,
            bbox: BoundingBox { x1, y1, x2, y2 },
        });
    }

    Ok(detections)
}
