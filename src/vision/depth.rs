// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Monocular depth estimation adapter
//!
//! Wraps the ONNX depth model behind the [`DepthEstimator`] trait. The
//! model consumes a fixed 256x256 RGB input normalized to [0,1] and
//! produces a dense relative-depth grid at that same resolution. The
//! grid is returned as-is: depth values are NOT mapped back to
//! original-image coordinates, so callers own any coordinate scaling.

use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array2, Array4, Axis};
use ort::session::Session;
use ort::value::Value;
use std::sync::Mutex;
use thiserror::Error;

/// Fixed depth model input/output resolution (square)
pub const DEPTH_GRID_SIZE: u32 = 256;

/// Dense grid of per-pixel relative depth values, shape `(Hd, Wd)`,
/// aligned to the resized model input rather than the original image.
pub type DepthGrid = Array2<f32>;

/// Errors produced by the depth adapter
#[derive(Debug, Error)]
pub enum DepthError {
    #[error("Depth inference failed: {0}")]
    Inference(String),

    #[error("Depth model returned unexpected output shape: {got}")]
    InvalidOutputShape { got: String },
}

impl From<ort::Error> for DepthError {
    fn from(e: ort::Error) -> Self {
        DepthError::Inference(e.to_string())
    }
}

/// Depth estimation seam, stubbable in tests like [`super::Detector`].
pub trait DepthEstimator: Send + Sync {
    fn estimate_depth(&self, image: &DynamicImage) -> Result<DepthGrid, DepthError>;
}

/// ONNX-backed monocular depth model
pub struct OnnxDepthModel {
    session: Mutex<Session>,
}

impl std::fmt::Debug for OnnxDepthModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDepthModel").finish_non_exhaustive()
    }
}

impl OnnxDepthModel {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl DepthEstimator for OnnxDepthModel {
    fn estimate_depth(&self, image: &DynamicImage) -> Result<DepthGrid, DepthError> {
        let input = preprocess(image, DEPTH_GRID_SIZE);

        let mut session = self
            .session
            .lock()
            .map_err(|e| DepthError::Inference(format!("session lock poisoned: {}", e)))?;

        let outputs = session.run(ort::inputs!["image" => Value::from_array(input)?])?;

        let raw = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DepthError::Inference(e.to_string()))?;

        // Accept [Hd, Wd] plus the common batched variants [1, Hd, Wd]
        // and [1, 1, Hd, Wd]
        let mut view = raw.view();
        while view.ndim() > 2 && view.shape()[0] == 1 {
            view = view.index_axis_move(Axis(0), 0);
        }
        if view.ndim() != 2 {
            return Err(DepthError::InvalidOutputShape {
                got: format!("{:?}", raw.shape()),
            });
        }

        view.to_owned()
            .into_dimensionality()
            .map_err(|_| DepthError::InvalidOutputShape {
                got: format!("{:?}", raw.shape()),
            })
    }
}

/// Convert an image into the depth model's input tensor: RGB channel
/// order, bilinear resize to `size` x `size`, intensities scaled to [0,1],
/// NCHW layout.
pub(crate) fn preprocess(image: &DynamicImage, size: u32) -> Array4<f32> {
    let resized = image
        .resize_exact(size, size, FilterType::Triangle)
        .to_rgb8();

    let size = size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }
    input
}
