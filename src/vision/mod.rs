// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing: decode, detect, estimate depth, fuse

pub mod depth;
pub mod detector;
pub mod fusion;
pub mod image_utils;
pub mod model_manager;

pub use depth::{DepthEstimator, DepthError, DepthGrid, OnnxDepthModel, DEPTH_GRID_SIZE};
pub use detector::{
    BoundingBox, Detection, DetectionError, Detector, OnnxDetector, DEFAULT_LABELS,
};
pub use fusion::{
    AnnotatedObject, DepthSampling, FusionConfig, FusionEngine, FusionError, FusionResult,
    SAFE_MESSAGE, STORE_SIGN_LABEL, UNSAFE_MESSAGE,
};
pub use image_utils::{decode_image_bytes, detect_format, DecodeError, ImageInfo};
pub use model_manager::VisionModelManager;
