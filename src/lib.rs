// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! SafeVision node: detection-depth fusion service.
//!
//! Accepts a single image over HTTP, runs ONNX object detection and
//! monocular depth estimation, fuses the two outputs into per-object
//! distance estimates, and emits a safety verdict.

pub mod api;
pub mod config;
pub mod pipeline;
pub mod vision;
pub mod workflow;

pub use config::NodeConfig;
pub use pipeline::PipelineError;
pub use vision::{
    AnnotatedObject, BoundingBox, DepthEstimator, DepthGrid, Detection, Detector, FusionConfig,
    FusionEngine, FusionResult, VisionModelManager,
};
pub use workflow::WorkflowClient;
