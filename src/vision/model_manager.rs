// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading the detection and depth models
//!
//! Both ONNX sessions are loaded once at startup, wrapped in their
//! adapter service objects, and handed to the request path as shared
//! handles. Nothing in the pipeline touches process-wide globals.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::vision::depth::{DepthEstimator, OnnxDepthModel};
use crate::vision::detector::{Detector, OnnxDetector, DEFAULT_LABELS};

/// Owns the loaded inference models for the lifetime of the process
pub struct VisionModelManager {
    detector: Arc<OnnxDetector>,
    depth: Arc<OnnxDepthModel>,
}

impl VisionModelManager {
    /// Load both models from the configured paths.
    ///
    /// Missing model files fail startup rather than degrading silently.
    pub async fn load(config: &NodeConfig) -> Result<Self> {
        let labels = match &config.detection_labels_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read label file {}", path.display()))?;
                parse_labels(&raw)
            }
            None => DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        };

        let detector_session = build_session(&config.detection_model_path)
            .with_context(|| {
                format!(
                    "Failed to load detection model from {}",
                    config.detection_model_path.display()
                )
            })?;
        info!(
            "✅ Detection model loaded from {}",
            config.detection_model_path.display()
        );

        let depth_session = build_session(&config.depth_model_path).with_context(|| {
            format!(
                "Failed to load depth model from {}",
                config.depth_model_path.display()
            )
        })?;
        info!(
            "✅ Depth model loaded from {}",
            config.depth_model_path.display()
        );

        Ok(Self {
            detector: Arc::new(OnnxDetector::new(
                detector_session,
                labels,
                config.confidence_threshold,
            )),
            depth: Arc::new(OnnxDepthModel::new(depth_session)),
        })
    }

    pub fn detector(&self) -> Arc<dyn Detector> {
        self.detector.clone()
    }

    pub fn depth_estimator(&self) -> Arc<dyn DepthEstimator> {
        self.depth.clone()
    }
}

/// One label per line, class id = line number
fn parse_labels(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Build an ONNX Runtime session, trying CUDA first and falling back to
/// CPU when it is unavailable.
fn build_session(model_path: &Path) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("ONNX model file not found: {}", model_path.display());
    }

    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("✅ CUDA execution provider initialized");
            Ok(session)
        }
        Err(e) => {
            warn!("⚠️  CUDA execution provider failed: {}", e);
            warn!("   Falling back to CPU execution provider");
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(4)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .context("Failed to load ONNX model")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_skips_blank_lines() {
        let labels = parse_labels("person\n\n store-sign \ncar\n");
        assert_eq!(labels, vec!["person", "store-sign", "car"]);
    }
}
