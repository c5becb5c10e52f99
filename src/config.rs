// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Environment-driven node configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::vision::fusion::{DepthSampling, FusionConfig};

/// Top-level service configuration, read once at startup
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port the HTTP API listens on
    pub api_port: u16,
    /// Path to the ONNX detection model
    pub detection_model_path: PathBuf,
    /// Optional label file (one label per line); falls back to the
    /// embedded default list
    pub detection_labels_path: Option<PathBuf>,
    /// Path to the ONNX depth model
    pub depth_model_path: PathBuf,
    /// Minimum confidence for a detection to be considered
    pub confidence_threshold: f32,
    /// Bound on the detect + depth inference phase per request
    pub inference_timeout: Duration,
    /// Downstream workflow service; forwarding is skipped when unset
    pub workflow_url: Option<String>,
    /// Fusion thresholds and sampling mode
    pub fusion: FusionConfig,
}

impl NodeConfig {
    /// Read configuration from the environment, with defaults for
    /// everything except model locations (which default to `./models`).
    pub fn from_env() -> Self {
        let fusion = FusionConfig {
            distance_scale: parse_env("DISTANCE_SCALE", 10.0),
            near_threshold: parse_env("NEAR_THRESHOLD", 6.0),
            far_threshold: parse_env("FAR_THRESHOLD", 10.0),
            sampling: env::var("FUSION_SAMPLING")
                .map(|v| DepthSampling::parse(&v))
                .unwrap_or_default(),
        };

        Self {
            api_port: parse_env("API_PORT", 8080),
            detection_model_path: PathBuf::from(
                env::var("DETECTION_MODEL_PATH")
                    .unwrap_or_else(|_| "./models/detector.onnx".to_string()),
            ),
            detection_labels_path: env::var("DETECTION_LABELS_PATH").ok().map(PathBuf::from),
            depth_model_path: PathBuf::from(
                env::var("DEPTH_MODEL_PATH").unwrap_or_else(|_| "./models/depth.onnx".to_string()),
            ),
            confidence_threshold: parse_env("CONFIDENCE_THRESHOLD", 0.5),
            inference_timeout: Duration::from_secs(parse_env("INFERENCE_TIMEOUT_SECS", 30)),
            workflow_url: env::var("WORKFLOW_URL").ok().filter(|v| !v.is_empty()),
            fusion,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
