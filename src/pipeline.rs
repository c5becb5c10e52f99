// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Per-request pipeline orchestration
//!
//! decode -> {detect, estimate depth} -> fuse, as one synchronous logical
//! sequence per request. Detection and depth estimation depend only on
//! the decoded image, so they run concurrently on blocking worker
//! threads and are joined before fusion. No retries anywhere; any
//! adapter failure terminates the request.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::vision::depth::{DepthError, DepthEstimator};
use crate::vision::detector::{DetectionError, Detector};
use crate::vision::fusion::{FusionEngine, FusionError, FusionResult};
use crate::vision::image_utils::{self, DecodeError};

/// Anything that can terminate a request before a result is produced
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Depth(#[from] DepthError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Inference task failed: {0}")]
    Join(String),
}

/// Run the full detection-depth fusion pipeline over one uploaded image.
///
/// The two inference calls share a bounded timeout; hitting it fails the
/// request with [`PipelineError::Timeout`] instead of blocking
/// indefinitely.
pub async fn run(
    detector: Arc<dyn Detector>,
    depth: Arc<dyn DepthEstimator>,
    fusion: &FusionEngine,
    inference_timeout: Duration,
    bytes: &[u8],
) -> Result<FusionResult, PipelineError> {
    let (image, info) = image_utils::decode_image_bytes(bytes)?;
    debug!(
        width = info.width,
        height = info.height,
        format = ?info.format,
        "decoded uploaded image"
    );

    let detect_image = image.clone();
    let detect_task = tokio::task::spawn_blocking(move || detector.detect(&detect_image));

    let depth_image = image.clone();
    let depth_task = tokio::task::spawn_blocking(move || depth.estimate_depth(&depth_image));

    let (detections, grid) = tokio::time::timeout(inference_timeout, async {
        let (detect_result, depth_result) = tokio::try_join!(detect_task, depth_task)
            .map_err(|e| PipelineError::Join(e.to_string()))?;
        Ok::<_, PipelineError>((detect_result?, depth_result?))
    })
    .await
    .map_err(|_| PipelineError::Timeout(inference_timeout))??;

    debug!(detections = detections.len(), "joined inference results");

    Ok(fusion.fuse(&detections, &grid, &image)?)
}
