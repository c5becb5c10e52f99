// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Detection-depth fusion
//!
//! Combines one detection list and one depth grid into distance-annotated
//! objects and a two-state safety verdict. Each retained object derives
//! from exactly one detection and exactly one depth sample.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::depth::DepthGrid;
use super::detector::Detection;

/// Detection label that triggers the safety-alert branch
pub const STORE_SIGN_LABEL: &str = "store-sign";

/// Verdict message when a store sign is within the near threshold
pub const UNSAFE_MESSAGE: &str = "Watch out! A store sign is ahead!";

/// Verdict message for every other outcome
pub const SAFE_MESSAGE: &str = "Safe to proceed.";

/// How bounding-box centers are mapped onto the depth grid.
///
/// The depth grid is aligned to the resized model input, not the original
/// image, so indexing it with original-image coordinates is geometrically
/// wrong whenever the resolutions differ. `Direct` reproduces that legacy
/// behavior faithfully (with out-of-range indices turned into a defined
/// error instead of an out-of-bounds read); `Rescaled` maps centers into
/// grid space and is the mode production deployments should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthSampling {
    /// Index the grid with original-image pixel coordinates, unscaled
    Direct,
    /// Scale centers by (Wd/W, Hd/H) and clamp to the grid
    #[default]
    Rescaled,
}

impl DepthSampling {
    /// Parse a configuration string; anything other than `direct` selects
    /// the corrected mode.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "direct" => DepthSampling::Direct,
            _ => DepthSampling::Rescaled,
        }
    }
}

/// Tunable fusion parameters
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Linear factor converting a raw depth sample to distance units.
    /// Placeholder calibration, not physically derived.
    pub distance_scale: f32,
    /// Store signs at or under this distance raise the alert
    pub near_threshold: f32,
    /// Objects beyond this distance are dropped from the result
    pub far_threshold: f32,
    /// Depth grid sampling mode
    pub sampling: DepthSampling,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            distance_scale: 10.0,
            near_threshold: 6.0,
            far_threshold: 10.0,
            sampling: DepthSampling::Rescaled,
        }
    }
}

/// Errors produced during fusion
#[derive(Debug, Error)]
pub enum FusionError {
    #[error(
        "Depth sample ({cx}, {cy}) is outside the {grid_w}x{grid_h} depth grid"
    )]
    DepthIndexOutOfBounds {
        cx: usize,
        cy: usize,
        grid_w: usize,
        grid_h: usize,
    },

    #[error("Invalid distance {distance} for object '{label}'")]
    InvalidDistance { label: String, distance: f32 },

    #[error("Failed to encode alert image: {0}")]
    ImageEncode(String),
}

/// An object retained in the result, annotated with its estimated distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedObject {
    /// Object label/class
    pub label: String,
    /// Estimated distance in scaled units
    pub distance: f32,
    /// Full original image, PNG base64, attached only to near store-signs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// The single artifact produced per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionResult {
    pub store_sign_detected: bool,
    /// Retained objects in detector emission order
    pub objects: Vec<AnnotatedObject>,
    pub message: String,
    pub is_safe: bool,
}

/// Combines detections with a depth grid under the configured thresholds
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse one detection list with one depth grid.
    ///
    /// Per detection, in emission order: sample the grid at the box
    /// center, convert the sample to a distance, then apply the threshold
    /// policy (near store-sign raises the alert and carries the full
    /// image; anything within the far threshold is reported bare;
    /// everything else is dropped to bound the payload).
    pub fn fuse(
        &self,
        detections: &[Detection],
        depth: &DepthGrid,
        image: &DynamicImage,
    ) -> Result<FusionResult, FusionError> {
        let (grid_h, grid_w) = depth.dim();

        let mut store_sign_detected = false;
        let mut objects = Vec::new();
        // Encoded once, shared by every qualifying store sign
        let mut encoded_image: Option<String> = None;

        for detection in detections {
            let (cx, cy) = detection.bbox.center();
            let (cx, cy) = (cx as usize, cy as usize);

            let sample = match self.config.sampling {
                DepthSampling::Direct => {
                    if cx >= grid_w || cy >= grid_h {
                        return Err(FusionError::DepthIndexOutOfBounds {
                            cx,
                            cy,
                            grid_w,
                            grid_h,
                        });
                    }
                    depth[[cy, cx]]
                }
                DepthSampling::Rescaled => {
                    if grid_w == 0 || grid_h == 0 {
                        return Err(FusionError::DepthIndexOutOfBounds {
                            cx,
                            cy,
                            grid_w,
                            grid_h,
                        });
                    }
                    let gx = (cx as f32 * grid_w as f32 / image.width() as f32) as usize;
                    let gy = (cy as f32 * grid_h as f32 / image.height() as f32) as usize;
                    depth[[gy.min(grid_h - 1), gx.min(grid_w - 1)]]
                }
            };

            let distance = sample * self.config.distance_scale;
            if !distance.is_finite() || distance < 0.0 {
                return Err(FusionError::InvalidDistance {
                    label: detection.label.clone(),
                    distance,
                });
            }

            if detection.label == STORE_SIGN_LABEL && distance <= self.config.near_threshold {
                store_sign_detected = true;
                let encoded = match &encoded_image {
                    Some(encoded) => encoded.clone(),
                    None => {
                        let encoded = encode_image_base64(image)?;
                        encoded_image = Some(encoded.clone());
                        encoded
                    }
                };
                objects.push(AnnotatedObject {
                    label: detection.label.clone(),
                    distance,
                    image: Some(encoded),
                });
            } else if distance <= self.config.far_threshold {
                objects.push(AnnotatedObject {
                    label: detection.label.clone(),
                    distance,
                    image: None,
                });
            }
            // else: dropped, deliberately not an error
        }

        let message = if store_sign_detected {
            UNSAFE_MESSAGE
        } else {
            SAFE_MESSAGE
        };

        Ok(FusionResult {
            store_sign_detected,
            objects,
            message: message.to_string(),
            is_safe: !store_sign_detected,
        })
    }
}

fn encode_image_base64(image: &DynamicImage) -> Result<String, FusionError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| FusionError::ImageEncode(e.to_string()))?;
    Ok(STANDARD.encode(&buf))
}
