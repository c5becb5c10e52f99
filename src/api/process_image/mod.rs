// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Process-image API endpoint module
//!
//! Provides POST /process-image for the detection-depth fusion pipeline.

pub mod handler;
pub mod response;

pub use handler::process_image_handler;
pub use response::ProcessImageResponse;
