// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Process-image response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vision::fusion::{AnnotatedObject, FusionResult};

/// Outbound payload for a completed request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageResponse {
    pub store_sign_detected: bool,
    pub objects: Vec<AnnotatedObject>,
    pub message: String,
    pub is_safe: bool,
    /// Acknowledgement relayed from the workflow service, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_ack: Option<Value>,
}

impl ProcessImageResponse {
    pub fn from_fusion(result: FusionResult, workflow_ack: Option<Value>) -> Self {
        Self {
            store_sign_detected: result.store_sign_detected,
            objects: result.objects,
            message: result.message,
            is_safe: result.is_safe,
            workflow_ack,
        }
    }
}
