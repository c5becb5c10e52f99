// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Downstream workflow service client
//!
//! Forwards the fusion outcome to the workflow/orchestration service and
//! relays its acknowledgement back to the request path. Transport only;
//! no transformation beyond structural serialization.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::vision::fusion::FusionResult;

const FORWARD_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the downstream collaborator
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow service unreachable: {0}")]
    Request(String),

    #[error("Workflow service returned status {0}")]
    Status(u16),

    #[error("Workflow service returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// HTTP client for the workflow service
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    client: reqwest::Client,
    endpoint: String,
}

impl WorkflowClient {
    pub fn new(endpoint: String) -> Result<Self, WorkflowError> {
        let client = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()
            .map_err(|e| WorkflowError::Request(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// POST `{storeSignDetected, objects}` downstream and return the
    /// collaborator's JSON acknowledgement.
    pub async fn forward(&self, result: &FusionResult) -> Result<Value, WorkflowError> {
        let payload = forward_payload(result);
        debug!(endpoint = %self.endpoint, "forwarding fusion result to workflow service");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WorkflowError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| WorkflowError::InvalidResponse(e.to_string()))
    }
}

fn forward_payload(result: &FusionResult) -> Value {
    json!({
        "storeSignDetected": result.store_sign_detected,
        "objects": result.objects,
    })
}
