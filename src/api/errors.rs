// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Request-boundary error mapping
//!
//! Every pipeline failure is converted here into an HTTP status plus a
//! `{"error": ...}` body. Error text is surfaced verbatim; that matches
//! the service contract for an internal prototype but should be
//! sanitized before any public deployment.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::PipelineError;
use crate::workflow::WorkflowError;

/// Wire shape of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// API-level error taxonomy
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Caller-supplied bad input (missing/empty multipart field)
    InvalidRequest(String),
    /// Caller-supplied undecodable image
    DecodeFailed(String),
    /// Detection, depth, or fusion failure
    InternalError(String),
    /// Downstream workflow collaborator failure
    UpstreamError(String),
    /// Bounded inference timeout hit
    Timeout(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::DecodeFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg)
            | ApiError::DecodeFailed(msg)
            | ApiError::InternalError(msg)
            | ApiError::UpstreamError(msg)
            | ApiError::Timeout(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Decode(inner) => ApiError::DecodeFailed(inner.to_string()),
            timeout @ PipelineError::Timeout(_) => ApiError::Timeout(timeout.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        ApiError::UpstreamError(e.to_string())
    }
}
