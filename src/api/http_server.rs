// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface: router, shared state, server startup

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::process_image::process_image_handler;
use crate::vision::depth::DepthEstimator;
use crate::vision::detector::Detector;
use crate::vision::fusion::FusionEngine;
use crate::workflow::WorkflowClient;

/// Uploads can reach the 10MB image cap plus multipart framing
const MAX_BODY_SIZE: usize = 12 * 1024 * 1024;

/// Shared request-path handles, injected once at startup
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn Detector>,
    pub depth: Arc<dyn DepthEstimator>,
    pub fusion: Arc<FusionEngine>,
    pub workflow: Option<Arc<WorkflowClient>>,
    pub inference_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub models_loaded: bool,
    pub timestamp: DateTime<Utc>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/process-image", post(process_image_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        // Startup fails before the server binds if either model is
        // missing, so a serving process always has both loaded.
        status: "healthy".to_string(),
        models_loaded: true,
        timestamp: Utc::now(),
    })
}
