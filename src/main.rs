// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use safevision_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    vision::{FusionEngine, VisionModelManager},
    workflow::WorkflowClient,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting SafeVision node...\n");

    let config = NodeConfig::from_env();
    tracing::info!(
        sampling = ?config.fusion.sampling,
        near = config.fusion.near_threshold,
        far = config.fusion.far_threshold,
        scale = config.fusion.distance_scale,
        "fusion configuration"
    );

    println!("🧠 Loading vision models...");
    let manager = VisionModelManager::load(&config).await?;
    println!("✅ Vision models ready");

    let workflow = match config.workflow_url.clone() {
        Some(url) => {
            tracing::info!(%url, "workflow forwarding enabled");
            Some(Arc::new(WorkflowClient::new(url)?))
        }
        None => {
            tracing::info!("no WORKFLOW_URL configured, downstream forwarding disabled");
            None
        }
    };

    let state = AppState {
        detector: manager.detector(),
        depth: manager.depth_estimator(),
        fusion: Arc::new(FusionEngine::new(config.fusion.clone())),
        workflow,
        inference_timeout: config.inference_timeout,
    };

    start_server(state, config.api_port).await
}
