// Copyright (c) 2025 SafeVision
// SPDX-License-Identifier: BUSL-1.1
//! Process-image endpoint handler

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;
use uuid::Uuid;

use super::response::ProcessImageResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::pipeline;

/// POST /process-image - run the detection-depth fusion pipeline
///
/// Accepts a multipart form with an `image` field of raw image bytes,
/// returns the fusion verdict. When a workflow service is configured the
/// fusion outcome is forwarded there first and its acknowledgement is
/// relayed inside the response.
pub async fn process_image_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessImageResponse>, ApiError> {
    let request_id = Uuid::new_v4();

    let mut image_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to read image field: {}", e)))?;
            image_bytes = Some(bytes);
            break;
        }
    }

    let bytes = image_bytes
        .ok_or_else(|| ApiError::InvalidRequest("Missing multipart field 'image'".to_string()))?;

    info!(%request_id, size_bytes = bytes.len(), "processing uploaded image");

    let result = pipeline::run(
        state.detector.clone(),
        state.depth.clone(),
        &state.fusion,
        state.inference_timeout,
        &bytes,
    )
    .await?;

    let workflow_ack = match &state.workflow {
        Some(client) => Some(client.forward(&result).await?),
        None => None,
    };

    info!(
        %request_id,
        store_sign_detected = result.store_sign_detected,
        objects = result.objects.len(),
        "pipeline complete"
    );

    Ok(Json(ProcessImageResponse::from_fusion(result, workflow_ack)))
}
