use std::collections::HashSet;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::images::destroy_remote;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Bucket, ClientAddr};

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub image_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct CdnFailure {
    pub image_id: i64,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResult {
    pub message: String,
    pub deleted_ids: Vec<i64>,
    pub missing_ids: Vec<i64>,
    pub cdn_errors: Vec<CdnFailure>,
}

/// DELETE /api/cms/gallery-images/bulk - remote deletes run concurrently, local delete is one transaction
pub async fn bulk_delete_images(
    State(state): State<AppState>,
    client: ClientAddr,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> ApiResult<BulkDeleteResult> {
    state.limiter.check(Bucket::Delete, &client)?;
    let Json(payload) = payload?;

    if payload.image_ids.is_empty() {
        return Err(ApiError::bad_request("At least one image ID is required"));
    }

    let images = state.store.get_many(&payload.image_ids).await?;
    if images.is_empty() {
        return Err(ApiError::not_found("None of the provided image IDs were found"));
    }

    let found: HashSet<i64> = images.iter().map(|image| image.id).collect();
    let mut missing_ids = Vec::new();
    for id in &payload.image_ids {
        if !found.contains(id) && !missing_ids.contains(id) {
            missing_ids.push(*id);
        }
    }

    let outcomes = join_all(
        images
            .iter()
            .map(|image| destroy_remote(state.cdn.as_ref(), image)),
    )
    .await;

    let cdn_errors: Vec<CdnFailure> = images
        .iter()
        .zip(outcomes)
        .filter_map(|(image, outcome)| outcome.err().map(|error| (image.id, error)))
        .map(|(image_id, error)| {
            warn!("CDN deletion failed for image {}: {}", image_id, error);
            CdnFailure { image_id, error }
        })
        .collect();

    let ids: Vec<i64> = images.iter().map(|image| image.id).collect();
    let deleted_ids = state.store.delete_many(&ids).await?;

    info!(
        "Deleted {} image(s), {} missing, {} CDN failures",
        deleted_ids.len(),
        missing_ids.len(),
        cdn_errors.len()
    );

    Ok(ApiResponse::success(BulkDeleteResult {
        message: format!("Deleted {} image(s) successfully", deleted_ids.len()),
        deleted_ids,
        missing_ids,
        cdn_errors,
    }))
}
