use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub image_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReorderResult {
    pub message: String,
    pub count: usize,
}

/// PUT /api/cms/gallery-images/reorder - move the listed images to the front, in order
pub async fn reorder_images(
    State(state): State<AppState>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<ReorderResult> {
    let Json(payload) = payload?;

    let count = state.store.reorder(&payload.image_ids).await?;

    info!("Reordered {} images", count);
    Ok(ApiResponse::success(ReorderResult {
        message: format!("Successfully reordered {} images", count),
        count,
    }))
}
