use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::cdn::{extract_public_id, DestroyOutcome, ImageCdn};
use crate::database::models::normalize_caption;
use crate::database::GalleryImage;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Bucket, ClientAddr};

#[derive(Debug, Deserialize)]
pub struct CaptionUpdate {
    pub caption: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedImage {
    pub message: String,
    pub image_id: i64,
}

/// GET /api/cms/gallery-images - every image, full projection
pub async fn list_images(State(state): State<AppState>) -> ApiResult<Vec<GalleryImage>> {
    let images = state.store.list_all().await?;
    info!("Retrieved {} gallery images for CMS", images.len());
    Ok(ApiResponse::success(images))
}

/// PUT /api/cms/gallery-images/:id - replace the caption
pub async fn update_image(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CaptionUpdate>, JsonRejection>,
) -> ApiResult<GalleryImage> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let Json(payload) = payload?;

    let caption = normalize_caption(payload.caption.as_deref());
    let image = state
        .store
        .update_caption(id, caption)
        .await?
        .ok_or_else(|| image_not_found(id))?;

    info!("Updated caption for image {}", id);
    Ok(ApiResponse::success(image))
}

/// DELETE /api/cms/gallery-images/:id - remove from the CDN, then locally
pub async fn delete_image(
    State(state): State<AppState>,
    client: ClientAddr,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeletedImage> {
    state.limiter.check(Bucket::Delete, &client)?;
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let image = state.store.get(id).await?.ok_or_else(|| image_not_found(id))?;

    if let Err(e) = destroy_remote(state.cdn.as_ref(), &image).await {
        warn!("Continuing with local delete of image {}: {}", id, e);
    }

    let deleted = state.store.delete_many(&[id]).await?;
    if deleted.is_empty() {
        return Err(image_not_found(id));
    }

    info!("Deleted image {}", id);
    Ok(ApiResponse::success(DeletedImage {
        message: "Image deleted successfully".to_string(),
        image_id: id,
    }))
}

/// Best-effort CDN delete; an asset that is already gone counts as deleted
pub(super) async fn destroy_remote(cdn: &dyn ImageCdn, image: &GalleryImage) -> Result<(), String> {
    let public_id = extract_public_id(&image.image_url).map_err(|e| e.to_string())?;

    match cdn.destroy(&public_id).await {
        Ok(DestroyOutcome::Deleted) | Ok(DestroyOutcome::NotFound) => Ok(()),
        Ok(DestroyOutcome::Other(result)) => Err(format!("unexpected CDN result: {}", result)),
        Err(e) => Err(e.to_string()),
    }
}

fn image_not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Image ID {} does not exist", id))
}
