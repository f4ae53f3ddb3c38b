use axum::extract::{rejection::QueryRejection, Query, State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::cdn::{extract_public_id, ImageCdn};
use crate::database::PublicGalleryImage;
use crate::error::ApiError;
use crate::gallery::PageRequest;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub limit: Option<i64>,
    pub cursor: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub next_cursor: Option<i32>,
    pub has_more: bool,
    pub total_count: i64,
}

#[derive(Debug, Serialize)]
pub struct GalleryPage {
    pub images: Vec<PublicGalleryImage>,
    pub pagination: Pagination,
}

/// GET /api/gallery-images - cursor page ordered by display_order
pub async fn gallery_images(
    State(state): State<AppState>,
    query: Result<Query<GalleryQuery>, QueryRejection>,
) -> ApiResult<GalleryPage> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let api = &state.config.api;

    let request = PageRequest::new(
        query.limit.unwrap_or(api.default_page_limit),
        query.cursor,
        api.max_page_limit,
    )?;

    let page = state.store.page(&request).await?;
    info!(
        "Retrieved {} gallery images (cursor: {:?}, next: {:?}, has_more: {})",
        page.items.len(),
        request.cursor,
        page.next_cursor,
        page.has_more
    );

    let resize = (query.width, query.height);
    let page = page.map(|image| {
        let mut public = PublicGalleryImage::from(image);
        if resize.0.is_some() || resize.1.is_some() {
            public.image_url = optimized(state.cdn.as_ref(), &public.image_url, resize);
        }
        public
    });

    Ok(ApiResponse::success(GalleryPage {
        images: page.items,
        pagination: Pagination {
            next_cursor: page.next_cursor,
            has_more: page.has_more,
            total_count: page.total_count,
        },
    }))
}

/// Rewrite a stored URL into a resized delivery URL; unknown URLs pass through
fn optimized(cdn: &dyn ImageCdn, url: &str, (width, height): (Option<u32>, Option<u32>)) -> String {
    match extract_public_id(url) {
        Ok(public_id) => cdn.optimized_url(&public_id, width, height),
        Err(e) => {
            warn!("Serving unoptimised URL: {}", e);
            url.to_string()
        }
    }
}
