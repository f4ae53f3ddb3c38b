use axum::extract::{Multipart, State};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::cdn::UploadedAsset;
use crate::database::models::normalize_caption;
use crate::database::{GalleryImage, NewGalleryImage};
use crate::error::ApiError;
use crate::imaging::prepare_upload;
use crate::middleware::{ApiResponse, ApiResult, Bucket, ClientAddr};

/// One `files` part of the multipart body
#[derive(Debug)]
struct IncomingFile {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub images: Vec<GalleryImage>,
    pub errors: Vec<UploadFailure>,
}

/// POST /api/cms/gallery-images - multipart `files` with optional `captions`
pub async fn upload_images(
    State(state): State<AppState>,
    client: ClientAddr,
    multipart: Multipart,
) -> ApiResult<UploadResult> {
    state.limiter.check(Bucket::Upload, &client)?;
    let (files, captions) = read_form(multipart).await?;

    let uploads = files.into_iter().enumerate().map(|(index, file)| {
        let caption = caption_for(index, &captions);
        let state = &state;
        async move {
            let filename = file.filename;
            let bytes = prepare_upload(file.bytes, &filename, &state.config.imaging).await;
            match state.cdn.upload(bytes, &filename).await {
                Ok(asset) => Ok((asset, caption)),
                Err(e) => Err((filename, e)),
            }
        }
    });

    let mut uploaded: Vec<(UploadedAsset, Option<String>)> = Vec::new();
    let mut errors = Vec::new();
    for result in join_all(uploads).await {
        match result {
            Ok(upload) => uploaded.push(upload),
            Err((filename, e)) => {
                error!("Error uploading {} to CDN: {}", filename, e);
                errors.push(UploadFailure {
                    error: ApiError::from(e).message().to_string(),
                    filename,
                });
            }
        }
    }

    if uploaded.is_empty() {
        let details = errors
            .iter()
            .map(|failure| format!("{}: {}", failure.filename, failure.error))
            .collect();
        return Err(ApiError::batch_failed("All uploads failed", details));
    }

    let rows: Vec<NewGalleryImage> = uploaded
        .iter()
        .map(|(asset, caption)| NewGalleryImage {
            image_url: asset.url.clone(),
            caption: caption.clone(),
        })
        .collect();

    let images = match state.store.insert_many(&rows).await {
        Ok(images) => images,
        Err(e) => {
            error!("Saving uploaded images failed, removing {} CDN assets", uploaded.len());
            let cleanup = uploaded.iter().map(|(asset, _)| state.cdn.destroy(&asset.public_id));
            for (result, (asset, _)) in join_all(cleanup).await.into_iter().zip(&uploaded) {
                if let Err(cleanup_error) = result {
                    warn!("Could not remove orphaned asset {}: {}", asset.public_id, cleanup_error);
                }
            }
            return Err(e.into());
        }
    };

    if !errors.is_empty() {
        warn!(
            "Partial upload success: {} succeeded, {} failed",
            images.len(),
            errors.len()
        );
    }
    info!("Successfully uploaded {} image(s)", images.len());

    Ok(ApiResponse::created(UploadResult { images, errors }))
}

/// Collect files and captions; rejects the request if any file is not an image
async fn read_form(mut multipart: Multipart) -> Result<(Vec<IncomingFile>, Vec<String>), ApiError> {
    let mut files = Vec::new();
    let mut captions = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "files" | "files[]" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("file_{}", files.len()));
                let is_image = field
                    .content_type()
                    .map_or(false, |content_type| content_type.starts_with("image/"));
                if !is_image {
                    return Err(ApiError::bad_request(format!(
                        "File '{}' is not a valid image file",
                        filename
                    )));
                }

                let bytes = field.bytes().await?.to_vec();
                files.push(IncomingFile { filename, bytes });
            }
            "captions" | "captions[]" => captions.push(field.text().await?),
            other => warn!("Ignoring unexpected multipart field '{}'", other),
        }
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("At least one image file is required"));
    }

    Ok((files, captions))
}

/// Caption for file `index`: its own caption, or the single caption shared by all files
pub fn caption_for(index: usize, captions: &[String]) -> Option<String> {
    let raw = captions
        .get(index)
        .or_else(|| (captions.len() == 1).then(|| &captions[0]));
    normalize_caption(raw.map(String::as_str))
}
