//! Re-encode uploads to WebP before they are sent to the CDN.

use std::io::Cursor;
use std::sync::Arc;

use image::{codecs::webp::WebPEncoder, imageops::FilterType, DynamicImage, ImageFormat, ImageReader};
use tracing::{debug, info, warn};

use crate::config::ImagingConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Converted {
        bytes: Vec<u8>,
        original_size: usize,
        converted_size: usize,
    },
    /// Input was already WebP
    Skipped,
    /// Input could not be decoded or encoded; the original is uploaded instead
    Failed(String),
}

/// Decode, normalise colour, cap the longest side and encode as WebP.
pub fn convert_to_webp(input: &[u8], config: &ImagingConfig) -> Conversion {
    let reader = match ImageReader::new(Cursor::new(input)).with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => return Conversion::Failed(e.to_string()),
    };

    if config.skip_if_webp && reader.format() == Some(ImageFormat::WebP) {
        return Conversion::Skipped;
    }

    let decoded = match reader.decode() {
        Ok(img) => img,
        Err(e) => return Conversion::Failed(format!("cannot identify image: {}", e)),
    };

    let mut img = normalize_color(decoded);

    if let Some(max) = config.max_dimension {
        if img.width() > max || img.height() > max {
            let (width, height) = (img.width(), img.height());
            img = img.resize(max, max, FilterType::Lanczos3);
            info!(
                "Downscaled image from {}x{} to {}x{} (max dimension {})",
                width,
                height,
                img.width(),
                img.height(),
                max
            );
        }
    }

    let mut output = Vec::new();
    if let Err(e) = img.write_with_encoder(WebPEncoder::new_lossless(&mut output)) {
        return Conversion::Failed(format!("WebP encoding failed: {}", e));
    }

    Conversion::Converted {
        original_size: input.len(),
        converted_size: output.len(),
        bytes: output,
    }
}

/// WebP takes 8-bit RGB or RGBA; keep alpha when the source has it.
fn normalize_color(img: DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Bytes to upload for `original`: the WebP version when it is smaller, otherwise the original.
pub async fn prepare_upload(original: Vec<u8>, filename: &str, config: &ImagingConfig) -> Vec<u8> {
    if !config.convert_to_webp {
        return original;
    }

    let config = config.clone();
    let shared = Arc::new(original);
    let input = Arc::clone(&shared);
    let conversion = tokio::task::spawn_blocking(move || convert_to_webp(&input, &config))
        .await
        .unwrap_or_else(|e| Conversion::Failed(format!("conversion task failed: {}", e)));
    let original = Arc::try_unwrap(shared).unwrap_or_else(|still_shared| (*still_shared).clone());

    match conversion {
        Conversion::Converted {
            bytes,
            original_size,
            converted_size,
        } if converted_size < original_size => {
            info!(
                "Converted {} to WebP: {} bytes -> {} bytes",
                filename, original_size, converted_size
            );
            bytes
        }
        Conversion::Converted { .. } => {
            debug!("WebP conversion did not reduce size for {}, using original", filename);
            original
        }
        Conversion::Skipped => {
            debug!("{} is already WebP, skipping conversion", filename);
            original
        }
        Conversion::Failed(reason) => {
            warn!("WebP conversion failed for {} ({}), uploading original format", filename, reason);
            original
        }
    }
}
