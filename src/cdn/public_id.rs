use once_cell::sync::Lazy;
use regex::Regex;

use super::CdnError;

static UPLOAD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/image/upload(?:/v\d+)?/(.+)$").expect("valid public id pattern")
});

/// Recover the CDN public id from a delivery URL.
///
/// `https://res.cloudinary.com/<cloud>/image/upload/v123/gallery/cat.webp`
/// yields `gallery/cat`. Only the last segment loses its extension.
pub fn extract_public_id(url: &str) -> Result<String, CdnError> {
    let captures = UPLOAD_PATH
        .captures(url)
        .ok_or_else(|| CdnError::InvalidUrl(url.to_string()))?;
    let with_extension = &captures[1];

    let (folders, file) = match with_extension.rsplit_once('/') {
        Some((folders, file)) => (Some(folders), file),
        None => (None, with_extension),
    };
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);

    Ok(match folders {
        Some(folders) => format!("{}/{}", folders, stem),
        None => stem.to_string(),
    })
}
