use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::gallery::Ordered;

/// One row of `gallery_images`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GalleryImage {
    pub id: i64,
    /// Stored in the `cloudinary_url` column shared with existing deployments
    #[sqlx(rename = "cloudinary_url")]
    pub image_url: String,
    pub caption: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection; timestamps are not needed by the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicGalleryImage {
    pub id: i64,
    pub image_url: String,
    pub caption: Option<String>,
    pub display_order: i32,
}

/// Image that has been stored on the CDN and is waiting for its row
#[derive(Debug, Clone, PartialEq)]
pub struct NewGalleryImage {
    pub image_url: String,
    pub caption: Option<String>,
}

impl Ordered for GalleryImage {
    fn display_order(&self) -> i32 {
        self.display_order
    }
}

impl From<GalleryImage> for PublicGalleryImage {
    fn from(image: GalleryImage) -> Self {
        Self {
            id: image.id,
            image_url: image.image_url,
            caption: image.caption,
            display_order: image.display_order,
        }
    }
}

/// Trim a caption; blank captions are stored as NULL.
pub fn normalize_caption(caption: Option<&str>) -> Option<String> {
    caption
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}
