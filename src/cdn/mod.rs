// cdn/mod.rs - Remote image storage and delivery
//
// The gallery keeps only a URL per image; the bytes live on the CDN. Handlers
// talk to the `ImageCdn` trait so tests can swap in a fake.

use async_trait::async_trait;
use thiserror::Error;

pub mod cloudinary;
pub mod public_id;
pub mod retry;

pub use cloudinary::CloudinaryClient;
pub use public_id::extract_public_id;
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum CdnError {
    #[error("CDN credentials not configured: {0:?}")]
    NotConfigured(Vec<&'static str>),

    #[error("Invalid CDN URL format: {0}")]
    InvalidUrl(String),

    #[error("CDN request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("CDN returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected CDN response: {0}")]
    Decode(String),
}

impl CdnError {
    /// Failures worth retrying: network trouble, throttling and server errors
    pub fn is_transient(&self) -> bool {
        match self {
            CdnError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CdnError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    Deleted,
    /// Already gone remotely; counts as success
    NotFound,
    Other(String),
}

#[async_trait]
pub trait ImageCdn: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<UploadedAsset, CdnError>;

    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, CdnError>;

    fn is_configured(&self) -> bool;

    fn cloud_name(&self) -> &str;

    /// Delivery URL with size limits and automatic quality/format
    fn optimized_url(&self, public_id: &str, width: Option<u32>, height: Option<u32>) -> String;
}
