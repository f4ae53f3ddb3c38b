use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{info, warn};
use uuid::Uuid;

use super::{CdnError, DestroyOutcome, ImageCdn, RetryPolicy, UploadedAsset};
use crate::config::CdnConfig;

/// Signed Cloudinary upload/destroy client
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CdnConfig,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: CdnConfig) -> Result<Self, CdnError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let retry = RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        );
        Ok(Self { http, config, retry })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    fn ensure_configured(&self) -> Result<(), CdnError> {
        let missing = self.config.missing_credentials();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CdnError::NotConfigured(missing))
        }
    }

    /// Incoming transformation applied at upload time: cap dimensions, keep aspect ratio
    fn upload_transformation(&self) -> String {
        format!(
            "c_limit,h_{},w_{}",
            self.config.upload_max_height, self.config.upload_max_width
        )
    }

    /// Add timestamp, api_key and signature to a parameter set
    fn signed(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);
        params.insert("signature", signature);
        params.insert("api_key", self.config.api_key.clone());
        params
    }

    async fn upload_once(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        public_id: &str,
    ) -> Result<UploadedAsset, CdnError> {
        let mut params = BTreeMap::new();
        params.insert("folder", self.config.folder.clone());
        params.insert("public_id", public_id.to_string());
        params.insert("transformation", self.upload_transformation());

        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        for (key, value) in self.signed(params) {
            form = form.text(key, value);
        }

        let response = self.http.post(self.endpoint("upload")).multipart(form).send().await?;
        let body: UploadResponse = decode(response).await?;

        Ok(UploadedAsset {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy_once(&self, public_id: &str) -> Result<DestroyOutcome, CdnError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("invalidate", "true".to_string());

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&self.signed(params))
            .send()
            .await?;
        let body: DestroyResponse = decode(response).await?;

        Ok(match body.result.as_str() {
            "ok" => DestroyOutcome::Deleted,
            "not found" => DestroyOutcome::NotFound,
            other => DestroyOutcome::Other(other.to_string()),
        })
    }
}

#[async_trait]
impl ImageCdn for CloudinaryClient {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<UploadedAsset, CdnError> {
        self.ensure_configured()?;
        let public_id = Uuid::new_v4().simple().to_string();

        let asset = self
            .retry
            .run("Cloudinary upload", || self.upload_once(bytes.clone(), filename, &public_id))
            .await?;

        info!("Uploaded image {} as {}", filename, asset.public_id);
        Ok(asset)
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, CdnError> {
        self.ensure_configured()?;

        let outcome = self
            .retry
            .run("Cloudinary destroy", || self.destroy_once(public_id))
            .await?;

        match &outcome {
            DestroyOutcome::Deleted | DestroyOutcome::NotFound => {
                info!("Deleted image from Cloudinary: {} ({:?})", public_id, outcome)
            }
            DestroyOutcome::Other(result) => {
                warn!("Unexpected Cloudinary destroy result for {}: {}", public_id, result)
            }
        }
        Ok(outcome)
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn cloud_name(&self) -> &str {
        &self.config.cloud_name
    }

    fn optimized_url(&self, public_id: &str, width: Option<u32>, height: Option<u32>) -> String {
        delivery_url(&self.config, public_id, width, height)
    }
}

/// Build a delivery URL: optional `c_limit` resize, then automatic quality and format
pub fn delivery_url(config: &CdnConfig, public_id: &str, width: Option<u32>, height: Option<u32>) -> String {
    let mut segments = Vec::new();

    if width.is_some() || height.is_some() {
        let mut resize = vec!["c_limit".to_string()];
        if let Some(w) = width {
            resize.push(format!("w_{}", w));
        }
        if let Some(h) = height {
            resize.push(format!("h_{}", h));
        }
        segments.push(resize.join(","));
    }
    segments.push("q_auto,f_auto".to_string());

    format!(
        "{}/{}/image/upload/{}/{}",
        config.delivery_base_url.trim_end_matches('/'),
        config.cloud_name,
        segments.join("/"),
        public_id
    )
}

/// Cloudinary request signature: sorted `k=v` pairs joined by `&`, secret appended, SHA-1 hex.
pub fn sign(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    const UNSIGNED: &[&str] = &["file", "api_key", "resource_type", "cloud_name", "signature"];

    let to_sign = params
        .iter()
        .filter(|(key, value)| !UNSIGNED.contains(key) && !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

async fn decode<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, CdnError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| text.chars().take(200).collect());
        return Err(CdnError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| CdnError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CdnConfig {
        CdnConfig {
            cloud_name: "demo".into(),
            api_key: "1234".into(),
            api_secret: "abcd".into(),
            ..CdnConfig::default()
        }
    }

    #[test]
    fn signature_matches_reference_vector() {
        // Reference example from the Cloudinary signing documentation
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());
        assert_eq!(
            sign(&params, "abcd"),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn signature_ignores_unsigned_params() {
        let mut with_key = BTreeMap::new();
        with_key.insert("timestamp", "1".to_string());
        with_key.insert("api_key", "1234".to_string());

        let mut without_key = BTreeMap::new();
        without_key.insert("timestamp", "1".to_string());

        assert_eq!(sign(&with_key, "s"), sign(&without_key, "s"));
    }

    #[test]
    fn delivery_url_with_and_without_resize() {
        let cfg = config();
        assert_eq!(
            delivery_url(&cfg, "gallery/cat", None, None),
            "https://res.cloudinary.com/demo/image/upload/q_auto,f_auto/gallery/cat"
        );
        assert_eq!(
            delivery_url(&cfg, "gallery/cat", Some(800), None),
            "https://res.cloudinary.com/demo/image/upload/c_limit,w_800/q_auto,f_auto/gallery/cat"
        );
        assert_eq!(
            delivery_url(&cfg, "gallery/cat", Some(800), Some(600)),
            "https://res.cloudinary.com/demo/image/upload/c_limit,w_800,h_600/q_auto,f_auto/gallery/cat"
        );
    }

    #[test]
    fn endpoint_uses_cloud_name() {
        let client = CloudinaryClient::new(config()).unwrap();
        assert_eq!(
            client.endpoint("destroy"),
            "https://api.cloudinary.com/v1_1/demo/image/destroy"
        );
        assert_eq!(client.upload_transformation(), "c_limit,h_1080,w_1920");
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_to_upload() {
        let client = CloudinaryClient::new(CdnConfig::default()).unwrap();
        assert!(!client.is_configured());
        let err = client.upload(vec![1, 2, 3], "a.png").await.unwrap_err();
        assert!(matches!(err, CdnError::NotConfigured(ref missing) if missing.len() == 3));
    }
}
