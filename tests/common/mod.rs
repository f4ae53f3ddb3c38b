#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use gallery_api::{
    auth,
    cdn::{cloudinary::delivery_url, CdnError, DestroyOutcome, ImageCdn, UploadedAsset},
    config::{AppConfig, CdnConfig},
    database::{DatabaseError, GalleryImage, ImageStore, MemoryImageStore, NewGalleryImage},
    gallery::{Page, PageRequest},
    router, AppState,
};

pub const ADMIN_PASSWORD: &str = "gallery-test-password";
pub const CLOUD_NAME: &str = "test-cloud";

static PASSWORD_HASH: OnceLock<String> = OnceLock::new();

fn password_hash() -> String {
    PASSWORD_HASH
        .get_or_init(|| auth::hash_password(ADMIN_PASSWORD, 4).expect("bcrypt hash"))
        .clone()
}

/// Development preset with a known admin password and test JWT secret
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.url.clear();
    config.security.admin_password_hash = password_hash();
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.api.enable_rate_limiting = false;
    config.cdn = CdnConfig {
        cloud_name: CLOUD_NAME.to_string(),
        api_key: "key".to_string(),
        api_secret: "secret".to_string(),
        ..CdnConfig::default()
    };
    config
}

pub fn cdn_url(public_id: &str) -> String {
    format!("https://res.cloudinary.com/{}/image/upload/v1/{}.png", CLOUD_NAME, public_id)
}

#[derive(Default)]
struct FakeCdnState {
    uploaded: Vec<String>,
    destroyed: Vec<String>,
    failing_files: HashSet<String>,
    fail_destroy: bool,
}

/// In-process stand-in for Cloudinary
#[derive(Default)]
pub struct FakeCdn {
    state: Mutex<FakeCdnState>,
}

impl FakeCdn {
    pub fn fail_upload_of(&self, filename: &str) {
        self.state.lock().unwrap().failing_files.insert(filename.to_string());
    }

    pub fn fail_destroys(&self) {
        self.state.lock().unwrap().fail_destroy = true;
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.state.lock().unwrap().uploaded.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.state.lock().unwrap().destroyed.clone()
    }
}

#[async_trait]
impl ImageCdn for FakeCdn {
    async fn upload(&self, _bytes: Vec<u8>, filename: &str) -> Result<UploadedAsset, CdnError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_files.contains(filename) {
            return Err(CdnError::Api {
                status: 400,
                message: format!("Invalid image file {}", filename),
            });
        }

        let public_id = format!("gallery/upload-{}", state.uploaded.len() + 1);
        state.uploaded.push(public_id.clone());
        Ok(UploadedAsset {
            url: cdn_url(&public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, CdnError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_destroy {
            return Err(CdnError::Api {
                status: 500,
                message: "destroy failed".to_string(),
            });
        }
        state.destroyed.push(public_id.to_string());
        Ok(DestroyOutcome::Deleted)
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn cloud_name(&self) -> &str {
        CLOUD_NAME
    }

    fn optimized_url(&self, public_id: &str, width: Option<u32>, height: Option<u32>) -> String {
        let config = CdnConfig {
            cloud_name: CLOUD_NAME.to_string(),
            ..CdnConfig::default()
        };
        delivery_url(&config, public_id, width, height)
    }
}

/// Which store calls should fail with a database error
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreFailures {
    pub inserts: bool,
    pub ping: bool,
}

/// Memory store that can be told to fail inserts or health pings
pub struct FlakyStore {
    inner: Arc<MemoryImageStore>,
    failures: StoreFailures,
}

fn unavailable() -> DatabaseError {
    DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl ImageStore for FlakyStore {
    async fn page(&self, request: &PageRequest) -> Result<Page<GalleryImage>, DatabaseError> {
        self.inner.page(request).await
    }

    async fn list_all(&self) -> Result<Vec<GalleryImage>, DatabaseError> {
        self.inner.list_all().await
    }

    async fn get(&self, id: i64) -> Result<Option<GalleryImage>, DatabaseError> {
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<GalleryImage>, DatabaseError> {
        self.inner.get_many(ids).await
    }

    async fn insert_many(&self, images: &[NewGalleryImage]) -> Result<Vec<GalleryImage>, DatabaseError> {
        if self.failures.inserts {
            return Err(unavailable());
        }
        self.inner.insert_many(images).await
    }

    async fn update_caption(
        &self,
        id: i64,
        caption: Option<String>,
    ) -> Result<Option<GalleryImage>, DatabaseError> {
        self.inner.update_caption(id, caption).await
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<Vec<i64>, DatabaseError> {
        self.inner.delete_many(ids).await
    }

    async fn reorder(&self, ids: &[i64]) -> Result<usize, DatabaseError> {
        self.inner.reorder(ids).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.failures.ping {
            return Err(unavailable());
        }
        self.inner.ping().await
    }

    fn backend(&self) -> &'static str {
        self.inner.backend()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `data` field of the success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

pub struct TestApp {
    pub store: Arc<MemoryImageStore>,
    pub cdn: Arc<FakeCdn>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryImageStore::new());
        let cdn = Arc::new(FakeCdn::default());
        let state = AppState::new(store.clone(), cdn.clone(), config);
        Self {
            store,
            cdn,
            router: router(state),
        }
    }

    /// Router over a store that fails the selected calls; `store` still sees the real data
    pub fn with_store_failures(failures: StoreFailures) -> Self {
        let store = Arc::new(MemoryImageStore::new());
        let cdn = Arc::new(FakeCdn::default());
        let flaky = Arc::new(FlakyStore {
            inner: store.clone(),
            failures,
        });
        let state = AppState::new(flaky, cdn.clone(), test_config());
        Self {
            store,
            cdn,
            router: router(state),
        }
    }

    /// Insert `count` images directly into the store; returns them in display order
    pub async fn seed(&self, count: usize) -> Result<Vec<GalleryImage>> {
        let images: Vec<NewGalleryImage> = (1..=count)
            .map(|n| NewGalleryImage {
                image_url: cdn_url(&format!("gallery/seed-{}", n)),
                caption: Some(format!("Seed {}", n)),
            })
            .collect();
        Ok(self.store.insert_many(&images).await?)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Request::get(uri).body(Body::empty())?).await
    }

    /// Request authenticated with the admin password header
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-cms-password", ADMIN_PASSWORD);

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json)?)
            }
            None => Body::empty(),
        };
        self.send(builder.body(body)?).await
    }

    /// Log in and return the bearer token
    pub async fn login(&self) -> Result<String> {
        let response = self
            .send(json_request(
                Method::POST,
                "/api/cms/login",
                serde_json::json!({ "password": ADMIN_PASSWORD }),
            )?)
            .await?;
        anyhow::ensure!(response.status == StatusCode::OK, "login failed: {}", response.body);
        response.data()["access_token"]
            .as_str()
            .map(str::to_string)
            .context("access_token missing")
    }

    pub async fn upload(&self, files: &[(&str, &str, &str)], captions: &[&str]) -> Result<TestResponse> {
        let (content_type, body) = multipart_body(files, captions);
        let request = Request::post("/api/cms/gallery-images")
            .header("x-cms-password", ADMIN_PASSWORD)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))?;
        self.send(request).await
    }

    pub async fn ordered_ids(&self) -> Result<Vec<(i64, i32)>> {
        Ok(self
            .store
            .list_all()
            .await?
            .iter()
            .map(|image| (image.id, image.display_order))
            .collect())
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?)
}

const BOUNDARY: &str = "gallery-test-boundary";

/// Build a multipart/form-data body from `(filename, content_type, content)` files and caption fields
pub fn multipart_body(files: &[(&str, &str, &str)], captions: &[&str]) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for (filename, content_type, content) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    for caption in captions {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"captions\"\r\n\r\n");
        body.extend_from_slice(caption.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
