use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use dashmap::DashMap;
use tracing::warn;

use crate::config::{ApiConfig, RateLimit};
use crate::error::ApiError;

/// Expired windows are swept once the map grows past this many entries
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Login,
    Upload,
    Delete,
}

impl Bucket {
    fn label(self) -> &'static str {
        match self {
            Bucket::Login => "login",
            Bucket::Upload => "upload",
            Bucket::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter per client and bucket
pub struct RateLimiter {
    enabled: bool,
    login: RateLimit,
    upload: RateLimit,
    delete: RateLimit,
    windows: DashMap<(Bucket, String), Window>,
}

impl RateLimiter {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            enabled: api.enable_rate_limiting,
            login: api.login_rate_limit,
            upload: api.upload_rate_limit,
            delete: api.delete_rate_limit,
            windows: DashMap::new(),
        }
    }

    fn limit_for(&self, bucket: Bucket) -> &RateLimit {
        match bucket {
            Bucket::Login => &self.login,
            Bucket::Upload => &self.upload,
            Bucket::Delete => &self.delete,
        }
    }

    /// Count one request; `Err` carries the seconds until the window reopens
    pub fn hit(&self, bucket: Bucket, client: &str) -> Result<(), u64> {
        if !self.enabled {
            return Ok(());
        }

        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep();
        }

        let limit = self.limit_for(bucket);
        let window = Duration::from_secs(limit.window_secs);
        let now = Instant::now();

        let mut entry = self
            .windows
            .entry((bucket, client.to_string()))
            .or_insert(Window { started: now, count: 0 });

        if now.duration_since(entry.started) >= window {
            *entry = Window { started: now, count: 0 };
        }

        if entry.count >= limit.requests {
            let remaining = window.saturating_sub(now.duration_since(entry.started));
            return Err(remaining.as_secs().max(1));
        }

        entry.count += 1;
        Ok(())
    }

    /// Like `hit`, mapped to a 429 response
    pub fn check(&self, bucket: Bucket, client: &ClientAddr) -> Result<(), ApiError> {
        self.hit(bucket, &client.0).map_err(|retry_after| {
            warn!("Rate limit exceeded for {} on {} bucket", client.0, bucket.label());
            let limit = self.limit_for(bucket);
            ApiError::too_many_requests(
                format!(
                    "Rate limit exceeded: {} {} requests per {} seconds",
                    limit.requests,
                    bucket.label(),
                    limit.window_secs
                ),
                retry_after,
            )
        })
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.windows.retain(|(bucket, _), window| {
            let length = Duration::from_secs(self.limit_for(*bucket).window_secs);
            now.duration_since(window.started) < length
        });
    }
}

/// Client identity used for rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

/// First `X-Forwarded-For` hop when behind a proxy, otherwise the peer address.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientAddr(client_id(&parts.headers, peer)))
    }
}
