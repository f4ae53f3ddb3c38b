// app.rs - Shared state and route table
//
// Public routes need no credentials. Everything under /api/cms except login
// sits behind `cms_auth_middleware`.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::cdn::ImageCdn;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::ImageStore;
use crate::handlers::{cms, public};
use crate::middleware::{auth::PASSWORD_HEADER, cms_auth_middleware, RateLimiter};

/// Dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ImageStore>,
    pub cdn: Arc<dyn ImageCdn>,
    pub config: Arc<AppConfig>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(store: Arc<dyn ImageStore>, cdn: Arc<dyn ImageCdn>, config: AppConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.api));
        Self {
            store,
            cdn,
            config: Arc::new(config),
            limiter,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);
    let body_limit = state.config.api.max_request_size_bytes;

    Router::new()
        .merge(public_routes())
        .merge(cms_public_routes())
        .merge(cms_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/health/db", get(public::health_db))
        .route("/health/cdn", get(public::health_cdn))
        .route("/api/gallery-images", get(public::gallery_images))
}

fn cms_public_routes() -> Router<AppState> {
    Router::new().route("/api/cms/login", post(cms::login))
}

fn cms_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Session
        .route("/api/cms/logout", post(cms::logout))
        .route("/api/cms/session", get(cms::session))
        // Collection
        .route(
            "/api/cms/gallery-images",
            get(cms::list_images).post(cms::upload_images),
        )
        .route("/api/cms/gallery-images/reorder", put(cms::reorder_images))
        .route("/api/cms/gallery-images/bulk", delete(cms::bulk_delete_images))
        // Single image
        .route(
            "/api/cms/gallery-images/:id",
            put(cms::update_image).delete(cms::delete_image),
        )
        .route_layer(from_fn_with_state(state, cms_auth_middleware))
}

/// `*` means any origin without credentials; otherwise the listed origins with credentials
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(PASSWORD_HEADER),
        ])
}
