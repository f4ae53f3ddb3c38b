use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - service banner
pub async fn root(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": state.config.api.title,
        "description": state.config.api.description,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
        "endpoints": {
            "gallery": "/api/gallery-images (public)",
            "health": "/health, /health/db, /health/cdn (public)",
            "cms": "/api/cms/* (password or token)"
        }
    }))
}

/// GET /health - liveness only
pub async fn health() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
    }))
}

/// GET /health/db - store connectivity, 503 when unreachable
pub async fn health_db(State(state): State<AppState>) -> ApiResult<Value> {
    let backend = state.store.backend();

    if let Err(e) = state.store.ping().await {
        tracing::error!("Database health check failed ({}): {}", backend, e);
        return Err(ApiError::service_unavailable(format!(
            "Database unavailable ({} backend)",
            backend
        )));
    }

    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "database": "connected",
        "backend": backend,
    })))
}

/// GET /health/cdn - whether CDN credentials are present
pub async fn health_cdn(State(state): State<AppState>) -> ApiResponse<Value> {
    if state.cdn.is_configured() {
        ApiResponse::success(json!({
            "status": "healthy",
            "cdn": "configured",
            "cloud_name": state.cdn.cloud_name(),
        }))
    } else {
        ApiResponse::success(json!({
            "status": "warning",
            "cdn": "not_configured",
            "message": "Cloudinary credentials are missing; uploads will fail",
        }))
    }
}
