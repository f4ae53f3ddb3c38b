use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth;
use crate::error::ApiError;
use crate::middleware::{
    auth::{clear_session_cookie, session_cookie},
    ApiResponse, ApiResult, AuthAdmin, Bucket, ClientAddr,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub role: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// POST /api/cms/login - exchange the admin password for a session token
pub async fn login(
    State(state): State<AppState>,
    client: ClientAddr,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    state.limiter.check(Bucket::Login, &client)?;
    let Json(payload) = payload?;
    let security = &state.config.security;

    if !auth::verify_admin_password(&payload.password, security)? {
        warn!("Failed CMS login attempt from {}", client.0);
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let (access_token, expires_in) = auth::generate_jwt(security)?;
    info!("CMS login from {}", client.0);

    let cookie = session_cookie(&access_token, expires_in, security.cookie_secure);
    Ok(ApiResponse::success(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in,
    })
    .with_cookie(cookie))
}

/// POST /api/cms/logout - expire the session cookie
pub async fn logout(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "message": "Logged out successfully" }))
        .with_cookie(clear_session_cookie(state.config.security.cookie_secure))
}

/// GET /api/cms/session
pub async fn session(Extension(admin): Extension<AuthAdmin>) -> ApiResponse<SessionInfo> {
    ApiResponse::success(SessionInfo {
        authenticated: true,
        role: admin.role,
        expires_at: admin.expires_at,
    })
}
