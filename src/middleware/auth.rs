use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};

use crate::app::AppState;
use crate::auth::{self, Claims, ADMIN_ROLE};
use crate::config::SecurityConfig;
use crate::error::ApiError;

pub const CMS_COOKIE: &str = "cms_token";
pub const PASSWORD_HEADER: &str = "x-cms-password";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Cookie,
    Bearer,
    Password,
}

/// Authenticated CMS admin, injected into request extensions
#[derive(Clone, Debug)]
pub struct AuthAdmin {
    pub role: String,
    pub method: AuthMethod,
    /// Token expiry; `None` for password-header requests
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthAdmin {
    fn from_claims(claims: Claims, method: AuthMethod) -> Self {
        Self {
            expires_at: claims.expires_at(),
            role: claims.role,
            method,
        }
    }
}

/// Guard for every CMS route except login
pub async fn cms_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let admin = authenticate(request.headers(), &state.config.security)?;
    tracing::debug!("CMS request authenticated via {:?}", admin.method);

    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

/// Resolve credentials in order: session cookie, bearer token, password header
pub fn authenticate(headers: &HeaderMap, security: &SecurityConfig) -> Result<AuthAdmin, ApiError> {
    if let Some(token) = cookie_value(headers, CMS_COOKIE) {
        let claims = auth::validate_jwt(&token, security)?;
        return Ok(AuthAdmin::from_claims(claims, AuthMethod::Cookie));
    }

    if let Some(token) = extract_bearer_token(headers)? {
        let claims = auth::validate_jwt(&token, security)?;
        return Ok(AuthAdmin::from_claims(claims, AuthMethod::Bearer));
    }

    if let Some(password) = headers.get(PASSWORD_HEADER) {
        let password = password
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid password header"))?;
        if !auth::verify_admin_password(password, security)? {
            tracing::warn!("CMS request rejected: invalid password header");
            return Err(ApiError::unauthorized("Invalid password"));
        }
        return Ok(AuthAdmin {
            role: ADMIN_ROLE.to_string(),
            method: AuthMethod::Password,
            expires_at: None,
        });
    }

    Err(ApiError::unauthorized("Authentication required"))
}

/// Bearer token from the Authorization header, if one was sent
fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        Some(_) => Err(ApiError::unauthorized("Empty JWT token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a fresh session token
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        CMS_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security() -> SecurityConfig {
        let mut security = AppConfig::development().security;
        security.jwt_secret = "middleware-secret".into();
        security.admin_password_hash = auth::hash_password("letmein", 4).unwrap();
        security
    }

    fn headers(pairs: &[(&'static str, String)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = authenticate(&HeaderMap::new(), &security()).unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "Authentication required");
    }

    #[test]
    fn cookie_wins_over_other_sources() {
        let security = security();
        let (token, _) = auth::generate_jwt(&security).unwrap();
        let admin = authenticate(
            &headers(&[
                ("cookie", format!("theme=dark; {}={}", CMS_COOKIE, token)),
                ("x-cms-password", "wrong".into()),
            ]),
            &security,
        )
        .unwrap();
        assert_eq!(admin.method, AuthMethod::Cookie);
        assert!(admin.expires_at.is_some());
    }

    #[test]
    fn bearer_token_is_accepted() {
        let security = security();
        let (token, _) = auth::generate_jwt(&security).unwrap();
        let admin = authenticate(
            &headers(&[("authorization", format!("Bearer {}", token))]),
            &security,
        )
        .unwrap();
        assert_eq!(admin.method, AuthMethod::Bearer);
        assert_eq!(admin.role, ADMIN_ROLE);
    }

    #[test]
    fn non_bearer_authorization_is_rejected() {
        let err = authenticate(&headers(&[("authorization", "Basic abc".into())]), &security())
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn password_header_is_checked() {
        let security = security();
        let admin = authenticate(&headers(&[("x-cms-password", "letmein".into())]), &security).unwrap();
        assert_eq!(admin.method, AuthMethod::Password);
        assert!(admin.expires_at.is_none());

        let err = authenticate(&headers(&[("x-cms-password", "nope".into())]), &security).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn password_header_without_configured_hash_is_server_error() {
        let mut security = security();
        security.admin_password_hash.clear();
        let err = authenticate(&headers(&[("x-cms-password", "letmein".into())]), &security).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn cookie_helpers() {
        assert_eq!(
            session_cookie("abc", 3600, true),
            "cms_token=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600; Secure"
        );
        assert_eq!(
            clear_session_cookie(false),
            "cms_token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
        );
    }
}
