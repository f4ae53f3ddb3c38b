use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

pub const ADMIN_SUBJECT: &str = "cms_admin";
pub const ADMIN_ROLE: &str = "admin";
const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn admin(expiry_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: ADMIN_SUBJECT.to_string(),
            role: ADMIN_ROLE.to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            exp: (now + Duration::minutes(expiry_minutes)).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("ADMIN_PASSWORD_HASH not configured")]
    NotConfigured,

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Token expired")]
    Expired,

    #[error("Token is not an access token")]
    WrongTokenType,

    #[error("Authentication token is invalid: {0}")]
    InvalidToken(String),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// Hash a password with bcrypt at the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Compare a password against a bcrypt hash; a malformed hash never matches
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Check the CMS admin password against the configured hash
pub fn verify_admin_password(password: &str, security: &SecurityConfig) -> Result<bool, AuthError> {
    if security.admin_password_hash.is_empty() {
        return Err(AuthError::NotConfigured);
    }
    Ok(verify_password(password, &security.admin_password_hash))
}

/// Issue an admin access token; returns the token and its lifetime in seconds
pub fn generate_jwt(security: &SecurityConfig) -> Result<(String, i64), AuthError> {
    let claims = Claims::admin(security.jwt_expiry_minutes);
    let token = encode_claims(&claims, security)?;
    Ok((token, security.jwt_expiry_minutes * 60))
}

pub fn encode_claims(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate signature, expiry and token type
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?
        .claims;

    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(AuthError::WrongTokenType);
    }

    Ok(claims)
}
