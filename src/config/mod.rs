use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub cdn: CdnConfig,
    pub imaging: ImagingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Empty means "no database": the API falls back to the in-memory store.
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
    pub application_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub title: String,
    pub description: String,
    pub default_page_limit: i64,
    pub max_page_limit: i64,
    pub enable_rate_limiting: bool,
    pub login_rate_limit: RateLimit,
    pub upload_rate_limit: RateLimit,
    pub delete_rate_limit: RateLimit,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// `*` alone means any origin, without credentials.
    pub cors_origins: Vec<String>,
    /// bcrypt hash of the CMS admin password
    pub admin_password_hash: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base_url: String,
    pub delivery_base_url: String,
    pub folder: String,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub upload_max_width: u32,
    pub upload_max_height: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingConfig {
    pub convert_to_webp: bool,
    pub skip_if_webp: bool,
    pub max_dimension: Option<u32>,
}

const DEFAULT_JWT_SECRET: &str = "change-this-in-production-use-openssl-rand-hex-32";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("GALLERY_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v.trim().to_string();
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("API_TITLE") {
            self.api.title = v;
        }
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("ADMIN_PASSWORD_HASH") {
            self.security.admin_password_hash = v.trim().to_string();
        }
        if let Ok(v) = env::var("JWT_SECRET_KEY") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_MINUTES") {
            self.security.jwt_expiry_minutes = v.parse().unwrap_or(self.security.jwt_expiry_minutes);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }

        // CDN overrides
        if let Ok(v) = env::var("CLOUDINARY_CLOUD_NAME") {
            self.cdn.cloud_name = v.trim().to_string();
        }
        if let Ok(v) = env::var("CLOUDINARY_API_KEY") {
            self.cdn.api_key = v.trim().to_string();
        }
        if let Ok(v) = env::var("CLOUDINARY_API_SECRET") {
            self.cdn.api_secret = v.trim().to_string();
        }
        if let Ok(v) = env::var("CLOUDINARY_FOLDER") {
            self.cdn.folder = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_MAX_RETRIES") {
            self.cdn.max_retries = v.parse().unwrap_or(self.cdn.max_retries);
        }

        // Imaging overrides
        if let Ok(v) = env::var("IMAGING_CONVERT_TO_WEBP") {
            self.imaging.convert_to_webp = v.parse().unwrap_or(self.imaging.convert_to_webp);
        }
        if let Ok(v) = env::var("IMAGING_MAX_DIMENSION") {
            self.imaging.max_dimension = v.parse().ok().filter(|d| *d > 0);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
                application_name: "gallery-api".to_string(),
            },
            api: ApiConfig {
                title: "Gallery API".to_string(),
                description: "Backend API for the portfolio gallery and its CMS".to_string(),
                default_page_limit: 12,
                max_page_limit: 100,
                enable_rate_limiting: false,
                login_rate_limit: RateLimit { requests: 5, window_secs: 60 },
                upload_rate_limit: RateLimit { requests: 20, window_secs: 3600 },
                delete_rate_limit: RateLimit { requests: 30, window_secs: 3600 },
                max_request_size_bytes: 50 * 1024 * 1024, // 50MB
            },
            security: SecurityConfig {
                cors_origins: vec!["*".to_string()],
                admin_password_hash: String::new(),
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_minutes: 60,
                cookie_secure: false,
            },
            cdn: CdnConfig::default(),
            imaging: ImagingConfig {
                convert_to_webp: true,
                skip_if_webp: true,
                max_dimension: Some(3840),
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.enable_rate_limiting = true;
        config.api.max_request_size_bytes = 30 * 1024 * 1024;
        config.security.cookie_secure = true;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.database.max_connections = 30;
        config.database.connection_timeout = 5;
        config.security.cors_origins = vec![];
        config
    }

    /// Whether the JWT secret is still the built-in placeholder
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.security.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            api_base_url: "https://api.cloudinary.com".to_string(),
            delivery_base_url: "https://res.cloudinary.com".to_string(),
            folder: "gallery".to_string(),
            max_retries: 3,
            retry_base_delay_ms: 1000,
            upload_max_width: 1920,
            upload_max_height: 1080,
            request_timeout_secs: 60,
        }
    }
}

impl CdnConfig {
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Names of the credentials that are still empty
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.cloud_name.is_empty() {
            missing.push("CLOUDINARY_CLOUD_NAME");
        }
        if self.api_key.is_empty() {
            missing.push("CLOUDINARY_API_KEY");
        }
        if self.api_secret.is_empty() {
            missing.push("CLOUDINARY_API_SECRET");
        }
        missing
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
