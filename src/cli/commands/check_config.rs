use serde::Serialize;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::{AppConfig, Environment};

#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub environment: String,
    pub database: &'static str,
    pub cdn_configured: bool,
    pub cdn_missing: Vec<&'static str>,
    pub admin_password_set: bool,
    pub default_jwt_secret: bool,
    pub cors_origins: Vec<String>,
    pub rate_limiting: bool,
    pub warnings: Vec<String>,
}

pub fn report(config: &AppConfig) -> ConfigReport {
    let mut warnings = Vec::new();
    let database = if config.database.url.is_empty() {
        warnings.push("DATABASE_URL not set: images are kept in memory only".to_string());
        "in-memory"
    } else {
        "postgres"
    };

    let cdn_missing = config.cdn.missing_credentials();
    if !cdn_missing.is_empty() {
        warnings.push(format!("Cloudinary not configured, missing {}", cdn_missing.join(", ")));
    }

    let admin_password_set = !config.security.admin_password_hash.is_empty();
    if !admin_password_set {
        warnings.push("ADMIN_PASSWORD_HASH not set: CMS login is disabled".to_string());
    }

    let default_jwt_secret = config.uses_default_jwt_secret();
    if default_jwt_secret && config.environment == Environment::Production {
        warnings.push("JWT_SECRET_KEY uses the built-in default".to_string());
    }

    ConfigReport {
        environment: format!("{:?}", config.environment),
        database,
        cdn_configured: cdn_missing.is_empty(),
        cdn_missing,
        admin_password_set,
        default_jwt_secret,
        cors_origins: config.security.cors_origins.clone(),
        rate_limiting: config.api.enable_rate_limiting,
        warnings,
    }
}

pub fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let report = report(config);

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Configuration checked",
            Some(json!({ "config": report })),
        ),
        OutputFormat::Text => {
            println!("Environment:      {}", report.environment);
            println!("Database:         {}", report.database);
            println!("Cloudinary:       {}", if report.cdn_configured { "configured" } else { "not configured" });
            println!("Admin password:   {}", if report.admin_password_set { "set" } else { "missing" });
            println!("JWT secret:       {}", if report.default_jwt_secret { "default" } else { "custom" });
            println!("CORS origins:     {}", report.cors_origins.join(", "));
            println!("Rate limiting:    {}", if report.rate_limiting { "on" } else { "off" });
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_development_config_reports_missing_pieces() {
        let mut config = AppConfig::development();
        config.database.url.clear();
        config.security.admin_password_hash.clear();
        config.cdn = Default::default();

        let report = report(&config);
        assert_eq!(report.database, "in-memory");
        assert!(!report.cdn_configured);
        assert_eq!(report.cdn_missing.len(), 3);
        assert!(!report.admin_password_set);
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn production_default_secret_is_flagged() {
        let report = report(&AppConfig::production());
        assert!(report.default_jwt_secret);
        assert!(report.rate_limiting);
        assert!(report.warnings.iter().any(|w| w.contains("JWT_SECRET_KEY")));
    }
}
