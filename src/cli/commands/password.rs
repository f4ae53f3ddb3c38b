use anyhow::bail;
use serde_json::json;

use crate::auth;
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

pub fn hash(password: &str, cost: u32, output_format: OutputFormat) -> anyhow::Result<()> {
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let hash = auth::hash_password(password, cost)?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Password hash generated",
            Some(json!({ "hash": hash, "cost": cost })),
        ),
        OutputFormat::Text => {
            println!("Add this line to your .env file:\n");
            println!("ADMIN_PASSWORD_HASH={}", hash);
            Ok(())
        }
    }
}

pub fn verify(password: &str, hash: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let Some(hash) = hash.filter(|h| !h.is_empty()) else {
        bail!("No hash given: pass --hash or set ADMIN_PASSWORD_HASH");
    };

    if auth::verify_password(password, hash) {
        output_success(&output_format, "Password matches hash", Some(json!({ "valid": true })))
    } else {
        output_error(&output_format, "Password does not match hash", Some("PASSWORD_MISMATCH"))?;
        bail!("Password verification failed")
    }
}
