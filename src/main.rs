use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use gallery_api::{
    cdn::{CloudinaryClient, ImageCdn},
    config::{self, DatabaseConfig},
    database::{DatabaseManager, ImageStore, MemoryImageStore, PgImageStore},
    is_production, router, AppState,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, CLOUDINARY_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    info!("Starting Gallery API in {:?} mode", config.environment);

    if is_production!() && config.uses_default_jwt_secret() {
        warn!("JWT_SECRET_KEY is not set; tokens are signed with the built-in default secret");
    }
    if config.security.admin_password_hash.is_empty() {
        warn!("ADMIN_PASSWORD_HASH is not set; CMS login will fail");
    }

    let store = open_store(&config.database).await?;

    let cdn: Arc<dyn ImageCdn> = Arc::new(CloudinaryClient::new(config.cdn.clone())?);
    if !cdn.is_configured() {
        warn!(
            "Cloudinary not configured (missing {:?}); uploads will fail",
            config.cdn.missing_credentials()
        );
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState::new(store, cdn, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Gallery API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Postgres when DATABASE_URL is set, otherwise the in-memory store
async fn open_store(database: &DatabaseConfig) -> anyhow::Result<Arc<dyn ImageStore>> {
    if database.url.is_empty() {
        warn!("DATABASE_URL not set; using in-memory store, images will not survive a restart");
        return Ok(Arc::new(MemoryImageStore::new()));
    }

    let pool = DatabaseManager::connect(database)
        .await
        .context("database connection failed")?;
    info!("Connected to Postgres");
    Ok(Arc::new(PgImageStore::new(pool)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
