//! Gatestore - safety gate storefront

use anyhow::Result;
use gatestore::api::{router, AppState};
use gatestore::catalog::{CachedCatalog, PgCatalog};
use gatestore::config::AppConfig;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let db = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match config.nats_url.as_deref() {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, order events will not be published"); None }
        },
        None => None,
    };

    let catalog = CachedCatalog::new(PgCatalog::new(db.clone()), config.cache.clone());
    tracing::info!(ttl_secs = config.cache.ttl.as_secs(), policy = ?config.cache.invalidation, "catalog cache configured");
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin routes are disabled");
    }

    let port = config.port;
    let state = AppState { db, catalog: Arc::new(catalog), nats, config: Arc::new(config) };
    let app = router(state);

    tracing::info!("Gatestore listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
