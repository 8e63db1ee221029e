mod api;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod routes;
mod services;

use anyhow::Result;
use std::sync::Arc;

use services::{
    CampaignRepository, InMemoryCampaignRepository, KeyValueStore, MemoryStore,
    PgCampaignRepository, RedisStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting NRP backend"
    );

    // Estimates and training progress
    let store: Arc<dyn KeyValueStore> = match &settings.redis_url {
        Some(url) => Arc::new(RedisStore::new(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set - estimates and progress are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    // Campaigns
    let pool = match &settings.database_url {
        Some(url) => Some(db::create_pool(&settings, url).await?),
        None => None,
    };
    let campaigns: Arc<dyn CampaignRepository> = match &pool {
        Some(pool) => Arc::new(PgCampaignRepository::new(pool.clone())),
        None => {
            tracing::warn!("DATABASE_URL not set - serving built-in campaign fixtures");
            Arc::new(InMemoryCampaignRepository::seeded())
        }
    };

    // Create application state
    let state = app::AppState::new(settings.clone(), store, campaigns, pool);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
