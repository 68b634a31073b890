use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingo_exchange::api::{self, AppState};
use lingo_exchange::config::Config;
use lingo_exchange::db::init_database;
use lingo_exchange::identity::Auth0Client;
use lingo_exchange::services::MyMemoryTranslator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,lingo_exchange=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::init()?;
    info!("Initialized configuration");

    // Managed database is optional; handlers report it missing per request
    let database = init_database(config.database.as_ref())?;
    if database.is_some() {
        info!("Supabase client ready");
    }

    let state = AppState {
        identity: Arc::new(Auth0Client::new(config.identity.clone())),
        translator: Arc::new(MyMemoryTranslator::new(&config.translation.api_url)),
        database,
        config: Arc::new(config),
    };

    // Handle shutdown signals
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, initiating graceful shutdown"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    };

    api::start_api_server(state, shutdown).await?;

    info!("lingo-exchange shutdown complete");
    Ok(())
}
