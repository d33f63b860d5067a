//! Serialcast - Upload Sequencer Bot
//!
//! Forwards each user's video uploads to their target channel with an
//! auto-advancing season/episode caption and a rotating quality label.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `storage` - Session persistence (MongoDB, JSON-file fallback)
//! - `transport` - Outbound Telegram client behind a trait
//! - `sequence` - Rate limiter, batch coalescer, per-user sequencer
//! - `bot` - Decoder, dispatcher, webhook server
//! - `plugins` - Command/button/upload handlers (extensible)
//! - `utils` - Utility functions

mod bot;
mod config;
mod plugins;
mod sequence;
mod storage;
mod transport;
mod utils;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::{AppState, Router};
use config::Config;
use storage::{FileStore, MongoStore, SessionStore};
use transport::TelegramTransport;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // Initialize logging with sensible defaults
    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("serialcast=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting serialcast...");

    let config = Arc::new(Config::from_env());
    info!("Configuration loaded successfully");

    let store = init_store(&config).await;

    let transport = Arc::new(TelegramTransport::new(&config.bot_token));
    if let Some(raw_url) = &config.webhook_url {
        let url = url::Url::parse(raw_url).expect("Invalid WEBHOOK_URL format");
        transport
            .register_webhook(&url, config.webhook_secret.as_deref())
            .await?;
        info!("Webhook registered");
    } else {
        warn!("WEBHOOK_URL not set; skipping webhook registration");
    }

    if config.admin_ids.is_empty() {
        info!("No admin IDs configured (ADMIN_IDS is empty)");
    } else {
        info!("Bot admins: {:?}", config.admin_ids);
    }

    let state = AppState::new(config, store, transport);

    let mut router = Router::new();
    plugins::register_all(&mut router);

    bot::run(state, router).await
}

/// Pick the storage backend: MongoDB when configured and reachable,
/// otherwise the JSON-file fallback with the same contract.
async fn init_store(config: &Config) -> Arc<dyn SessionStore> {
    if let Some(uri) = &config.mongodb_uri {
        match MongoStore::connect(uri, &config.mongodb_database).await {
            Ok(store) => {
                info!("Using MongoDB session store");
                return Arc::new(store);
            }
            Err(e) => {
                warn!(error = %e, "MongoDB unavailable, falling back to file store");
            }
        }
    } else {
        info!("MONGODB_URI not set; using file store");
    }
    Arc::new(FileStore::load(config.data_file.clone()))
}
