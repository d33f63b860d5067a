//! Configuration module.
//!
//! Loads configuration from environment variables.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,

    /// Public webhook URL registered with the platform.
    /// Optional - when unset, updates are expected to reach the local
    /// endpoint by other means (tests, a tunnel).
    pub webhook_url: Option<String>,
    pub webhook_port: u16,

    /// Shared secret echoed by the platform in a request header.
    pub webhook_secret: Option<String>,

    // Storage
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    /// Fallback JSON store path, used when no database is reachable.
    pub data_file: PathBuf,

    /// Admin user IDs (comma-separated). Admins can configure the
    /// welcome media and always bypass the upload cooldown.
    pub admin_ids: Vec<i64>,

    /// Additional user IDs exempt from the upload cooldown.
    pub exempt_ids: HashSet<i64>,

    /// Minimum seconds between a non-exempt user's successful uploads.
    pub cooldown_secs: u64,

    /// URL pinged every five minutes to keep the host awake.
    pub self_ping_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let admin_ids = parse_ids(&env::var("ADMIN_IDS").unwrap_or_default());
        let mut exempt_ids: HashSet<i64> = parse_ids(&env::var("EXEMPT_IDS").unwrap_or_default())
            .into_iter()
            .collect();
        // Admins are implicitly exempt.
        exempt_ids.extend(admin_ids.iter().copied());

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            webhook_url: env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            webhook_port: env::var("WEBHOOK_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            mongodb_uri: env::var("MONGODB_URI").ok().filter(|s| !s.is_empty()),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "serialcast".to_string()),
            data_file: env::var("DATA_FILE")
                .unwrap_or_else(|_| "data.json".to_string())
                .into(),
            admin_ids,
            exempt_ids,
            cooldown_secs: env::var("UPLOAD_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            self_ping_url: env::var("SELF_PING_URL").ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Whether `user_id` bypasses the upload cooldown.
    pub fn is_exempt(&self, user_id: i64) -> bool {
        self.exempt_ids.contains(&user_id)
    }
}

fn parse_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect()
}
