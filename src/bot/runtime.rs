//! Bot runtime - webhook server plus keep-alive loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::dispatcher::{AppState, Router};
use super::webhook;

const SELF_PING_INTERVAL: Duration = Duration::from_secs(300);

/// Run the bot until shutdown.
pub async fn run(state: AppState, router: Router) -> anyhow::Result<()> {
    if let Some(url) = state.config.self_ping_url.clone() {
        info!(%url, "starting self-ping loop");
        tokio::spawn(self_ping_loop(url));
    }

    let port = state.config.webhook_port;
    webhook::serve(state, Arc::new(router), port).await
}

/// Periodically GET the configured URL so free-tier hosts keep the
/// process alive. Failures are logged and the loop keeps going.
async fn self_ping_loop(url: String) {
    let client = reqwest::Client::new();
    let mut interval = tokio::time::interval(SELF_PING_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = client.get(&url).send().await {
            warn!(error = %e, "self-ping failed");
        }
    }
}
