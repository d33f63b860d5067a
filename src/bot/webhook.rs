//! Inbound webhook server.
//!
//! One JSON object per call, one platform update each. The endpoint
//! acknowledges with 200 as soon as dispatch is enqueued - including for
//! undecodable payloads - so the platform never amplifies a local
//! failure into a redelivery storm. Processing itself runs in detached
//! tasks behind an admission semaphore that bounds concurrent
//! store/network pressure.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::dispatcher::{AppState, Router};
use super::update;

/// Upper bound on concurrently in-flight updates.
const MAX_IN_FLIGHT: usize = 64;

/// Header the platform echoes the configured secret token in.
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
struct ServerContext {
    state: AppState,
    router: Arc<Router>,
    permits: Arc<Semaphore>,
    secret: Option<String>,
}

/// Serve the webhook and health endpoints until shutdown.
pub async fn serve(state: AppState, router: Arc<Router>, port: u16) -> anyhow::Result<()> {
    let secret = state.config.webhook_secret.clone();
    let ctx = ServerContext {
        state,
        router,
        permits: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        secret,
    };

    let app = axum::Router::new()
        .route("/webhook", post(receive_update))
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .with_state(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "webhook server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    } else {
        info!("shutdown signal received");
    }
}

async fn receive_update(
    State(ctx): State<ServerContext>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &ctx.secret {
        let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(secret.as_str()) {
            warn!("webhook call with missing or wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    // Decode failures are logged and acknowledged; they must not cause
    // the platform to redeliver.
    let update = match update::decode_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "dropping undecodable update");
            return StatusCode::OK;
        }
    };

    match ctx.permits.clone().try_acquire_owned() {
        Ok(permit) => {
            let state = ctx.state.clone();
            let router = ctx.router.clone();
            tokio::spawn(async move {
                router.dispatch(state, update).await;
                drop(permit);
            });
        }
        Err(_) => {
            warn!(
                user_id = update.user_id(),
                "admission limit reached, dropping update"
            );
        }
    }

    StatusCode::OK
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stats(State(ctx): State<ServerContext>) -> Response {
    match ctx.state.store.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            warn!(error = %e, "stats query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
