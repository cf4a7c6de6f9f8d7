//! # souq-server
//!
//! HTTP host for the Souq bot core.
//!
//! This binary provides:
//! - **Event intake**: the chat transport POSTs each inbound message and
//!   sends the returned payloads back to the user
//! - **Push delivery** of broadcasts to the transport's webhook
//! - **Admin API** (bearer token) over the typed admin console
//! - **Per-user flood control** on inbound events

mod api;
mod config;
mod error;
mod rate_limit;
mod sink;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use souq_core::{Bot, RandomOracle};
use souq_shared::constants::APP_NAME;
use souq_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::FloodGuard;
use crate::sink::WebhookSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,souq_server=debug,souq_core=debug")),
        )
        .init();

    info!("Starting {} bot server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        http_addr = %config.http_addr,
        admins = config.bot.initial_admins.len(),
        admin_api = config.admin_token.is_some(),
        delivery = config.delivery_url.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open storage and build the bot
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database opened");
    }

    let sink = Arc::new(WebhookSink::new(config.delivery_url.clone())?);
    let bot = Bot::new(db, sink, Arc::new(RandomOracle), config.bot.clone());
    bot.bootstrap().await?;

    let flood_guard = FloodGuard::from_config(&config);
    let http_addr = config.http_addr;
    let state = AppState {
        bot: Arc::new(bot),
        flood_guard: flood_guard.clone(),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Background tasks
    // -----------------------------------------------------------------------

    // Forget idle flood allowances, sweeping twice per TTL
    tokio::spawn(async move {
        let period = (flood_guard.idle_ttl() / 2).max(std::time::Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let forgotten = flood_guard.forget_idle().await;
            if forgotten > 0 {
                tracing::debug!(forgotten, "Forgot idle flood allowances");
            }
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
