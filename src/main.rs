//! Bet Ledger - games, bets and per-user ledgers over HTTP
//! Mission: Never lose a bet, never let a running total drift

use anyhow::{Context, Result};
use betledger_backend::{
    api::{create_router, AppState},
    config::{load_env, Config},
};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let config = Config::parse();
    info!("🚀 Bet ledger starting ({:?} storage)", config.storage);

    let (games, ledgers) = config.open_storage()?;
    if config.admin_token.is_none() {
        warn!("⚠️  ADMIN_TOKEN not set: game management routes are disabled");
    }

    let state = AppState::new(games, ledgers, config.admin_token.clone());
    let app = create_router(state, config.body_limit);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Bet ledger stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "betledger_backend=debug,betledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
