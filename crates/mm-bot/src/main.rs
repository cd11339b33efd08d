//! Spot market-maker bot entry point.

mod config;
mod logging;

use anyhow::Result;
use clap::Parser;
use mm_engine::MarketMakingEngine;
use mm_exchange::ExchangeClient;
use mm_risk::RiskManager;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Automated market maker for a single spot pair
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MM_BOT_CONFIG)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging();

    info!("starting mm-bot v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("MM_BOT_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "loading configuration");

    let app_config = config::BotConfig::from_file(&config_path)?.into_app_config()?;
    info!(symbol = %app_config.exchange.symbol, "configuration loaded");

    let credentials = config::credentials_from_env();
    let client = Arc::new(ExchangeClient::new(&app_config.exchange, credentials)?);
    let risk = RiskManager::new(app_config.risk);
    let mut engine = MarketMakingEngine::new(client, app_config.strategy, risk);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        info!("shutdown signal received");
        signal_token.cancel();
    });

    engine.run(shutdown).await?;

    info!("mm-bot stopped");
    Ok(())
}
