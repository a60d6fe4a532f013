//! Screener - cached stock market data over HTTP
//!
//! Serves quotes, company profiles, price charts and sparklines for a fixed
//! list of tickers, reading through short-lived caches in front of Yahoo
//! Finance.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use screener::api::app_router;
use screener::cli::{Cli, ServerConfig};
use screener::data::{all_tickers, YahooClient};
use screener::service::MarketService;
use screener::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match ServerConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    init_tracing(config.log_format);

    let provider = YahooClient::new(config.upstream_timeout)?;
    let service = Arc::new(MarketService::new(Arc::new(provider), all_tickers()));
    let router = app_router(Arc::clone(&service), config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, tickers = service.tickers().len(), "listening");

    if config.warmup {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            match service.quotes().await {
                Ok(quotes) => info!(count = quotes.data.len(), "quote cache warmed"),
                Err(e) => warn!(error = %e, "quote warm-up failed"),
            }
        });
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
