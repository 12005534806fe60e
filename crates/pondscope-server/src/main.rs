use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pondscope_core::AggregatorBuilder;
use pondscope_server::cli::Cli;
use pondscope_server::{app, logging};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    let mut builder = AggregatorBuilder::from_env().context("invalid configuration")?;
    if let Some(secs) = cli.cache_ttl_secs {
        builder = builder.with_cache_ttl(Duration::from_secs(secs));
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        builder = builder.with_timeout_ms(timeout_ms);
    }

    let config = builder.config();
    info!(
        manifest = %config.manifest_base_url,
        pond0x = %config.pond0x_base_url,
        helius = config.helius_api_key.is_some(),
        alchemy = config.alchemy_api_key.is_some(),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        timeout_ms = config.timeout_ms,
        "configuration loaded"
    );

    let aggregator = Arc::new(builder.build());
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(address = %cli.bind, "pondscope listening");

    axum::serve(listener, app(aggregator))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
