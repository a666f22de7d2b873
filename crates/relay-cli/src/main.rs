//! relay - webhook-style event relay.
//!
//! Usage:
//!   relay serve                       # listen on 0.0.0.0:3010, store in relay.db
//!   relay serve --config relay.toml   # settings from a file
//!   relay sink --port 3030            # a partner that accepts everything

mod config;
mod sink;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use relay_core::AppBuilder;
use relay_core::impls::{HttpConnector, SqliteRegistry};
use relay_core::ports::SystemClock;

use crate::config::RelayConfig;

#[derive(Parser)]
#[command(name = "relay", version, about = "Stores partner transactions once and forwards them to subscribers")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay: HTTP endpoints plus the delivery scheduler
    Serve {
        #[arg(short, long, default_value = "relay.toml")]
        config: PathBuf,
    },
    /// Run a partner that logs and accepts every transaction
    Sink {
        #[arg(short, long, default_value = "3030")]
        port: u16,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "relay=debug,relay_core=debug,tower_http=debug"
    } else {
        "relay=info,relay_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match cli.command {
        Command::Serve { config } => serve(RelayConfig::load_from(&config)?).await,
        Command::Sink { port } => sink::run(port).await,
    }
}

async fn serve(config: RelayConfig) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let registry = if config.database.is_in_memory() {
        SqliteRegistry::open_in_memory(clock.clone())?
    } else {
        SqliteRegistry::open(&config.database.path, clock.clone())?
    };
    tracing::info!(path = %config.database.path.display(), "database open");

    let app = AppBuilder::new()
        .registry(Arc::new(registry))
        .connector(Arc::new(HttpConnector::new()))
        .clock(clock)
        .interval(config.scheduler.interval())
        .delivery_timeout(config.scheduler.delivery_timeout())
        .build()?;

    let cancel = CancellationToken::new();
    let scheduler = tokio::spawn({
        let scheduler = app.scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    let addr = config.server.addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "relay listening");

    let shutdown = cancel.clone();
    axum::serve(
        listener,
        relay_core::router(app).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::warn!("interrupted, shutting down"),
            () = shutdown.cancelled() => {}
        }
        shutdown.cancel();
    })
    .await?;

    cancel.cancel();
    scheduler.await?;
    tracing::info!("relay stopped");
    Ok(())
}
