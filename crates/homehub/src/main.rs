use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use homehub::devices::ThreadRandom;
use homehub::{api, AppContext, Config, Database};

/// Smart-home control backend
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "homehub.toml")]
    config: PathBuf,

    /// Address to listen on, overriding `api.listen`
    #[arg(long)]
    listen: Option<String>,

    /// Port to listen on, overriding `api.port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    tracing::info!("homehub {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loaded config from: {}", args.config.display());

    let db = match &config.storage.path {
        Some(path) => Database::open(path)
            .await
            .with_context(|| format!("failed to open snapshot {}", path.display()))?,
        None => {
            tracing::warn!("No storage.path configured, state will not survive a restart");
            Database::in_memory()
        }
    };

    let ctx = Arc::new(AppContext::new(
        Arc::new(db),
        &config.auth,
        Arc::new(ThreadRandom),
    ));

    let listen = args.listen.unwrap_or(config.api.listen);
    let port = args.port.unwrap_or(config.api.port);
    let cors = api::cors_layer(&config.api.cors_origins);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received shutdown signal"),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown_tx.send(()).ok();
    });

    tracing::info!("Press Ctrl+C to exit");
    api::serve(&listen, port, ctx, cors, shutdown_rx).await?;

    tracing::info!("homehub shutdown complete");
    Ok(())
}
