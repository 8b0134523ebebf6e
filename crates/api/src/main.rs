//! ragdemo server binary.
//!
//! Usage:
//!   ragdemo --config ragdemo.toml
//!   ragdemo --port 8080 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `RAGDEMO_CONFIG` - Path to the TOML config file
//! - `RAGDEMO_PORT` - Port to listen on (default: 8080)
//! - `RAGDEMO_BIND_ADDR` - Server bind address (default: 127.0.0.1)
//! - `OPENAI_API_KEY` - Key for the `openai` chat provider

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ragdemo_api::{AppConfig, AppState, serve};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ragdemo")]
#[command(about = "Serve the numbered retrieval-augmented generation demos")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(long, short, env = "RAGDEMO_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, short, env = "RAGDEMO_PORT", default_value_t = 8080)]
    port: u16,

    /// Bind address
    #[arg(long, short, env = "RAGDEMO_BIND_ADDR", default_value = "127.0.0.1")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ragdemo_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.bind == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0 exposes the demo endpoints to all network interfaces. \
             Demo 9 deletes every stored embedding."
        );
    }

    let config = if let Some(path) = &args.config {
        tracing::info!(path = %path.display(), "Loading configuration");
        AppConfig::from_file(path)?
    } else {
        tracing::info!("Using default configuration");
        AppConfig::default()
    }
    .with_env();

    let state = AppState::new(config)?;

    // Requests retry the load, so a failure here is not fatal.
    if let Err(e) = state.embedder.warmup().await {
        tracing::warn!(error = %e, "Embedding model warmup failed");
    }

    let ip: IpAddr = args.bind.parse()?;
    let addr = SocketAddr::new(ip, args.port);
    serve(Arc::new(state), addr).await?;

    Ok(())
}
