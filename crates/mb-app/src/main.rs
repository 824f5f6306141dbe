//! Market board - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Console market board backed by Universalis
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MB_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    mb_telemetry::init_logging()?;

    info!("Starting market board v{}", env!("CARGO_PKG_VERSION"));

    let config = mb_app::AppConfig::load(args.config)?;
    info!(
        base_url = %config.upstream.base_url,
        ttl_ms = config.refresh.ttl_ms,
        "Configuration loaded"
    );

    let app = mb_app::Application::new(config)?;
    app.run_preflight().await;
    app.run().await?;

    Ok(())
}
