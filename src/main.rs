use std::path::PathBuf;

use clap::Parser;

use edge_proxy::config::load_config;
use edge_proxy::lifecycle::startup;
use edge_proxy::observability::logging::init_logging;

/// HTTP edge reverse proxy with hot-reloaded routes.
#[derive(Parser, Debug)]
#[command(name = "edge-proxy", version, about)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "routes.toml")]
    config: PathBuf,

    /// Listen address, overriding `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level, overriding `observability.log_level` (RUST_LOG wins over both)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            tracing::error!(path = ?cli.config, error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    init_logging(&level);

    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "edge-proxy starting"
    );

    startup::run(config, &cli.config).await?;
    Ok(())
}
