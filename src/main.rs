use iptv_proxy::{config::Config, metrics, server};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting iptv-proxy {}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!("Running in {} mode", if config.is_dev { "DEV" } else { "PROD" });

    let metrics_handle = match metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled, failed to install recorder: {}", e);
            None
        }
    };

    if let Err(e) = server::start(config, metrics_handle).await {
        error!("Failed to start server: {}", e);
        std::process::exit(1);
    }
}
