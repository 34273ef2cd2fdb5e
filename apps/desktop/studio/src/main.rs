use studio::error::StudioError;
use studio::host::StudioHost;
use studio::logger::initialize as LoggerInitialize;

use bridge_core::BridgeConfig;
use bridge_core::config::load_dotenv;

use log::{error, info};

const LOG_DIR_NAME: &str = "logs";

#[tokio::main]
async fn main() -> Result<(), StudioError> {
    let dotenv_path = load_dotenv();

    let config_dir = BridgeConfig::default_dir()?;
    let log_dir = config_dir.join(LOG_DIR_NAME);

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("Studio host starting");
    info!("Config directory: {}", config_dir.display());
    if let Some(path) = dotenv_path {
        info!("Environment loaded from {}", path.display());
    }

    let config = BridgeConfig::load(&config_dir)?.with_env_overrides()?;

    let mut host = StudioHost::start(&config).await?;
    host.publish_endpoint(&config_dir)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for shutdown signal: {e}");
    }

    info!("Shutdown requested");
    host.shutdown().await;

    Ok(())
}
