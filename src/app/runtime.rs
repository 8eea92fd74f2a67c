//! Startup: logging first, then configuration

use anyhow::{Context, Result};

use crate::app::{config::AppConfig, logging::init_logging};
use crate::config::{ConfigLoader, FanoutConfig};

/// Initialize logging and load the orchestrator configuration
pub async fn initialize_app(config: &AppConfig) -> Result<FanoutConfig> {
    init_logging(config);
    load_config(config).await
}

/// Config from `--config` if given, else from `FANOUT_CONFIG` or defaults
pub async fn load_config(config: &AppConfig) -> Result<FanoutConfig> {
    match &config.config_path {
        Some(path) => ConfigLoader::load_from_path(path)
            .await
            .with_context(|| format!("loading {}", path.display())),
        None => ConfigLoader::from_env()
            .await
            .context("loading configuration from environment"),
    }
}
