use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::{ConfigError, FanoutConfig};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "FANOUT_CONFIG";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a config file and apply environment overrides
    pub async fn load_from_path(path: &Path) -> Result<FanoutConfig, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let mut config = FanoutConfig::from_toml_str(&content)?;
        config.merge_env_vars()?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `$FANOUT_CONFIG`, falling back to defaults
    pub async fn from_env() -> Result<FanoutConfig, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load_from_path(&PathBuf::from(path)).await,
            Err(_) => {
                debug!("{} not set, using default configuration", CONFIG_ENV_VAR);
                let mut config = FanoutConfig::default();
                config.merge_env_vars()?;
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[tokio::test]
    #[serial]
    async fn test_load_from_path_applies_env_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fanout.toml");
        std::fs::write(&path, "[storage]\nprefix = \"from-file\"\n").unwrap();

        env::set_var("FANOUT_MAP_ITEM_LIMIT", "12");
        let config = ConfigLoader::load_from_path(&path).await.unwrap();
        env::remove_var("FANOUT_MAP_ITEM_LIMIT");

        assert_eq!(config.storage.prefix, "from-file");
        assert_eq!(config.scheduler.map_item_limit, Some(12));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = ConfigLoader::load_from_path(Path::new("/no/such/fanout.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    #[serial]
    async fn test_from_env_without_file_uses_defaults() {
        env::remove_var(CONFIG_ENV_VAR);
        env::remove_var("FANOUT_STORAGE_PREFIX");
        env::remove_var("FANOUT_STORAGE_BUCKET");
        env::remove_var("FANOUT_MAP_ITEM_LIMIT");

        let config = ConfigLoader::from_env().await.unwrap();
        assert_eq!(config, FanoutConfig::default());
    }

    #[tokio::test]
    #[serial]
    async fn test_unparsable_item_limit_is_an_error() {
        env::remove_var(CONFIG_ENV_VAR);
        env::set_var("FANOUT_MAP_ITEM_LIMIT", "lots");
        let result = ConfigLoader::from_env().await;
        env::remove_var("FANOUT_MAP_ITEM_LIMIT");

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "FANOUT_MAP_ITEM_LIMIT"));
        assert!(err.to_string().contains("lots"));
    }
}
