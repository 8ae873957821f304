use std::path::Path;

use thiserror::Error;

mod schema;

pub use schema::{CURRENT_CONFIG_VERSION, Config, DependencyPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found at {}, using defaults", config_path.display());
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    config.validate()?;
    let normalized = config.clone().normalized();
    let raw_config = serde_json::to_string_pretty(&normalized)?;
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_cycles_allowed() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 0);
        assert!(!config.dependency_policy.reject_cycles);
        assert_eq!(config.dependency_policy.max_cycle_search_depth, 64);
        assert_eq!(config.transition_max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config = Config::from_raw(r#"{ "dependencyPolicy": { "rejectCycles": true }, "port": 8080 }"#);
        assert!(config.dependency_policy.reject_cycles);
        assert_eq!(config.dependency_policy.max_cycle_search_depth, 64);
        assert_eq!(config.port, 8080);
        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        assert_eq!(Config::from_raw("{ not json"), Config::default());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = Config {
            transition_max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert_eq!(load_config_from_file(&path).await, Config::default());

        let config = Config {
            database_url: Some("sqlite::memory:".to_string()),
            transition_max_attempts: 5,
            ..Default::default()
        };
        save_config_to_file(&config, &path).await.unwrap();
        assert_eq!(load_config_from_file(&path).await, config);
    }
}
