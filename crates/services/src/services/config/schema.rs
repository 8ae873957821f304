use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ConfigError;

pub const CURRENT_CONFIG_VERSION: &str = "v1";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_cycle_search_depth() -> usize {
    64
}

fn default_transition_max_attempts() -> u32 {
    3
}

/// How new dependency edges are screened before insertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct DependencyPolicy {
    #[serde(alias = "rejectCycles")]
    pub reject_cycles: bool,
    #[serde(alias = "maxCycleSearchDepth")]
    pub max_cycle_search_depth: usize,
}

impl Default for DependencyPolicy {
    fn default() -> Self {
        Self {
            reject_cycles: false,
            max_cycle_search_depth: default_max_cycle_search_depth(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "configVersion")]
    pub config_version: String,
    pub host: String,
    /// `0` lets the OS pick a free port.
    pub port: u16,
    /// Falls back to a SQLite file in the asset directory when unset.
    #[serde(alias = "databaseUrl")]
    pub database_url: Option<String>,
    #[serde(alias = "dependencyPolicy")]
    pub dependency_policy: DependencyPolicy,
    #[serde(alias = "transitionMaxAttempts")]
    pub transition_max_attempts: u32,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        if self.host.trim().is_empty() {
            self.host = default_host();
        }

        if matches!(
            self.database_url.as_deref(),
            Some(url) if url.trim().is_empty()
        ) {
            self.database_url = None;
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transition_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "transition_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.dependency_policy.reject_cycles && self.dependency_policy.max_cycle_search_depth == 0
        {
            return Err(ConfigError::ValidationError(
                "max_cycle_search_depth must be at least 1 when cycles are rejected".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            host: default_host(),
            port: 0,
            database_url: None,
            dependency_policy: DependencyPolicy::default(),
            transition_max_attempts: default_transition_max_attempts(),
        }
    }
}
