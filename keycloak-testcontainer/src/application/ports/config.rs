use crate::domain::errors::{ConfigError, ContainerResult};
use crate::domain::settings::{DEFAULT_STARTUP_TIMEOUT, KEYCLOAK_IMAGE, KEYCLOAK_VERSION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_IMAGE: &str = "KEYCLOAK_IMAGE";
pub const ENV_VERSION: &str = "KEYCLOAK_VERSION";
pub const ENV_STARTUP_TIMEOUT: &str = "KEYCLOAK_STARTUP_TIMEOUT_SECONDS";
pub const ENV_CONTAINER_LOGS: &str = "KEYCLOAK_CONTAINER_LOGS";
pub const ENV_TEST_LOG: &str = "KEYCLOAK_TEST_LOG";

pub const DEFAULT_LOG_FILTER: &str = "keycloak_testcontainer=info";

/// Process-wide defaults for new containers, overridable through the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestcontainerConfig {
    pub image: String,
    pub tag: String,
    pub startup_timeout_seconds: u64,
    pub container_logs: bool,
    pub log_filter: String,
}

impl Default for TestcontainerConfig {
    fn default() -> Self {
        Self {
            image: KEYCLOAK_IMAGE.to_string(),
            tag: KEYCLOAK_VERSION.to_string(),
            startup_timeout_seconds: DEFAULT_STARTUP_TIMEOUT.as_secs(),
            container_logs: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TestcontainerConfig {
    pub fn validate(&self) -> ContainerResult<()> {
        if self.image.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: ENV_IMAGE.to_string(),
            }
            .into());
        }

        if self.tag.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: ENV_VERSION.to_string(),
            }
            .into());
        }

        if self.startup_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_STARTUP_TIMEOUT.to_string(),
                message: "Must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_seconds)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> ContainerResult<Self> {
        use std::env;

        let defaults = Self::default();

        let startup_timeout_seconds = match env::var(ENV_STARTUP_TIMEOUT) {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_STARTUP_TIMEOUT.to_string(),
                message: format!("Not a number of seconds: {raw}"),
            })?,
            Err(_) => defaults.startup_timeout_seconds,
        };

        let container_logs = match env::var(ENV_CONTAINER_LOGS) {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_CONTAINER_LOGS.to_string(),
                message: format!("Not a boolean: {raw}"),
            })?,
            Err(_) => defaults.container_logs,
        };

        let config = TestcontainerConfig {
            image: env::var(ENV_IMAGE).unwrap_or(defaults.image),
            tag: env::var(ENV_VERSION).unwrap_or(defaults.tag),
            startup_timeout_seconds,
            container_logs,
            log_filter: env::var(ENV_TEST_LOG).unwrap_or(defaults.log_filter),
        };

        config.validate()?;
        Ok(config)
    }

    /// Like [`from_env`](Self::from_env), falling back to defaults on invalid input
    pub fn from_env_or_default() -> Self {
        match Self::from_env() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring Keycloak container environment: {}", e);
                Self::default()
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
