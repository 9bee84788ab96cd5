//! Configuration loader for YAML files and environment overrides
//!
//! Resolution order, later wins: built-in defaults, the YAML file (explicit
//! path, else the per-user config file if it exists), then `ROOT_MCP_*`
//! environment variables. The result is validated before it is returned.

use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::types::*;
use crate::errors::GatewayError;
use crate::executors::NamespaceMode;

pub const ENV_GRAPHICS: &str = "ROOT_MCP_GRAPHICS";
pub const ENV_LOG_LEVEL: &str = "ROOT_MCP_LOG_LEVEL";
pub const ENV_NAMESPACE: &str = "ROOT_MCP_NAMESPACE";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `path` if given, else from the default location, else defaults.
    pub async fn load(path: Option<&Path>) -> Result<GatewayConfig, GatewayError> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    log::debug!("Using configuration file {}", path.display());
                    Self::from_file(path).await
                }
                None => Self::from_str("").await,
            },
        }
    }

    /// `$XDG_CONFIG_HOME/root-mcp/config.yaml` (or the platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("root-mcp").join("config.yaml"))
    }

    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, GatewayError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            GatewayError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content).await
    }

    /// Load configuration from a YAML string
    pub async fn from_str(content: &str) -> Result<GatewayConfig, GatewayError> {
        let mut config: GatewayConfig = if content.trim().is_empty() {
            GatewayConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| GatewayError::ConfigError(format!("Failed to parse YAML config: {}", e)))?
        };

        Self::resolve_environment(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    fn resolve_environment(config: &mut GatewayConfig) -> Result<(), GatewayError> {
        if let Ok(value) = env::var(ENV_GRAPHICS) {
            config.interpreter.graphics = parse_bool(ENV_GRAPHICS, &value)?;
        }

        if let Ok(value) = env::var(ENV_LOG_LEVEL) {
            config.logging.level = value;
        }

        if let Ok(value) = env::var(ENV_NAMESPACE) {
            config.execution.namespace = value.parse::<NamespaceMode>()?;
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, GatewayError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GatewayError::ConfigError(format!(
            "Invalid boolean '{}' in {}",
            other, name
        ))),
    }
}
