//! Configuration type definitions for the execution gateway
//!
//! Every field carries a serde default, so an empty YAML document is a valid
//! configuration and files only need to mention what they change.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::GatewayError;
use crate::executors::root::{default_error_markers, DEFAULT_MODULE_NAME};
use crate::executors::{ExecutorSettings, NamespaceMode};
use crate::runtime::RuntimeOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Embedded interpreter startup options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default = "default_true")]
    pub graphics: bool,
    #[serde(default = "default_true")]
    pub implicit_mt: bool,
}

/// Per-execution behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub namespace: NamespaceMode,
    #[serde(default = "default_module_name")]
    pub module_name: String,
    #[serde(default = "default_error_markers")]
    pub error_markers: Vec<String>,
    #[serde(default = "default_true")]
    pub log_code: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
            graphics: true,
            implicit_mt: true,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            namespace: NamespaceMode::default(),
            module_name: default_module_name(),
            error_markers: default_error_markers(),
            log_code: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.interpreter.module.trim().is_empty() {
            return Err(GatewayError::ConfigError("Interpreter module cannot be empty".to_string()));
        }

        if self.execution.module_name.trim().is_empty() {
            return Err(GatewayError::ConfigError("Execution module_name cannot be empty".to_string()));
        }

        if self.execution.error_markers.is_empty() {
            return Err(GatewayError::ConfigError(
                "At least one C++ error marker must be configured".to_string(),
            ));
        }

        if let Some(index) = self.execution.error_markers.iter().position(|m| m.is_empty()) {
            return Err(GatewayError::ConfigError(format!(
                "Error marker at position {} is empty",
                index
            )));
        }

        self.logging.level_filter()?;

        Ok(())
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            module: self.interpreter.module.clone(),
            graphics: self.interpreter.graphics,
            implicit_mt: self.interpreter.implicit_mt,
        }
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            namespace: self.execution.namespace,
            module_name: self.execution.module_name.clone(),
            error_markers: self.execution.error_markers.clone(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<log::LevelFilter, GatewayError> {
        log::LevelFilter::from_str(&self.level)
            .map_err(|_| GatewayError::ConfigError(format!("Invalid log level '{}'", self.level)))
    }
}

impl FromStr for NamespaceMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "persistent" => Ok(NamespaceMode::Persistent),
            "per_call" => Ok(NamespaceMode::PerCall),
            other => Err(GatewayError::ConfigError(format!(
                "Invalid namespace mode '{}' (expected 'persistent' or 'per_call')",
                other
            ))),
        }
    }
}

// Default value functions
fn default_module() -> String { "ROOT".to_string() }
fn default_module_name() -> String { DEFAULT_MODULE_NAME.to_string() }
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
