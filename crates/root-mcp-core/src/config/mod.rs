//! Configuration module for the execution gateway
//!
//! YAML configuration with serde defaults, environment overrides and
//! validation. The binary loads it once at startup; the core derives runtime
//! options and executor settings from it.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;


use crate::errors::GatewayError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, GatewayError> {
    ConfigLoader::from_file(path).await
}

/// Validate a configuration
pub fn validate_config(config: &GatewayConfig) -> Result<(), GatewayError> {
    config.validate()
}
