//! Configuration management for Livora
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use livora::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Platform fee rate: {}", config.ledger.platform_fee_rate);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `LIVORA__<section>__<key>`
//!
//! Examples:
//! - `LIVORA__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `LIVORA__LEDGER__SMS_UNIT_COST=0.75`
//! - `LIVORA__LEDGER__JOB_TTL=3d`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/livora.toml`.
//! This can be overridden using the `LIVORA_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, LedgerConfig, ServerConfig, TelemetryConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation (fee rate out of range, zero durations, ...).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
