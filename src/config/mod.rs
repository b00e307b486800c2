//! Configuration management for auditvault
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use auditvault::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Archiving into: {}", config.archive.bucket);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `AUDITVAULT__<section>__<key>`
//!
//! Examples:
//! - `AUDITVAULT__ARCHIVE__BUCKET=audit-archive`
//! - `AUDITVAULT__ARCHIVE__CLUSTERS=db1,db2`
//! - `AUDITVAULT__WINDOW__LAG_MINUTES=90`
//!
//! `S3_BUCKET` and `CLUSTERS` are still read when the archive section leaves
//! them empty. AWS credentials are only read from the environment.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/auditvault.toml`.
//! This can be overridden using the `AUDITVAULT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use models::{
    ArchiveConfig, Config, InventoryConfig, InventoryProvider, SourceConfig, StorageConfig,
    StorageProvider, split_cluster_list,
};
pub use validation::ValidationError;

use std::path::PathBuf;
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
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`AUDITVAULT__*`)
    /// 2. TOML file (default: `config/auditvault.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (no bucket, no clusters, inverted window, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, still applying the environment
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load(Some(path))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate an already-assembled configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
