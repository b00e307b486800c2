use super::models::{Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Archive bucket is not set (archive.bucket or S3_BUCKET)")]
    MissingBucket,

    #[error("No clusters configured (archive.clusters or CLUSTERS)")]
    NoClustersConfigured,

    #[error("Cluster list contains an empty identifier")]
    EmptyClusterIdentifier,

    #[error(
        "Window lookback ({lookback_minutes}m) must exceed lag ({lag_minutes}m) so that start < end"
    )]
    InvalidWindow {
        lookback_minutes: u32,
        lag_minutes: u32,
    },

    #[error("source.page_size must be positive")]
    InvalidPageSize,

    #[error("source.log_prefix must not be empty")]
    EmptyLogPrefix,

    #[error("Source region is not set (source.region or AWS_REGION)")]
    MissingRegion,

    #[error("AWS credentials missing (AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY)")]
    MissingCredentials,

    #[error("Storage provider is local but storage.root is not set")]
    MissingStorageRoot,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_archive(config)?;
    validate_window(config)?;
    validate_source(config)?;
    validate_storage(config)?;
    Ok(())
}

fn validate_archive(config: &Config) -> Result<(), ValidationError> {
    if config.archive.bucket.trim().is_empty() {
        return Err(ValidationError::MissingBucket);
    }

    if config.archive.clusters.is_empty() {
        return Err(ValidationError::NoClustersConfigured);
    }

    if config.archive.clusters.iter().any(|c| c.trim().is_empty()) {
        return Err(ValidationError::EmptyClusterIdentifier);
    }

    Ok(())
}

fn validate_window(config: &Config) -> Result<(), ValidationError> {
    if config.window.lookback_minutes <= config.window.lag_minutes {
        return Err(ValidationError::InvalidWindow {
            lookback_minutes: config.window.lookback_minutes,
            lag_minutes: config.window.lag_minutes,
        });
    }

    Ok(())
}

/// Every download is signed, so region and credentials are always required
fn validate_source(config: &Config) -> Result<(), ValidationError> {
    let source = &config.source;

    if source.page_size == 0 {
        return Err(ValidationError::InvalidPageSize);
    }

    if source.log_prefix.is_empty() {
        return Err(ValidationError::EmptyLogPrefix);
    }

    if source.region.is_none() {
        return Err(ValidationError::MissingRegion);
    }

    if source.access_key_id.is_none() || source.secret_access_key.is_none() {
        return Err(ValidationError::MissingCredentials);
    }

    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.provider == StorageProvider::Local && config.storage.root.is_none() {
        return Err(ValidationError::MissingStorageRoot);
    }

    Ok(())
}
