use super::models::{Config, split_cluster_list};
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "AUDITVAULT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/auditvault.toml";
const ENV_PREFIX: &str = "AUDITVAULT";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = path.unwrap_or_else(|| {
        env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    });

    let mut config = load_from_sources(config_path)?;
    apply_environment(&mut config, |name| env::var(name).ok());

    Ok(config)
}

/// Fill secrets and legacy settings from the process environment
///
/// Secrets never come from TOML. `S3_BUCKET`, `CLUSTERS` and the AWS region
/// variables only apply where the file and prefixed variables left a gap.
pub(crate) fn apply_environment<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    config.source.access_key_id = lookup("AWS_ACCESS_KEY_ID");
    config.source.secret_access_key = lookup("AWS_SECRET_ACCESS_KEY");
    config.source.session_token = lookup("AWS_SESSION_TOKEN");

    if config.archive.bucket.is_empty() {
        if let Some(bucket) = lookup("S3_BUCKET") {
            config.archive.bucket = bucket;
        }
    }
    if config.archive.clusters.is_empty() {
        if let Some(clusters) = lookup("CLUSTERS") {
            config.archive.clusters = split_cluster_list(&clusters);
        }
    }
    if config.source.region.is_none() {
        config.source.region = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION"));
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // AUDITVAULT__ARCHIVE__BUCKET -> archive.bucket
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
