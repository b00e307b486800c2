use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::catalog::{DEFAULT_LOG_PREFIX, DEFAULT_PAGE_SIZE};
use crate::window::WindowSpec;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub window: WindowSpec,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// What to archive and where
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArchiveConfig {
    /// Destination bucket
    #[serde(default)]
    pub bucket: String,
    /// Cluster identifiers to process, as a list or a comma-separated string
    #[serde(default, deserialize_with = "deserialize_cluster_list")]
    pub clusters: Vec<String>,
}

/// Source API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub region: Option<String>,
    /// Overrides `https://rds.<region>.amazonaws.com`
    pub endpoint: Option<String>,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: Option<u64>,
    /// Loaded from environment, not from config file
    #[serde(skip)]
    pub access_key_id: Option<String>,
    /// Loaded from environment, not from config file
    #[serde(skip)]
    pub secret_access_key: Option<String>,
    /// Loaded from environment, not from config file
    #[serde(skip)]
    pub session_token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            log_prefix: default_log_prefix(),
            page_size: default_page_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

impl SourceConfig {
    /// Endpoint for both the Query API and the download path
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.region
                .as_ref()
                .map(|region| format!("https://rds.{}.amazonaws.com", region))
        })
    }
}

fn default_log_prefix() -> String {
    DEFAULT_LOG_PREFIX.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Where the cluster membership comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryProvider {
    #[default]
    Rds,
    Static,
}

/// Inventory configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InventoryConfig {
    #[serde(default)]
    pub provider: InventoryProvider,
    /// Static membership: cluster id -> instance ids
    #[serde(default)]
    pub clusters: BTreeMap<String, Vec<String>>,
}

/// Storage provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    S3,
    Local,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    /// Root directory for the local provider; objects land under `<root>/<bucket>`
    pub root: Option<PathBuf>,
}

fn deserialize_cluster_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(list) => list.into_iter().map(|s| s.trim().to_string()).collect(),
        Raw::Csv(csv) => split_cluster_list(&csv),
    })
}

/// Split a comma-separated cluster list, dropping surrounding whitespace
pub fn split_cluster_list(csv: &str) -> Vec<String> {
    if csv.trim().is_empty() {
        return Vec::new();
    }
    csv.split(',').map(|s| s.trim().to_string()).collect()
}
