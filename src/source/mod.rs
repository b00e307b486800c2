//! Source API seams
//!
//! ## Key Components
//!
//! - [`LogSource`] - one page of a database instance's log-file listing
//! - [`ClusterInventory`] - the clusters of a run and their member instances
//! - [`StaticInventory`] - inventory taken from configuration
//! - [`RdsClient`] - both seams over the RDS Query API

mod rds;
mod responses;

pub use rds::{API_VERSION, RdsClient};

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed API response: {0}")]
    Decode(String),

    #[error("Request signing failed: {0}")]
    Signing(#[from] crate::signer::SignError),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// A database cluster and its member instances, in API order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub instances: Vec<String>,
}

/// One entry of a log-file listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    pub name: String,
    pub last_written: i64,
    pub size: u64,
}

/// Request for one page of log files
#[derive(Debug, Clone)]
pub struct LogFilesRequest<'a> {
    pub instance: &'a str,
    /// Server-side lower bound on `lastWritten`, epoch millis
    pub written_since: i64,
    pub max_records: u32,
    pub marker: Option<&'a str>,
}

/// One page of log files plus the continuation marker, if any
#[derive(Debug, Clone, Default)]
pub struct LogFilePage {
    pub files: Vec<LogFileEntry>,
    pub marker: Option<String>,
}

/// Paginated log-file listing for one instance
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn describe_log_files(&self, request: LogFilesRequest<'_>) -> Result<LogFilePage>;
}

/// Enumerates the clusters to process
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// Resolve cluster identifiers to clusters; unknown identifiers are omitted
    async fn clusters(&self, ids: &[String]) -> Result<Vec<Cluster>>;
}

/// Inventory listed in configuration
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    members: BTreeMap<String, Vec<String>>,
}

impl StaticInventory {
    pub fn new(members: BTreeMap<String, Vec<String>>) -> Self {
        Self { members }
    }
}

#[async_trait]
impl ClusterInventory for StaticInventory {
    async fn clusters(&self, ids: &[String]) -> Result<Vec<Cluster>> {
        let clusters = ids
            .iter()
            .filter_map(|id| {
                let instances = self.members.get(id);
                if instances.is_none() {
                    tracing::warn!(cluster = %id, "Cluster missing from static inventory");
                }
                instances.map(|instances| Cluster {
                    id: id.clone(),
                    instances: instances.clone(),
                })
            })
            .collect();

        Ok(clusters)
    }
}
