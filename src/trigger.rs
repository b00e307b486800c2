//! One scheduled invocation: configuration in, status object out

use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::archiver::Archiver;
use crate::catalog::LogCatalog;
use crate::config::{Config, InventoryProvider, StorageProvider};
use crate::fetch::HttpLogFetcher;
use crate::http::HttpConfig;
use crate::observability::RunReport;
use crate::signer::{Credentials, RequestSigner, SigV4Signer};
use crate::source::{ClusterInventory, RdsClient, StaticInventory};
use crate::storage::{ArchiveStore, StorageError};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub const COMPLETED_BODY: &str = "Audit log file processing completed.";

const SIGNING_SERVICE: &str = "rds";

/// Result object of a completed invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationStatus {
    pub status_code: u16,
    pub body: String,
    #[serde(skip)]
    pub report: RunReport,
}

impl InvocationStatus {
    pub fn completed(report: RunReport) -> Self {
        Self {
            status_code: 200,
            body: COMPLETED_BODY.to_string(),
            report,
        }
    }
}

/// Wire the collaborators described by `config` into an archiver
///
/// The configuration is validated first, so no work starts on an empty
/// bucket or cluster list.
pub fn build_archiver(config: &Config) -> Result<Archiver, AnyError> {
    config.validate()?;

    let source = &config.source;
    let region = source.region.clone().ok_or("source region is not set")?;
    let endpoint = source.endpoint_url().ok_or("source endpoint is not set")?;
    let endpoint = Url::parse(&endpoint)?;

    let credentials = Credentials {
        access_key_id: source.access_key_id.clone().ok_or("AWS_ACCESS_KEY_ID is not set")?,
        secret_access_key: source
            .secret_access_key
            .clone()
            .ok_or("AWS_SECRET_ACCESS_KEY is not set")?,
        session_token: source.session_token.clone(),
    };
    let signer: Arc<dyn RequestSigner> =
        Arc::new(SigV4Signer::new(credentials, region, SIGNING_SERVICE));

    let http = HttpConfig {
        connect_timeout: Duration::from_secs(source.connect_timeout_secs),
        request_timeout: source.request_timeout_secs.map(Duration::from_secs),
        ..HttpConfig::default()
    }
    .build_client()?;

    let rds = Arc::new(RdsClient::new(http.clone(), endpoint.clone(), signer.clone()));

    let inventory: Arc<dyn ClusterInventory> = match config.inventory.provider {
        InventoryProvider::Rds => rds.clone(),
        InventoryProvider::Static => {
            Arc::new(StaticInventory::new(config.inventory.clusters.clone()))
        }
    };

    let catalog = LogCatalog::new(rds, source.log_prefix.clone(), source.page_size);
    let fetcher = Arc::new(HttpLogFetcher::new(http, endpoint, signer));
    let store = build_store(config)?;

    Ok(Archiver::new(
        config.archive.clusters.clone(),
        config.window,
        inventory,
        catalog,
        fetcher,
        store,
    ))
}

pub fn build_store(config: &Config) -> Result<ArchiveStore, StorageError> {
    let bucket = &config.archive.bucket;
    let storage = &config.storage;

    match storage.provider {
        StorageProvider::S3 => ArchiveStore::s3(
            bucket,
            storage.region.as_deref().or(config.source.region.as_deref()),
            storage.endpoint.as_deref(),
        ),
        StorageProvider::Local => {
            let root = storage
                .root
                .as_deref()
                .ok_or_else(|| StorageError::InvalidConfig("storage.root is not set".to_string()))?;
            ArchiveStore::local(root, bucket)
        }
        StorageProvider::Memory => Ok(ArchiveStore::in_memory(bucket.clone())),
    }
}

/// Run the pipeline once
pub async fn run(config: Config) -> Result<InvocationStatus, AnyError> {
    let archiver = build_archiver(&config)?;

    info!(
        bucket = %config.archive.bucket,
        clusters = ?config.archive.clusters,
        "Starting audit log archival"
    );

    let report = archiver.run().await?;
    Ok(InvocationStatus::completed(report))
}
