//! Archiver: clusters → instances → due files → store
//!
//! Per file: compute key, skip if already stored, fetch, skip if empty,
//! gzip, store. Everything runs in sequence and the first error aborts the
//! run; the next scheduled run picks up whatever was left, because stored
//! keys are skipped and the window overlaps the previous one.

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::catalog::{LogCatalog, LogFileRef};
use crate::fetch::{FetchError, LogFetch};
use crate::keys::{KeyError, encode_archive_key};
use crate::observability::{ArchiveMetrics, RunReport};
use crate::source::{ClusterInventory, SourceError};
use crate::storage::{ArchiveStore, Presence, StorageError};
use crate::window::{TimeWindow, WindowSpec};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Source API error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Compression failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// What happened to one due file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Archived,
    AlreadyArchived,
    Empty,
}

/// Orchestrates one archival run
pub struct Archiver {
    clusters: Vec<String>,
    window: WindowSpec,
    inventory: Arc<dyn ClusterInventory>,
    catalog: LogCatalog,
    fetcher: Arc<dyn LogFetch>,
    store: ArchiveStore,
}

impl Archiver {
    pub fn new(
        clusters: Vec<String>,
        window: WindowSpec,
        inventory: Arc<dyn ClusterInventory>,
        catalog: LogCatalog,
        fetcher: Arc<dyn LogFetch>,
        store: ArchiveStore,
    ) -> Self {
        Self {
            clusters,
            window,
            inventory,
            catalog,
            fetcher,
            store,
        }
    }

    /// Run against the wall clock
    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Run with the window anchored at `now`
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let window = self.window.at(now);
        let span = info_span!("archive_run", run_id = %Uuid::now_v7());

        async {
            info!(start = window.start, end = window.end, "Archiving audit logs");

            let metrics = ArchiveMetrics::new();
            self.archive_window(&window, &metrics).await?;

            let report = metrics.snapshot();
            info!(
                archived = report.files_archived,
                already_archived = report.files_already_archived,
                empty = report.files_empty,
                "Run completed"
            );
            Ok::<_, ArchiveError>(report)
        }
        .instrument(span)
        .await
    }

    async fn archive_window(&self, window: &TimeWindow, metrics: &ArchiveMetrics) -> Result<()> {
        let clusters = self.inventory.clusters(&self.clusters).await?;

        for cluster in &clusters {
            info!(cluster = %cluster.id, "Processing cluster");
            metrics.cluster_started();

            for instance in &cluster.instances {
                info!(cluster = %cluster.id, instance = %instance, "Processing instance");
                metrics.instance_started();

                let files = self.catalog.due_files(instance, window).await?;
                metrics.files_listed(files.len());

                for file in &files {
                    self.archive_file(&cluster.id, file, metrics).await?;
                }
            }
        }

        Ok(())
    }

    /// Take one due file through the pipeline
    pub async fn archive_file(
        &self,
        cluster: &str,
        file: &LogFileRef,
        metrics: &ArchiveMetrics,
    ) -> Result<FileOutcome> {
        info!(cluster, instance = %file.instance, name = %file.name, "Processing log file");

        let key = encode_archive_key(cluster, &file.instance, &file.name)?;

        if self.store.exists(&key).await? == Presence::Present {
            info!(key = %key, "Already archived, skipping");
            metrics.file_already_archived();
            return Ok(FileOutcome::AlreadyArchived);
        }

        let raw = self.fetcher.fetch(file).await?;
        if raw.is_empty() {
            info!(name = %file.name, "Log file is empty, skipping");
            metrics.file_empty();
            return Ok(FileOutcome::Empty);
        }

        let compressed = gzip(&raw).map_err(ArchiveError::Compress)?;
        let stored = self.store.put(&key, compressed).await?;

        metrics.file_archived(raw.len(), stored.size);
        Ok(FileOutcome::Archived)
    }
}

/// Gzip a whole buffer as a single member at the default level
pub fn gzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}
