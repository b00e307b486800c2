//! Tracing setup and per-run counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, honouring `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Counters for one archival run
#[derive(Debug, Default)]
pub struct ArchiveMetrics {
    clusters: AtomicU64,
    instances: AtomicU64,
    files_due: AtomicU64,
    files_archived: AtomicU64,
    files_already_archived: AtomicU64,
    files_empty: AtomicU64,
    bytes_fetched: AtomicU64,
    bytes_stored: AtomicU64,
}

impl ArchiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster_started(&self) {
        self.clusters.fetch_add(1, Ordering::Relaxed);
    }

    pub fn instance_started(&self) {
        self.instances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files_listed(&self, due: usize) {
        self.files_due.fetch_add(due as u64, Ordering::Relaxed);
    }

    pub fn file_archived(&self, fetched: usize, stored: usize) {
        self.files_archived.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(fetched as u64, Ordering::Relaxed);
        self.bytes_stored.fetch_add(stored as u64, Ordering::Relaxed);
        tracing::debug!(counter = "files_archived", "Metric incremented");
    }

    pub fn file_already_archived(&self) {
        self.files_already_archived.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "files_already_archived", "Metric incremented");
    }

    pub fn file_empty(&self) {
        self.files_empty.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "files_empty", "Metric incremented");
    }

    pub fn snapshot(&self) -> RunReport {
        RunReport {
            clusters: self.clusters.load(Ordering::Relaxed),
            instances: self.instances.load(Ordering::Relaxed),
            files_due: self.files_due.load(Ordering::Relaxed),
            files_archived: self.files_archived.load(Ordering::Relaxed),
            files_already_archived: self.files_already_archived.load(Ordering::Relaxed),
            files_empty: self.files_empty.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
            bytes_stored: self.bytes_stored.load(Ordering::Relaxed),
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub clusters: u64,
    pub instances: u64,
    pub files_due: u64,
    pub files_archived: u64,
    pub files_already_archived: u64,
    pub files_empty: u64,
    pub bytes_fetched: u64,
    pub bytes_stored: u64,
}
