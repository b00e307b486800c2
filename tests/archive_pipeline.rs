//! Pipeline tests with in-process collaborators
//!
//! The source listing and the downloads are served from memory and the
//! archive lives in an object_store `InMemory` backend, so every run is
//! deterministic for a fixed "now".

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use flate2::read::GzDecoder;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOptions, PutOptions, PutPayload, PutResult,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex};

use auditvault::archiver::{ArchiveError, Archiver};
use auditvault::catalog::{LogCatalog, LogFileRef};
use auditvault::fetch::{FetchError, LogFetch};
use auditvault::keys::{ArchiveKey, encode_archive_key};
use auditvault::source::{
    LogFileEntry, LogFilePage, LogFilesRequest, LogSource, SourceError, StaticInventory,
};
use auditvault::storage::{ArchiveStore, Presence};
use auditvault::window::WindowSpec;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn minutes_ago(minutes: i64) -> i64 {
    (now() - Duration::minutes(minutes)).timestamp_millis()
}

/// Per-instance listings, one page each
#[derive(Default)]
struct FakeSource {
    files: HashMap<String, Vec<LogFileEntry>>,
}

impl FakeSource {
    fn with(mut self, instance: &str, name: &str, last_written: i64) -> Self {
        self.files
            .entry(instance.to_string())
            .or_default()
            .push(LogFileEntry {
                name: name.to_string(),
                last_written,
                size: 0,
            });
        self
    }
}

#[async_trait]
impl LogSource for FakeSource {
    async fn describe_log_files(
        &self,
        request: LogFilesRequest<'_>,
    ) -> Result<LogFilePage, SourceError> {
        Ok(LogFilePage {
            files: self.files.get(request.instance).cloned().unwrap_or_default(),
            marker: None,
        })
    }
}

/// Serves file contents by name and records every download
#[derive(Default)]
struct FakeFetcher {
    contents: HashMap<String, Bytes>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn with(mut self, name: &str, body: &'static [u8]) -> Self {
        self.contents
            .insert(name.to_string(), Bytes::from_static(body));
        self
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogFetch for FakeFetcher {
    async fn fetch(&self, file: &LogFileRef) -> Result<Bytes, FetchError> {
        self.calls.lock().unwrap().push(file.name.clone());
        if self.failing.contains(&file.name) {
            return Err(FetchError::Status {
                name: file.name.clone(),
                status: 500,
            });
        }
        Ok(self.contents.get(&file.name).cloned().unwrap_or_default())
    }
}

/// In-memory store whose existence checks are refused, like a bucket
/// policy without `s3:GetObject`
#[derive(Debug, Default)]
struct HeadDeniedStore {
    inner: InMemory,
}

impl fmt::Display for HeadDeniedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeadDeniedStore")
    }
}

#[async_trait]
impl ObjectStore for HeadDeniedStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOptions,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn head(&self, location: &Path) -> object_store::Result<ObjectMeta> {
        Err(object_store::Error::PermissionDenied {
            path: location.to_string(),
            source: "access denied".into(),
        })
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'static, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

/// Static inventory from (cluster, instance) pairs
fn inventory(members: &[(&str, &str)]) -> Arc<StaticInventory> {
    let mut clusters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (cluster, instance) in members {
        clusters
            .entry(cluster.to_string())
            .or_default()
            .push(instance.to_string());
    }
    Arc::new(StaticInventory::new(clusters))
}

fn archiver(
    clusters: &[&str],
    inventory: Arc<StaticInventory>,
    source: FakeSource,
    fetcher: Arc<FakeFetcher>,
    store: ArchiveStore,
) -> Archiver {
    Archiver::new(
        clusters.iter().map(|c| c.to_string()).collect(),
        WindowSpec::default(),
        inventory,
        LogCatalog::with_defaults(Arc::new(source)),
        fetcher,
        store,
    )
}

fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

fn key(cluster: &str, instance: &str, name: &str) -> ArchiveKey {
    encode_archive_key(cluster, instance, name).unwrap()
}

#[tokio::test]
async fn test_end_to_end_single_file() {
    let name = "audit/audit.log.2024-05-01-10-30";
    let store = ArchiveStore::in_memory("audit-archive");
    let fetcher = Arc::new(FakeFetcher::default().with(name, b"audit line 1\naudit line 2\n"));

    let archiver = archiver(
        &["db1"],
        inventory(&[("db1", "db1-0")]),
        FakeSource::default().with("db1-0", name, minutes_ago(90)),
        fetcher.clone(),
        store.clone(),
    );

    let report = archiver.run_at(now()).await.unwrap();
    assert_eq!(report.files_archived, 1);

    let expected = key("db1", "db1-0", name);
    assert_eq!(
        expected.as_str(),
        "db1/audit/2024/05/01/10/db1-0/audit.log.2024-05-01-10-30.gz"
    );
    let stored = store.get(&expected).await.unwrap();
    assert_eq!(gunzip(&stored), b"audit line 1\naudit line 2\n");
    assert_eq!(fetcher.calls(), vec![name.to_string()]);
}

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let a = "audit/audit.log.0.2024-05-01-10-00";
    let b = "audit/audit.log.1.2024-05-01-10-15";
    let store = ArchiveStore::in_memory("audit-archive");
    let fetcher = Arc::new(FakeFetcher::default().with(a, b"a").with(b, b"b"));

    let archiver = archiver(
        &["db1"],
        inventory(&[("db1", "db1-0")]),
        FakeSource::default()
            .with("db1-0", a, minutes_ago(100))
            .with("db1-0", b, minutes_ago(80)),
        fetcher.clone(),
        store.clone(),
    );

    let first = archiver.run_at(now()).await.unwrap();
    assert_eq!(first.files_archived, 2);
    assert_eq!(first.files_already_archived, 0);

    let second = archiver.run_at(now()).await.unwrap();
    assert_eq!(second.files_archived, 0);
    assert_eq!(second.files_already_archived, 2);
    assert_eq!(second.bytes_stored, 0);

    // Only the first run downloaded anything
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test]
async fn test_window_and_prefix_select_files() {
    let in_window = "audit/audit.log.0.2024-05-01-10-30";
    let too_old = "audit/audit.log.1.2024-05-01-09-40";
    let too_new = "audit/audit.log.2.2024-05-01-11-05";
    let wrong_prefix = "error/mysql-error.log.0.2024-05-01-10-30";

    let store = ArchiveStore::in_memory("audit-archive");
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with(in_window, b"x")
            .with(too_old, b"x")
            .with(too_new, b"x")
            .with(wrong_prefix, b"x"),
    );

    let archiver = archiver(
        &["db1"],
        inventory(&[("db1", "db1-0")]),
        FakeSource::default()
            .with("db1-0", in_window, minutes_ago(90))
            .with("db1-0", too_old, minutes_ago(140))
            .with("db1-0", too_new, minutes_ago(55))
            .with("db1-0", wrong_prefix, minutes_ago(90)),
        fetcher.clone(),
        store.clone(),
    );

    let report = archiver.run_at(now()).await.unwrap();
    assert_eq!(report.files_due, 1);
    assert_eq!(fetcher.calls(), vec![in_window.to_string()]);
    assert_eq!(
        store.exists(&key("db1", "db1-0", too_old)).await.unwrap(),
        Presence::Absent
    );
}

#[tokio::test]
async fn test_empty_file_is_skipped_without_error() {
    let empty = "audit/audit.log.0.2024-05-01-10-30";
    let full = "audit/audit.log.1.2024-05-01-10-40";
    let store = ArchiveStore::in_memory("audit-archive");
    let fetcher = Arc::new(FakeFetcher::default().with(empty, b"").with(full, b"data"));

    let archiver = archiver(
        &["db1"],
        inventory(&[("db1", "db1-0")]),
        FakeSource::default()
            .with("db1-0", empty, minutes_ago(90))
            .with("db1-0", full, minutes_ago(80)),
        fetcher,
        store.clone(),
    );

    let report = archiver.run_at(now()).await.unwrap();
    assert_eq!(report.files_empty, 1);
    assert_eq!(report.files_archived, 1);
    assert_eq!(
        store.exists(&key("db1", "db1-0", empty)).await.unwrap(),
        Presence::Absent
    );
    assert_eq!(
        store.exists(&key("db1", "db1-0", full)).await.unwrap(),
        Presence::Present
    );
}

#[tokio::test]
async fn test_malformed_name_fails_the_run() {
    let good = "audit/audit.log.0.2024-05-01-10-30";
    let bad = "audit/audit.log.1.yesterday";
    let store = ArchiveStore::in_memory("audit-archive");
    let fetcher = Arc::new(FakeFetcher::default().with(good, b"g").with(bad, b"b"));

    let archiver = archiver(
        &["db1"],
        inventory(&[("db1", "db1-0")]),
        FakeSource::default()
            .with("db1-0", bad, minutes_ago(90))
            .with("db1-0", good, minutes_ago(85)),
        fetcher.clone(),
        store.clone(),
    );

    let result = archiver.run_at(now()).await;
    assert!(matches!(result, Err(ArchiveError::Key(_))));

    // The malformed file came first, so nothing after it was attempted
    assert!(fetcher.calls().is_empty());
    assert_eq!(
        store.exists(&key("db1", "db1-0", good)).await.unwrap(),
        Presence::Absent
    );
}

#[tokio::test]
async fn test_fetch_failure_aborts_remaining_files() {
    let first = "audit/audit.log.0.2024-05-01-10-00";
    let broken = "audit/audit.log.1.2024-05-01-10-10";
    let last = "audit/audit.log.2.2024-05-01-10-20";
    let store = ArchiveStore::in_memory("audit-archive");
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with(first, b"1")
            .with(last, b"3")
            .failing_on(broken),
    );

    let archiver = archiver(
        &["db1"],
        inventory(&[("db1", "db1-0")]),
        FakeSource::default()
            .with("db1-0", first, minutes_ago(100))
            .with("db1-0", broken, minutes_ago(95))
            .with("db1-0", last, minutes_ago(90)),
        fetcher.clone(),
        store.clone(),
    );

    let result = archiver.run_at(now()).await;
    assert!(matches!(
        result,
        Err(ArchiveError::Fetch(FetchError::Status { status: 500, .. }))
    ));

    assert_eq!(fetcher.calls(), vec![first.to_string(), broken.to_string()]);
    assert_eq!(
        store.exists(&key("db1", "db1-0", first)).await.unwrap(),
        Presence::Present
    );
    assert_eq!(
        store.exists(&key("db1", "db1-0", last)).await.unwrap(),
        Presence::Absent
    );
}

#[tokio::test]
async fn test_walks_clusters_and_instances_in_order() {
    let store = ArchiveStore::in_memory("audit-archive");
    let names = [
        ("db2-0", "audit/audit.log.0.2024-05-01-10-01"),
        ("db2-1", "audit/audit.log.0.2024-05-01-10-02"),
        ("db1-0", "audit/audit.log.0.2024-05-01-10-03"),
    ];

    let mut source = FakeSource::default();
    let mut fetcher = FakeFetcher::default();
    for (instance, name) in names {
        source = source.with(instance, name, minutes_ago(90));
        fetcher = fetcher.with(name, b"payload");
    }
    let fetcher = Arc::new(fetcher);

    let archiver = archiver(
        &["db2", "db1", "not-in-inventory"],
        inventory(&[("db1", "db1-0"), ("db2", "db2-0"), ("db2", "db2-1")]),
        source,
        fetcher.clone(),
        store.clone(),
    );

    let report = archiver.run_at(now()).await.unwrap();
    assert_eq!(report.clusters, 2);
    assert_eq!(report.instances, 3);
    assert_eq!(report.files_archived, 3);

    let order: Vec<String> = names.iter().map(|(_, n)| n.to_string()).collect();
    assert_eq!(fetcher.calls(), order);

    assert_eq!(
        store
            .exists(&key("db2", "db2-1", "audit/audit.log.0.2024-05-01-10-02"))
            .await
            .unwrap(),
        Presence::Present
    );
}

#[tokio::test]
async fn test_store_access_error_aborts_before_download() {
    let name = "audit/audit.log.0.2024-05-01-10-30";
    let source = FakeSource::default().with("db1-0", name, minutes_ago(90));
    let fetcher = Arc::new(FakeFetcher::default().with(name, b"audit line\n"));
    let store = ArchiveStore::new(
        Arc::new(HeadDeniedStore::default()),
        "audit-archive".to_string(),
    );

    let result = archiver(
        &["db1"],
        inventory(&[("db1", "db1-0")]),
        source,
        fetcher.clone(),
        store,
    )
    .run_at(now())
    .await;

    assert!(matches!(result, Err(ArchiveError::Storage(_))));
    assert!(fetcher.calls().is_empty());
}
