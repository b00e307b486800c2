//! Archive store over the object_store crate
//!
//! The existence of a key is the only state kept across runs, so this is also
//! the dedup boundary of the pipeline.

use object_store::{ObjectMeta, ObjectStore, path::Path as StoragePath};
use std::sync::Arc;
use thiserror::Error;

use crate::keys::ArchiveKey;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Outcome of an existence check
///
/// `Absent` is only produced for a genuine not-found answer. Every other
/// failure (permissions, network) is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// Metadata returned after a write
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Archive store wrapping any object_store backend
#[derive(Clone)]
pub struct ArchiveStore {
    store: Arc<dyn ObjectStore>,
    pub bucket: String,
}

impl ArchiveStore {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self { store, bucket }
    }

    /// In-memory store for tests and dry runs
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
            bucket: bucket.into(),
        }
    }

    /// S3 bucket, credentials and region taken from the `AWS_*` environment
    pub fn s3(bucket: &str, region: Option<&str>, endpoint: Option<&str>) -> Result<Self> {
        let mut builder = object_store::aws::AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        Ok(Self::new(Arc::new(builder.build()?), bucket.to_string()))
    }

    /// Local directory `<root>/<bucket>` standing in for the bucket
    pub fn local(root: &std::path::Path, bucket: &str) -> Result<Self> {
        let dir = root.join(bucket);
        std::fs::create_dir_all(&dir)
            .map_err(|e| StorageError::InvalidConfig(format!("{}: {}", dir.display(), e)))?;
        let store = object_store::local::LocalFileSystem::new_with_prefix(&dir)?;
        Ok(Self::new(Arc::new(store), bucket.to_string()))
    }

    /// Check whether a key has already been archived
    pub async fn exists(&self, key: &ArchiveKey) -> Result<Presence> {
        let path = StoragePath::from(key.as_str());
        classify_head(self.store.head(&path).await)
    }

    /// Write bytes under a key in one shot
    pub async fn put(&self, key: &ArchiveKey, data: Vec<u8>) -> Result<StoredObject> {
        let path = StoragePath::from(key.as_str());
        let size = data.len();

        let put_result = self.store.put(&path, data.into()).await?;

        tracing::info!(bucket = %self.bucket, key = %key, size, "Stored archive object");

        Ok(StoredObject {
            key: key.to_string(),
            etag: put_result.e_tag,
            size,
        })
    }

    /// Read an archived object back
    pub async fn get(&self, key: &ArchiveKey) -> Result<Vec<u8>> {
        let path = StoragePath::from(key.as_str());
        let bytes = self.store.get(&path).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Map a HEAD result to a presence answer, letting only not-found through as `Absent`
fn classify_head(result: object_store::Result<ObjectMeta>) -> Result<Presence> {
    match result {
        Ok(_) => Ok(Presence::Present),
        Err(object_store::Error::NotFound { .. }) => Ok(Presence::Absent),
        Err(e) => Err(e.into()),
    }
}
