//! Log fetcher: raw bytes of one log file from the source download endpoint

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, Url};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::catalog::LogFileRef;
use crate::signer::{RequestSigner, SignError};

pub const DOWNLOAD_PATH: &str = "v13/downloadCompleteLogFile";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Download of {name} returned HTTP {status}")]
    Status { name: String, status: u16 },

    #[error("Request signing failed: {0}")]
    Signing(#[from] SignError),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Retrieves the raw content of a log file
///
/// An empty body is a valid answer meaning there is nothing to archive.
#[async_trait]
pub trait LogFetch: Send + Sync {
    async fn fetch(&self, file: &LogFileRef) -> Result<Bytes>;
}

/// Signed single-attempt download over HTTP
#[derive(Clone)]
pub struct HttpLogFetcher {
    client: Client,
    endpoint: Url,
    signer: Arc<dyn RequestSigner>,
}

impl HttpLogFetcher {
    pub fn new(client: Client, endpoint: Url, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            client,
            endpoint,
            signer,
        }
    }

    /// `<endpoint>/v13/downloadCompleteLogFile/<instance>/<logFileName>`
    pub fn download_url(&self, file: &LogFileRef) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            DOWNLOAD_PATH,
            file.instance,
            file.name
        );
        Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))
    }
}

#[async_trait]
impl LogFetch for HttpLogFetcher {
    async fn fetch(&self, file: &LogFileRef) -> Result<Bytes> {
        let url = self.download_url(file)?;
        let headers = self.signer.sign(&Method::GET, &url)?;

        debug!(url = %url, "Starting download");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                name: file.name.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("Failed to read body: {}", e)))?;

        debug!(name = %file.name, size = bytes.len(), "Download completed");

        Ok(bytes)
    }
}
