//! Log catalog: the due log files of one instance

use std::sync::Arc;
use tracing::debug;

use crate::source::{LogFilesRequest, LogSource, Result};
use crate::window::TimeWindow;

pub const DEFAULT_LOG_PREFIX: &str = "audit/";
pub const DEFAULT_PAGE_SIZE: u32 = 256;

/// A remote log file due for archival
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileRef {
    pub name: String,
    pub last_written: i64,
    pub instance: String,
}

/// Enumerates an instance's log files, keeping those due in a window
#[derive(Clone)]
pub struct LogCatalog {
    source: Arc<dyn LogSource>,
    prefix: String,
    page_size: u32,
}

impl LogCatalog {
    pub fn new(source: Arc<dyn LogSource>, prefix: impl Into<String>, page_size: u32) -> Self {
        Self {
            source,
            prefix: prefix.into(),
            page_size,
        }
    }

    pub fn with_defaults(source: Arc<dyn LogSource>) -> Self {
        Self::new(source, DEFAULT_LOG_PREFIX, DEFAULT_PAGE_SIZE)
    }

    /// Walk every page of the listing and return the due files in arrival order
    ///
    /// The server only applies the lower bound, so the upper bound and the
    /// prefix are checked here for every entry, and the lower bound is checked
    /// again.
    pub async fn due_files(&self, instance: &str, window: &TimeWindow) -> Result<Vec<LogFileRef>> {
        let mut due = Vec::new();
        let mut marker: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .source
                .describe_log_files(LogFilesRequest {
                    instance,
                    written_since: window.start,
                    max_records: self.page_size,
                    marker: marker.as_deref(),
                })
                .await?;
            pages += 1;

            let listed = page.files.len();
            due.extend(
                page.files
                    .into_iter()
                    .filter(|f| window.contains(f.last_written) && f.name.starts_with(&self.prefix))
                    .map(|f| LogFileRef {
                        name: f.name,
                        last_written: f.last_written,
                        instance: instance.to_string(),
                    }),
            );

            debug!(instance, page = pages, listed, due = due.len(), "Listed log file page");

            match page.marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(due)
    }
}
