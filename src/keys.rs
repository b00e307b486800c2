//! Archive key layout
//!
//! Every archived log lands at:
//! `{cluster}/audit/{YYYY}/{MM}/{DD}/{HH}/{instance}/{basename}.gz`
//!
//! The date parts come from the timestamp embedded in the log file name, not
//! from the time of the run. Month, day and hour are zero-padded so keys sort
//! by time.
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;
use thiserror::Error;

/// Format of the timestamp token embedded in log file names
pub const NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M";

const TIMESTAMP_SEGMENT: usize = 3;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Malformed log file name '{name}': {reason}")]
    MalformedName { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, KeyError>;

/// Destination key of one archived log file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveKey(String);

impl ArchiveKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArchiveKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode the archive key for a log file owned by `cluster`/`instance`
pub fn encode_archive_key(cluster: &str, instance: &str, log_file_name: &str) -> Result<ArchiveKey> {
    let timestamp = parse_name_timestamp(log_file_name)?;
    let basename = basename(log_file_name);

    Ok(ArchiveKey(format!(
        "{}/audit/{:04}/{:02}/{:02}/{:02}/{}/{}.gz",
        cluster,
        timestamp.year(),
        timestamp.month(),
        timestamp.day(),
        timestamp.hour(),
        instance,
        basename
    )))
}

/// Extract the timestamp embedded in a log file name
///
/// Rotated names (`audit/audit.log.2.2024-05-01-10-30`) carry it as the 4th
/// `.`-delimited segment. Names without a rotation index
/// (`audit/audit.log.2024-05-01-10-30`) carry it as their last one.
pub fn parse_name_timestamp(log_file_name: &str) -> Result<NaiveDateTime> {
    let segments: Vec<&str> = log_file_name.split('.').collect();

    let token = match segments.len() {
        n if n > TIMESTAMP_SEGMENT => segments[TIMESTAMP_SEGMENT],
        n if n == TIMESTAMP_SEGMENT => segments[TIMESTAMP_SEGMENT - 1],
        _ => {
            return Err(KeyError::MalformedName {
                name: log_file_name.to_string(),
                reason: "no timestamp segment".to_string(),
            });
        }
    };

    NaiveDateTime::parse_from_str(token, NAME_TIMESTAMP_FORMAT).map_err(|e| KeyError::MalformedName {
        name: log_file_name.to_string(),
        reason: format!("'{}' is not a {} timestamp: {}", token, NAME_TIMESTAMP_FORMAT, e),
    })
}

/// Last `/`-delimited segment of a log file name
pub fn basename(log_file_name: &str) -> &str {
    log_file_name.rsplit('/').next().unwrap_or(log_file_name)
}
