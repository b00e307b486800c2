//! XML bodies of the RDS Query API responses we read
//!
//! Only the fields the pipeline uses are modelled; everything else is ignored.

use serde::Deserialize;

use super::{Cluster, LogFileEntry, LogFilePage, SourceError};

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeDbLogFilesResponse {
    #[serde(rename = "DescribeDBLogFilesResult")]
    result: DescribeDbLogFilesResult,
}

#[derive(Debug, Deserialize)]
struct DescribeDbLogFilesResult {
    #[serde(rename = "DescribeDBLogFiles", default)]
    files: LogFileList,
    #[serde(rename = "Marker", default)]
    marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LogFileList {
    #[serde(rename = "DescribeDBLogFilesDetails", default)]
    details: Vec<LogFileDetails>,
}

#[derive(Debug, Deserialize)]
struct LogFileDetails {
    #[serde(rename = "LogFileName")]
    log_file_name: String,
    #[serde(rename = "LastWritten")]
    last_written: i64,
    #[serde(rename = "Size", default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeDbClustersResponse {
    #[serde(rename = "DescribeDBClustersResult")]
    result: DescribeDbClustersResult,
}

#[derive(Debug, Deserialize)]
struct DescribeDbClustersResult {
    #[serde(rename = "DBClusters", default)]
    clusters: ClusterList,
    #[serde(rename = "Marker", default)]
    marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterList {
    #[serde(rename = "DBCluster", default)]
    clusters: Vec<DbCluster>,
}

#[derive(Debug, Deserialize)]
struct DbCluster {
    #[serde(rename = "DBClusterIdentifier")]
    identifier: String,
    #[serde(rename = "DBClusterMembers", default)]
    members: MemberList,
}

#[derive(Debug, Default, Deserialize)]
struct MemberList {
    #[serde(rename = "DBClusterMember", default)]
    members: Vec<DbClusterMember>,
}

#[derive(Debug, Deserialize)]
struct DbClusterMember {
    #[serde(rename = "DBInstanceIdentifier")]
    instance: String,
}

fn non_empty(marker: Option<String>) -> Option<String> {
    marker.filter(|m| !m.trim().is_empty())
}

pub(crate) fn parse_log_files(body: &str) -> Result<LogFilePage, SourceError> {
    let response: DescribeDbLogFilesResponse =
        quick_xml::de::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    let files = response
        .result
        .files
        .details
        .into_iter()
        .map(|d| LogFileEntry {
            name: d.log_file_name,
            last_written: d.last_written,
            size: d.size,
        })
        .collect();

    Ok(LogFilePage {
        files,
        marker: non_empty(response.result.marker),
    })
}

pub(crate) fn parse_clusters(body: &str) -> Result<(Vec<Cluster>, Option<String>), SourceError> {
    let response: DescribeDbClustersResponse =
        quick_xml::de::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    let clusters = response
        .result
        .clusters
        .clusters
        .into_iter()
        .map(|c| Cluster {
            id: c.identifier,
            instances: c.members.members.into_iter().map(|m| m.instance).collect(),
        })
        .collect();

    Ok((clusters, non_empty(response.result.marker)))
}
