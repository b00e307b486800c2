//! RDS Query API client

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use std::sync::Arc;
use tracing::debug;

use super::responses::{parse_clusters, parse_log_files};
use super::{
    Cluster, ClusterInventory, LogFilePage, LogFilesRequest, LogSource, Result, SourceError,
};
use crate::signer::{RequestSigner, encode_query};

pub const API_VERSION: &str = "2014-10-31";

/// Signed client for the RDS Query API
#[derive(Clone)]
pub struct RdsClient {
    http: Client,
    endpoint: Url,
    signer: Arc<dyn RequestSigner>,
}

impl RdsClient {
    pub fn new(http: Client, endpoint: Url, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            http,
            endpoint,
            signer,
        }
    }

    /// Issue one signed GET for an API action and return the response body
    async fn call(&self, action: &str, params: Vec<(String, String)>) -> Result<String> {
        let mut query = vec![
            ("Action".to_string(), action.to_string()),
            ("Version".to_string(), API_VERSION.to_string()),
        ];
        query.extend(params);

        let mut url = self.endpoint.clone();
        url.set_path("/");
        url.set_query(Some(&encode_query(&query)));

        let headers = self.signer.sign(&Method::GET, &url)?;

        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        debug!(action, "Calling RDS API");

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::RequestFailed(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

fn param(name: impl Into<String>, value: impl ToString) -> (String, String) {
    (name.into(), value.to_string())
}

#[async_trait]
impl LogSource for RdsClient {
    async fn describe_log_files(&self, request: LogFilesRequest<'_>) -> Result<LogFilePage> {
        let mut params = vec![
            param("DBInstanceIdentifier", request.instance),
            param("FileLastWritten", request.written_since),
            param("MaxRecords", request.max_records),
        ];
        if let Some(marker) = request.marker {
            params.push(param("Marker", marker));
        }

        let body = self.call("DescribeDBLogFiles", params).await?;
        parse_log_files(&body)
    }
}

#[async_trait]
impl ClusterInventory for RdsClient {
    async fn clusters(&self, ids: &[String]) -> Result<Vec<Cluster>> {
        let mut clusters = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut params = vec![param("Filters.Filter.1.Name", "db-cluster-id")];
            for (i, id) in ids.iter().enumerate() {
                params.push(param(format!("Filters.Filter.1.Values.Value.{}", i + 1), id));
            }
            if let Some(m) = &marker {
                params.push(param("Marker", m));
            }

            let body = self.call("DescribeDBClusters", params).await?;
            let (page, next) = parse_clusters(&body)?;
            clusters.extend(page);

            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(clusters)
    }
}
