//! Remote Fetcher - pulls tabular resources from the Open Government Data API
//!
//! A fetch never fails from the caller's point of view: network errors,
//! timeouts, auth problems and empty payloads all come back as an empty
//! `RawTable`, logged once.

use crate::table::RawTable;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.data.gov.in/resource/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FETCH_LIMIT: usize = 10_000;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no records in response")]
    NoRecords,
}

/// Anything that can hand back a table for a resource identifier
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch up to `limit` rows; an empty table means "nothing from this source"
    async fn fetch(&self, resource_id: &str, limit: usize) -> RawTable;
}

/// Remote API settings
#[derive(Debug, Clone)]
pub struct OgdConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub fetch_limit: usize,
}

impl Default for OgdConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

impl OgdConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let timeout_secs: u64 = match std::env::var("OGD_TIMEOUT_SECS") {
            Ok(v) => v.parse().context("OGD_TIMEOUT_SECS must be an integer")?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        let fetch_limit: usize = match std::env::var("OGD_FETCH_LIMIT") {
            Ok(v) => v.parse().context("OGD_FETCH_LIMIT must be an integer")?,
            Err(_) => DEFAULT_FETCH_LIMIT,
        };

        Ok(Self {
            base_url: std::env::var("OGD_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("OGD_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            fetch_limit,
        })
    }
}

/// Body of an OGD resource response; only `records` matters
#[derive(Debug, Deserialize)]
struct OgdResponse {
    #[serde(default)]
    records: Vec<Value>,
}

/// HTTP client for `{base_url}{resource_id}?api-key=..&format=json&limit=..`
pub struct OgdClient {
    client: reqwest::Client,
    config: OgdConfig,
}

impl OgdClient {
    pub fn new(config: OgdConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("agrodata-collector/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn resource_url(&self, resource_id: &str) -> String {
        format!("{}{}", self.config.base_url, resource_id)
    }

    /// Single attempt, no retries
    pub async fn try_fetch(&self, resource_id: &str, limit: usize) -> Result<RawTable, FetchError> {
        let api_key = self.config.api_key.as_deref().ok_or(FetchError::MissingApiKey)?;
        let limit = limit.to_string();

        let body: OgdResponse = self
            .client
            .get(self.resource_url(resource_id))
            .query(&[("api-key", api_key), ("format", "json"), ("limit", limit.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.records.is_empty() {
            return Err(FetchError::NoRecords);
        }

        Ok(RawTable::from_records(&body.records))
    }
}

#[async_trait]
impl RemoteSource for OgdClient {
    async fn fetch(&self, resource_id: &str, limit: usize) -> RawTable {
        info!(resource_id, limit, "fetching remote resource");
        match self.try_fetch(resource_id, limit).await {
            Ok(table) => {
                info!(resource_id, rows = table.len(), "fetched remote resource");
                table
            }
            Err(e) => {
                warn!(resource_id, error = %e, "remote fetch yielded no data");
                RawTable::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_url() {
        let client = OgdClient::new(OgdConfig::default()).unwrap();
        assert_eq!(
            client.resource_url("f20d7d45"),
            "https://api.data.gov.in/resource/f20d7d45"
        );
    }

    #[test]
    fn test_response_without_records_field() {
        let body: OgdResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(body.records.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_without_key_is_empty() {
        let client = OgdClient::new(OgdConfig::default()).unwrap();
        let result = client.try_fetch("abc", 10).await;
        assert!(matches!(result, Err(FetchError::MissingApiKey)));
        assert!(client.fetch("abc", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_empty() {
        let client = OgdClient::new(OgdConfig {
            base_url: "http://127.0.0.1:9/resource/".to_string(),
            api_key: Some("key".to_string()),
            timeout: Duration::from_secs(2),
            fetch_limit: 10,
        })
        .unwrap();
        assert!(client.fetch("abc", 10).await.is_empty());
    }
}
