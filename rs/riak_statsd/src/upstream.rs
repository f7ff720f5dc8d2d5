//! HTTP client for the Riak node: the `/ping` liveness gate and the `/stats`
//! status document.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

const PING_PATH: &str = "/ping";
const STATS_PATH: &str = "/stats";

/// Body a healthy node answers `/ping` with.
const PING_OK: &str = "OK";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("not OK, response was: {0:?}")]
    NotOk(String),

    #[error("failed to decode status document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Operational counters reported by the node, keyed by stat name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusDocument(Map<String, Value>);

impl StatusDocument {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Map<String, Value>> for StatusDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<&[u8]> for StatusDocument {
    type Error = UpstreamError;

    /// Only a JSON object is a valid document.
    fn try_from(body: &[u8]) -> Result<Self, Self::Error> {
        let map = serde_json::from_slice::<Map<String, Value>>(body)?;
        Ok(Self(map))
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn check_liveness(&self) -> Result<(), UpstreamError>;
    async fn fetch_stats(&self) -> Result<StatusDocument, UpstreamError>;
}

pub struct RiakClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RiakClient {
    pub fn new(http_client: reqwest::Client, host: &str, port: u16) -> Self {
        Self {
            http_client,
            base_url: format!("http://{host}:{port}"),
        }
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, UpstreamError> {
        let response = self
            .http_client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Upstream for RiakClient {
    async fn check_liveness(&self) -> Result<(), UpstreamError> {
        let body = self.get(PING_PATH).await?;
        let body = String::from_utf8_lossy(&body);

        if body != PING_OK {
            return Err(UpstreamError::NotOk(body.into_owned()));
        }

        Ok(())
    }

    async fn fetch_stats(&self) -> Result<StatusDocument, UpstreamError> {
        let body = self.get(STATS_PATH).await?;
        StatusDocument::try_from(body.as_slice())
    }
}
