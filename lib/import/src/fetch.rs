//! Outbound HTTP capability used by source adapters

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A decoded HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    /// JSON body; `Null` when the status was not a success
    pub body: Value,
}

impl FetchResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// `GET url?query`; a non-success status is returned, not raised
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<FetchResponse>;
}

/// [`HttpFetch`] backed by a pooled reqwest client
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("leadx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchResponse {
                status: status.as_u16(),
                body: Value::Null,
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| Error::Protocol(format!("response body is not JSON: {e}")))?;
        Ok(FetchResponse {
            status: status.as_u16(),
            body,
        })
    }
}
