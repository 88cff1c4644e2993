//! HTTP client for driving the cluster's external API during a load test.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outer bound on a single request; well above the cluster's own 10 s
/// peer timeout so node-side failures surface first.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct WriteRequest {
    key: String,
    value: String,
}

/// A node's answer to `/set` or `/get`.
#[derive(Debug, Deserialize)]
pub struct Response {
    pub key: String,
    pub value: String,
    pub version: i64,
}

pub struct LoadTestClient {
    http_client: reqwest::Client,
}

impl LoadTestClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// Writes through `/set` and returns the acknowledged version.
    pub async fn write(&self, addr: &str, key: &str, value: &str) -> Result<Response> {
        let payload = WriteRequest {
            key: key.to_string(),
            value: value.to_string(),
        };

        let response = self
            .http_client
            .post(format!("http://{}/set", addr))
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::CREATED {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "unexpected status code: {}, body: {}",
                status,
                body
            ));
        }

        Ok(response.json().await?)
    }

    /// Reads through `/get`. A 404 is `Ok(None)`, not a transport failure;
    /// the caller decides whether a miss counts as stale.
    pub async fn read(&self, addr: &str, key: &str) -> Result<Option<Response>> {
        let url = format!("http://{}/get?key={}", addr, urlencoding::encode(key));

        let response = self
            .http_client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "unexpected status code: {}, body: {}",
                status,
                body
            ));
        }

        Ok(Some(response.json().await?))
    }
}

impl Default for LoadTestClient {
    fn default() -> Self {
        Self::new()
    }
}
