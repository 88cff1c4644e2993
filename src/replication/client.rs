use anyhow::Result;
use std::time::Duration;

use super::protocol::{
    ENDPOINT_INTERNAL_READ, ENDPOINT_REPLICATE_WRITE, InternalReadResponse,
    ReplicateWriteRequest, ReplicateWriteResponse,
};
use crate::store::memory::KeyValue;

/// Transport timeout for any single peer call. A timed-out call counts as a
/// failed acknowledgment; there are no retries.
const PEER_TIMEOUT: Duration = Duration::from_secs(10);

/// Pre-send delay for every replicate-write after the first in a fan-out.
const REPLICATE_SEND_DELAY: Duration = Duration::from_millis(200);

/// Pre-send delay for remote reads, modelling a slow follower link.
const REMOTE_READ_DELAY: Duration = Duration::from_millis(50);

/// Outbound messenger for inter-node traffic.
///
/// Stateless beyond reqwest's connection pooling; one instance is shared by
/// the coordinator and cloned into fan-out tasks.
#[derive(Clone)]
pub struct PeerClient {
    http_client: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// Pushes a replicated write to `addr`.
    ///
    /// When `delay_before_send` is set, the task sleeps 200 ms first; the
    /// delay is part of the protocol's observable behavior, not tuning.
    /// A non-2xx reply is reported as `success=false` with the body as the
    /// error text; transport failures bubble up as `Err`.
    pub async fn replicate_write(
        &self,
        addr: &str,
        key: &str,
        value: &str,
        version: i64,
        delay_before_send: bool,
    ) -> Result<ReplicateWriteResponse> {
        if delay_before_send {
            tokio::time::sleep(REPLICATE_SEND_DELAY).await;
        }

        let payload = ReplicateWriteRequest {
            key: key.to_string(),
            value: value.to_string(),
            version,
        };

        let response = self
            .http_client
            .post(format!("http://{}{}", addr, ENDPOINT_REPLICATE_WRITE))
            .json(&payload)
            .timeout(PEER_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(ReplicateWriteResponse {
                success: false,
                version: 0,
                error: Some(body),
            });
        }

        let ack: ReplicateWriteResponse = response.json().await?;
        Ok(ack)
    }

    /// Reads a key from another node's local store.
    ///
    /// When `delay_before_send` is set, sleeps 50 ms before issuing the call.
    /// Returns `Ok(None)` when the peer does not hold the key.
    pub async fn read_from_node(
        &self,
        addr: &str,
        key: &str,
        delay_before_send: bool,
    ) -> Result<Option<KeyValue>> {
        if delay_before_send {
            tokio::time::sleep(REMOTE_READ_DELAY).await;
        }

        let url = format!(
            "http://{}{}?key={}",
            addr,
            ENDPOINT_INTERNAL_READ,
            urlencoding::encode(key)
        );

        let response = self
            .http_client
            .get(url)
            .timeout(PEER_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "internal read failed: {}",
                response.status()
            ));
        }

        let body: InternalReadResponse = response.json().await?;
        if !body.exists {
            return Ok(None);
        }

        Ok(Some(KeyValue {
            key: body.key,
            value: body.value,
            version: body.version,
        }))
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}
