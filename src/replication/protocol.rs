//! Replication Network Protocol
//!
//! Defines the internal API endpoints and Data Transfer Objects (DTOs) used
//! for inter-node replication traffic (replicate-write, remote read).
//!
//! These structures are serialized as JSON and sent over HTTP between the
//! write coordinator and its peers.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Internal endpoint a coordinator pushes replicated writes to.
pub const ENDPOINT_REPLICATE_WRITE: &str = "/internal/replicate_write";
/// Internal endpoint for reading a peer's local binding during quorum reads.
pub const ENDPOINT_INTERNAL_READ: &str = "/internal/read";

// --- Data Transfer Objects ---

/// Payload pushed from the write coordinator to a peer.
///
/// Carries the coordinator's definitive version; the peer adopts it verbatim
/// rather than assigning its own.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateWriteRequest {
    /// The data key.
    pub key: String,
    /// The opaque value.
    pub value: String,
    /// Version assigned by the coordinator's local apply.
    pub version: i64,
}

/// Acknowledgment for a replicated write.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateWriteResponse {
    /// Whether the peer applied (or deliberately dropped a stale copy of) the write.
    pub success: bool,
    /// Echo of the replicated version.
    #[serde(default)]
    pub version: i64,
    /// Failure detail, present only when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A peer's answer to an internal read.
///
/// `exists: false` (with empty key/value) is the wire form of "absent"; it is
/// returned with a 404 status so plain HTTP tooling reads naturally too.
#[derive(Debug, Serialize, Deserialize)]
pub struct InternalReadResponse {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub version: i64,
    pub exists: bool,
}
