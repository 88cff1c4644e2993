//! External API Protocol
//!
//! Endpoints and Data Transfer Objects (DTOs) of the client-facing HTTP
//! surface. Everything is JSON over HTTP; errors are `{"error": "..."}`
//! bodies with the status code carrying the taxonomy.

use serde::{Deserialize, Serialize};

use crate::cluster::config::NodeRole;

// --- API Endpoints ---

/// Public endpoint for client writes.
pub const ENDPOINT_SET: &str = "/set";
/// Public endpoint for quorum reads.
pub const ENDPOINT_GET: &str = "/get";
/// Public endpoint for uncoordinated local reads (observing staleness).
pub const ENDPOINT_LOCAL_READ: &str = "/local_read";
/// Liveness endpoint.
pub const ENDPOINT_HEALTH: &str = "/health";
/// Runtime (R, W) inspection and tuning. Leader-follower mode only.
pub const ENDPOINT_CONFIG: &str = "/config";

// --- Data Transfer Objects ---

/// Client write request.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
}

/// Acknowledgment of a client write, echoing the assigned version.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetResponse {
    pub key: String,
    pub value: String,
    pub version: i64,
    pub status: String,
}

/// A read result.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
    pub version: i64,
}

/// Liveness body. `role` is present in leader-follower mode; `mode` and
/// `node_id` in leaderless mode.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub time: String,
}

/// Current replication configuration of a node.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigView {
    pub node_id: String,
    pub role: Option<NodeRole>,
    pub n: usize,
    pub r: usize,
    pub w: usize,
}

/// Request to retune the replication parameters.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigUpdateRequest {
    pub r: usize,
    pub w: usize,
}

/// Acknowledgment of a configuration change.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigUpdatedResponse {
    pub status: String,
    pub r: usize,
    pub w: usize,
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
