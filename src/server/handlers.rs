//! HTTP API Handlers
//!
//! Bridges between the axum web framework and the coordinator/store logic.
//! Role checks and request validation happen here; everything consistency-
//! related is delegated to `ReplicationCoordinator`.

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::protocol::{
    ConfigUpdateRequest, ConfigUpdatedResponse, ConfigView, ErrorResponse, GetResponse,
    HealthResponse, SetRequest, SetResponse,
};
use crate::cluster::config::{ClusterConfig, NodeRole, TopologyMode};
use crate::error::KvError;
use crate::replication::coordinator::ReplicationCoordinator;
use crate::replication::protocol::{
    InternalReadResponse, ReplicateWriteRequest, ReplicateWriteResponse,
};
use crate::store::memory::VersionedStore;

/// A peer sleeps this long before applying an inbound replicated write,
/// simulating a slow follower.
const REPLICATE_APPLY_DELAY: Duration = Duration::from_millis(100);

/// A follower sleeps this long before answering an internal read.
const FOLLOWER_READ_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Deserialize)]
pub struct KeyParams {
    key: Option<String>,
}

fn error_reply(err: KvError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        KvError::EmptyKey | KvError::InvalidQuorum { .. } => StatusCode::BAD_REQUEST,
        KvError::NotLeader => StatusCode::FORBIDDEN,
        KvError::NotFound => StatusCode::NOT_FOUND,
        KvError::QuorumFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn missing_key_reply() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "key parameter is required".to_string(),
        }),
    )
}

/// Public write handler.
///
/// The receiving node coordinates the write: local apply, then replication
/// according to the active W policy. Under leader-follower only the leader
/// gets this far; followers are rejected with 403.
pub async fn handle_set(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
    Json(req): Json<SetRequest>,
) -> Result<(StatusCode, Json<SetResponse>), (StatusCode, Json<ErrorResponse>)> {
    if req.key.is_empty() {
        return Err(error_reply(KvError::EmptyKey));
    }

    match coordinator.write(&req.key, &req.value).await {
        Ok(version) => Ok((
            StatusCode::CREATED,
            Json(SetResponse {
                key: req.key,
                value: req.value,
                version,
                status: "created".to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!("Write for {} failed: {}", req.key, e);
            Err(error_reply(e))
        }
    }
}

/// Public read handler.
///
/// Delegates to the coordinator, which answers locally for R=1 and fans out
/// for larger read quorums.
pub async fn handle_get(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
    Query(params): Query<KeyParams>,
) -> Result<(StatusCode, Json<GetResponse>), (StatusCode, Json<ErrorResponse>)> {
    let Some(key) = params.key.filter(|k| !k.is_empty()) else {
        return Err(missing_key_reply());
    };

    match coordinator.read(&key).await {
        Ok(kv) => Ok((
            StatusCode::OK,
            Json(GetResponse {
                key: kv.key,
                value: kv.value,
                version: kv.version,
            }),
        )),
        Err(e) => Err(error_reply(e)),
    }
}

/// Uncoordinated local read.
///
/// Serves the node's own binding with no network I/O and no delays. This is
/// the probe that makes the replication window visible from outside.
pub async fn handle_local_read(
    Extension(store): Extension<Arc<VersionedStore>>,
    Query(params): Query<KeyParams>,
) -> Result<(StatusCode, Json<GetResponse>), (StatusCode, Json<ErrorResponse>)> {
    let Some(key) = params.key.filter(|k| !k.is_empty()) else {
        return Err(missing_key_reply());
    };

    match store.get(&key).await {
        Some(kv) => Ok((
            StatusCode::OK,
            Json(GetResponse {
                key: kv.key,
                value: kv.value,
                version: kv.version,
            }),
        )),
        None => Err(error_reply(KvError::NotFound)),
    }
}

/// Liveness endpoint.
pub async fn handle_health(
    Extension(config): Extension<Arc<ClusterConfig>>,
) -> (StatusCode, Json<HealthResponse>) {
    let body = match config.mode() {
        TopologyMode::LeaderFollower => HealthResponse {
            status: "healthy".to_string(),
            role: config.role(),
            mode: None,
            node_id: None,
            time: chrono::Utc::now().to_rfc3339(),
        },
        TopologyMode::Leaderless => HealthResponse {
            status: "healthy".to_string(),
            role: None,
            mode: Some("leaderless".to_string()),
            node_id: Some(config.node_id().to_string()),
            time: chrono::Utc::now().to_rfc3339(),
        },
    };

    (StatusCode::OK, Json(body))
}

/// Returns the node's current replication configuration.
pub async fn handle_get_config(
    Extension(config): Extension<Arc<ClusterConfig>>,
) -> (StatusCode, Json<ConfigView>) {
    let (r, w) = config.replication_params().await;

    (
        StatusCode::OK,
        Json(ConfigView {
            node_id: config.node_id().to_string(),
            role: config.role(),
            n: config.n(),
            r,
            w,
        }),
    )
}

/// Retunes R and W on this node. Values outside [1, N] are rejected.
pub async fn handle_set_config(
    Extension(config): Extension<Arc<ClusterConfig>>,
    Json(req): Json<ConfigUpdateRequest>,
) -> Result<(StatusCode, Json<ConfigUpdatedResponse>), (StatusCode, Json<ErrorResponse>)> {
    match config.set_replication_params(req.r, req.w).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(ConfigUpdatedResponse {
                status: "configuration updated".to_string(),
                r: req.r,
                w: req.w,
            }),
        )),
        Err(e) => Err(error_reply(e)),
    }
}

/// Internal endpoint: applies a write pushed by a coordinator.
///
/// Sleeps 100 ms before applying; the delay is part of the protocol and what
/// keeps followers observably behind the coordinator.
pub async fn handle_replicate_write(
    Extension(store): Extension<Arc<VersionedStore>>,
    Json(req): Json<ReplicateWriteRequest>,
) -> (StatusCode, Json<ReplicateWriteResponse>) {
    tokio::time::sleep(REPLICATE_APPLY_DELAY).await;

    match store
        .set_with_version(&req.key, &req.value, req.version)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ReplicateWriteResponse {
                success: true,
                version: req.version,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to apply replica for {}: {}", req.key, e);
            (
                StatusCode::BAD_REQUEST,
                Json(ReplicateWriteResponse {
                    success: false,
                    version: 0,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Internal endpoint: serves this node's local binding to a peer.
///
/// A follower sleeps 50 ms before replying, modelling the slow remote read
/// half of the quorum-read path.
pub async fn handle_internal_read(
    Extension(store): Extension<Arc<VersionedStore>>,
    Extension(config): Extension<Arc<ClusterConfig>>,
    Query(params): Query<KeyParams>,
) -> Result<(StatusCode, Json<InternalReadResponse>), (StatusCode, Json<ErrorResponse>)> {
    let Some(key) = params.key.filter(|k| !k.is_empty()) else {
        return Err(missing_key_reply());
    };

    if config.role() == Some(NodeRole::Follower) {
        tokio::time::sleep(FOLLOWER_READ_DELAY).await;
    }

    match store.get(&key).await {
        Some(kv) => Ok((
            StatusCode::OK,
            Json(InternalReadResponse {
                key: kv.key,
                value: kv.value,
                version: kv.version,
                exists: true,
            }),
        )),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(InternalReadResponse {
                key: String::new(),
                value: String::new(),
                version: 0,
                exists: false,
            }),
        )),
    }
}
