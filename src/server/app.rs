use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use std::sync::Arc;

use super::handlers::{
    handle_get, handle_get_config, handle_health, handle_internal_read, handle_local_read,
    handle_replicate_write, handle_set, handle_set_config,
};
use super::protocol::{
    ENDPOINT_CONFIG, ENDPOINT_GET, ENDPOINT_HEALTH, ENDPOINT_LOCAL_READ, ENDPOINT_SET,
};
use crate::cluster::config::{ClusterConfig, TopologyMode};
use crate::replication::coordinator::ReplicationCoordinator;
use crate::replication::protocol::{ENDPOINT_INTERNAL_READ, ENDPOINT_REPLICATE_WRITE};
use crate::store::memory::VersionedStore;

/// Assembles the node's HTTP router.
///
/// Identical for every binary except that `/config` is only mounted in
/// leader-follower mode; leaderless quorums are fixed at R=1, W=N.
pub fn build_router(
    store: Arc<VersionedStore>,
    config: Arc<ClusterConfig>,
    coordinator: Arc<ReplicationCoordinator>,
) -> Router {
    let mut app = Router::new()
        // External API routes
        .route(ENDPOINT_SET, post(handle_set).put(handle_set))
        .route(ENDPOINT_GET, get(handle_get))
        .route(ENDPOINT_LOCAL_READ, get(handle_local_read))
        .route(ENDPOINT_HEALTH, get(handle_health))
        // Internal API routes (for replication)
        .route(ENDPOINT_REPLICATE_WRITE, post(handle_replicate_write))
        .route(ENDPOINT_INTERNAL_READ, get(handle_internal_read));

    if config.mode() == TopologyMode::LeaderFollower {
        app = app.route(
            ENDPOINT_CONFIG,
            get(handle_get_config).post(handle_set_config),
        );
    }

    app.layer(Extension(store))
        .layer(Extension(config))
        .layer(Extension(coordinator))
}
