//! Standalone single-node KV service.
//!
//! The same store and HTTP surface as the replicated binaries, wired as a
//! cluster of one: no peers, writes commit on the local apply alone. Useful
//! as a baseline when comparing against the replicated deployments.

use std::sync::Arc;

use distributed_kv::cluster::config::ClusterConfig;
use distributed_kv::replication::coordinator::ReplicationCoordinator;
use distributed_kv::server::app::build_router;
use distributed_kv::store::memory::VersionedStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut node_id = "kv-service".to_string();
    let mut port = "8080".to_string();

    let mut i = 1;
    while i < args.len() {
        let (flag, value, step) = match args[i].split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string()), 1),
            None => (args[i].clone(), args.get(i + 1).cloned(), 2),
        };
        match flag.as_str() {
            "--node-id" => {
                if let Some(v) = value {
                    node_id = v;
                }
                i += step;
            }
            "--port" => {
                if let Some(v) = value {
                    port = v;
                }
                i += step;
            }
            _ => {
                i += 1;
            }
        }
    }

    let my_addr = std::env::var("MY_ADDR").unwrap_or_else(|_| format!("localhost:{}", port));
    let listen_port = std::env::var("PORT").unwrap_or(port);

    let config = Arc::new(ClusterConfig::leaderless(
        &node_id,
        &my_addr,
        &[my_addr.clone()],
    ));
    let store = Arc::new(VersionedStore::new());
    let coordinator = Arc::new(ReplicationCoordinator::new(store.clone(), config.clone()));

    let app = build_router(store, config, coordinator);
    let listen_addr = format!("0.0.0.0:{}", listen_port);
    tracing::info!("Starting KV service on {}", listen_addr);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
