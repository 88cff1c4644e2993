use std::sync::Arc;

use distributed_kv::cluster::config::{ClusterConfig, NodeRole};
use distributed_kv::replication::coordinator::ReplicationCoordinator;
use distributed_kv::server::app::build_router;
use distributed_kv::store::memory::VersionedStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut node_id: Option<String> = None;
    let mut role: Option<String> = None;
    let mut leader_addr: Option<String> = None;
    let mut follower_addrs_arg: Option<String> = None;
    let mut port = "8080".to_string();

    let mut i = 1;
    while i < args.len() {
        let (flag, value, step) = split_flag(&args, i);
        match flag.as_str() {
            "--node-id" => {
                node_id = value;
                i += step;
            }
            "--role" => {
                role = value;
                i += step;
            }
            "--leader-addr" => {
                leader_addr = value;
                i += step;
            }
            "--follower-addrs" => {
                follower_addrs_arg = value;
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

    let Some(node_id) = node_id else {
        eprintln!("--node-id is required");
        eprintln!(
            "Usage: {} --node-id <id> --role <leader|follower> --leader-addr <addr> \
             --follower-addrs <a,b,c> [--port <port>]",
            args[0]
        );
        std::process::exit(1);
    };
    let role = match role.as_deref() {
        Some("leader") => NodeRole::Leader,
        Some("follower") => NodeRole::Follower,
        _ => {
            eprintln!("--role must be 'leader' or 'follower'");
            std::process::exit(1);
        }
    };
    let Some(leader_addr) = leader_addr else {
        eprintln!("--leader-addr is required");
        std::process::exit(1);
    };

    let follower_addrs: Vec<String> = follower_addrs_arg
        .unwrap_or_default()
        .split(',')
        .map(|addr| addr.trim().to_string())
        .filter(|addr| !addr.is_empty())
        .collect();

    // This node's address as peers see it; overridable for container setups.
    let my_addr = std::env::var("MY_ADDR").unwrap_or_else(|_| format!("localhost:{}", port));
    let listen_port = std::env::var("PORT").unwrap_or(port);

    tracing::info!(
        "Starting Leader-Follower node: {} (role: {:?}) on port {}",
        node_id,
        role,
        listen_port
    );
    tracing::info!("Leader address: {}", leader_addr);
    if !follower_addrs.is_empty() {
        tracing::info!("Follower addresses: {:?}", follower_addrs);
    }

    // 1. Cluster config:
    let config = Arc::new(ClusterConfig::leader_follower(
        &node_id,
        role,
        &my_addr,
        &leader_addr,
        &follower_addrs,
    ));

    // Default replication parameters (tunable at runtime via /config):
    // R=1 with a full write quorum.
    config.set_replication_params(1, config.n()).await?;

    // 2. Storage + coordinator:
    let store = Arc::new(VersionedStore::new());
    let coordinator = Arc::new(ReplicationCoordinator::new(store.clone(), config.clone()));

    // 3. HTTP server:
    let app = build_router(store, config, coordinator);
    let listen_addr = format!("0.0.0.0:{}", listen_port);
    tracing::info!("HTTP server listening on {}", listen_addr);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn split_flag(args: &[String], i: usize) -> (String, Option<String>, usize) {
    match args[i].split_once('=') {
        Some((flag, value)) => (flag.to_string(), Some(value.to_string()), 1),
        None => (args[i].clone(), args.get(i + 1).cloned(), 2),
    }
}
