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

    let mut node_id: Option<String> = None;
    let mut all_node_addrs_arg: Option<String> = None;
    let mut port = "8080".to_string();

    let mut i = 1;
    while i < args.len() {
        let (flag, value, step) = split_flag(&args, i);
        match flag.as_str() {
            "--node-id" => {
                node_id = value;
                i += step;
            }
            "--all-node-addrs" => {
                all_node_addrs_arg = value;
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
            "Usage: {} --node-id <id> --all-node-addrs <a,b,c> [--port <port>]",
            args[0]
        );
        std::process::exit(1);
    };
    let Some(all_node_addrs_arg) = all_node_addrs_arg else {
        eprintln!("--all-node-addrs is required");
        std::process::exit(1);
    };

    let all_node_addrs: Vec<String> = all_node_addrs_arg
        .split(',')
        .map(|addr| addr.trim().to_string())
        .filter(|addr| !addr.is_empty())
        .collect();

    let my_addr = std::env::var("MY_ADDR").unwrap_or_else(|_| format!("localhost:{}", port));
    let listen_port = std::env::var("PORT").unwrap_or(port);

    if !all_node_addrs.contains(&my_addr) {
        tracing::warn!(
            "Node address {} not found in all-node-addrs list",
            my_addr
        );
    }

    // 1. Cluster config (R=1, W=N fixed):
    let config = Arc::new(ClusterConfig::leaderless(&node_id, &my_addr, &all_node_addrs));

    tracing::info!("Starting Leaderless node: {} on port {}", node_id, listen_port);
    tracing::info!("All node addresses: {:?}", all_node_addrs);
    tracing::info!("This node address: {}", my_addr);
    tracing::info!("Configuration: W={} (N), R=1", config.n());

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
