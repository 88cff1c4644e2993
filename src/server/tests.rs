#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::cluster::config::{ClusterConfig, NodeRole};
    use crate::replication::coordinator::ReplicationCoordinator;
    use crate::server::app::build_router;
    use crate::store::memory::VersionedStore;

    // Testy integracyjne: caly klaster dziala w procesie testu, kazdy wezel
    // na wlasnym porcie 127.0.0.1:0. Opoznienia replikacji sa prawdziwe,
    // wiec pojedynczy test trwa do ok. sekundy.

    async fn bind_listeners(n: usize) -> (Vec<tokio::net::TcpListener>, Vec<String>) {
        let mut listeners = Vec::new();
        let mut addrs = Vec::new();
        for _ in 0..n {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addrs.push(format!("127.0.0.1:{}", listener.local_addr().unwrap().port()));
            listeners.push(listener);
        }
        (listeners, addrs)
    }

    fn spawn_node(listener: tokio::net::TcpListener, config: Arc<ClusterConfig>) {
        let store = Arc::new(VersionedStore::new());
        let coordinator = Arc::new(ReplicationCoordinator::new(store.clone(), config.clone()));
        let app = build_router(store, config, coordinator);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
    }

    /// Leader-follower cluster of `n` nodes; node 0 is the leader. Every
    /// node starts with the given (r, w).
    async fn spawn_leader_follower_cluster(n: usize, r: usize, w: usize) -> Vec<String> {
        let (listeners, addrs) = bind_listeners(n).await;
        let leader_addr = addrs[0].clone();
        let follower_addrs: Vec<String> = addrs[1..].to_vec();

        for (i, listener) in listeners.into_iter().enumerate() {
            let role = if i == 0 {
                NodeRole::Leader
            } else {
                NodeRole::Follower
            };
            let config = Arc::new(ClusterConfig::leader_follower(
                &format!("node-{}", i),
                role,
                &addrs[i],
                &leader_addr,
                &follower_addrs,
            ));
            config.set_replication_params(r, w).await.unwrap();
            spawn_node(listener, config);
        }

        addrs
    }

    async fn spawn_leaderless_cluster(n: usize) -> Vec<String> {
        let (listeners, addrs) = bind_listeners(n).await;

        for (i, listener) in listeners.into_iter().enumerate() {
            let config = Arc::new(ClusterConfig::leaderless(
                &format!("node-{}", i),
                &addrs[i],
                &addrs,
            ));
            spawn_node(listener, config);
        }

        addrs
    }

    async fn http_set(addr: &str, key: &str, value: &str) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("http://{}/set", addr))
            .json(&json!({"key": key, "value": value}))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn http_get(url: &str) -> (u16, Value) {
        let response = reqwest::get(url).await.unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn http_post_config(addr: &str, r: i64, w: i64) -> u16 {
        reqwest::Client::new()
            .post(format!("http://{}/config", addr))
            .json(&json!({"r": r, "w": w}))
            .send()
            .await
            .unwrap()
            .status()
            .as_u16()
    }

    async fn local_read(addr: &str, key: &str) -> (u16, Value) {
        http_get(&format!("http://{}/local_read?key={}", addr, key)).await
    }

    // ============================================================
    // LEADER-FOLLOWER: W=N (synchroniczna replikacja)
    // ============================================================

    #[tokio::test]
    async fn test_w_all_write_visible_on_every_follower_at_ack() {
        let addrs = spawn_leader_follower_cluster(5, 1, 5).await;

        let started = Instant::now();
        let (status, body) = http_set(&addrs[0], "a", "v1").await;
        let elapsed = started.elapsed();

        assert_eq!(status, 201);
        assert_eq!(body["version"], 1);
        assert_eq!(body["status"], "created");

        // Opozniony fan-out + 100 ms na aplikacje u peera
        assert!(
            elapsed >= Duration::from_millis(250),
            "W=N ack came back too fast: {:?}",
            elapsed
        );

        // Po acku kazdy follower musi juz miec wpis lokalnie
        for addr in &addrs[1..] {
            let (status, body) = local_read(addr, "a").await;
            assert_eq!(status, 200, "follower {} missing the write", addr);
            assert_eq!(body["value"], "v1");
            assert_eq!(body["version"], 1);
        }
    }

    // ============================================================
    // LEADER-FOLLOWER: W=1 (okno replikacji widoczne)
    // ============================================================

    #[tokio::test]
    async fn test_w1_ack_precedes_replication() {
        let addrs = spawn_leader_follower_cluster(5, 1, 1).await;
        // Wezel, z ktorego bedziemy czytac kworum R=5
        http_post_config(&addrs[2], 5, 1).await;

        let started = Instant::now();
        let (status, body) = http_set(&addrs[0], "b", "v2").await;

        assert_eq!(status, 201);
        assert_eq!(body["version"], 1);
        // Zapis wraca natychmiast, bez czekania na replikacje
        assert!(started.elapsed() < Duration::from_millis(250));

        // Follower ze spoznionym fan-outem (200 ms + 100 ms) jeszcze nic nie ma
        let (status, _) = local_read(&addrs[2], "b").await;
        assert_eq!(status, 404);

        // Ale odczyt kworum R=5 na tym samym wezlu znajduje wpis u lidera
        let (status, body) = http_get(&format!("http://{}/get?key=b", addrs[2])).await;
        assert_eq!(status, 200);
        assert_eq!(body["value"], "v2");
        assert_eq!(body["version"], 1);

        // Po ustaniu okna replikacji wszyscy followerzy sa zbiezni
        tokio::time::sleep(Duration::from_millis(600)).await;
        for addr in &addrs[1..] {
            let (status, body) = local_read(addr, "b").await;
            assert_eq!(status, 200);
            assert_eq!(body["version"], 1);
        }
    }

    // ============================================================
    // LEADER-FOLLOWER: kworum W=3 i martwy peer
    // ============================================================

    #[tokio::test]
    async fn test_quorum_write_tolerates_dead_peer_but_w_all_does_not() {
        // Piaty adres wskazuje na zamkniety port: wezel nigdy nie wstal
        let (listeners, addrs) = bind_listeners(5).await;
        let leader_addr = addrs[0].clone();
        let follower_addrs: Vec<String> = addrs[1..].to_vec();

        for (i, listener) in listeners.into_iter().enumerate().take(4) {
            let role = if i == 0 {
                NodeRole::Leader
            } else {
                NodeRole::Follower
            };
            let config = Arc::new(ClusterConfig::leader_follower(
                &format!("node-{}", i),
                role,
                &addrs[i],
                &leader_addr,
                &follower_addrs,
            ));
            config.set_replication_params(3, 3).await.unwrap();
            spawn_node(listener, config);
        }

        // W=3: lider + 2 followerow wystarczy mimo martwego wezla
        let (status, body) = http_set(&addrs[0], "q", "quorum").await;
        assert_eq!(status, 201);
        assert_eq!(body["version"], 1);

        // W=5 wymaga wszystkich; martwy peer -> 500 z QuorumFailure
        assert_eq!(http_post_config(&addrs[0], 1, 5).await, 200);
        let (status, body) = http_set(&addrs[0], "q2", "all").await;
        assert_eq!(status, 500);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("4/5"), "unexpected error: {}", error);

        // Brak rollbacku: lider dalej trzyma nieudany zapis
        let (status, body) = local_read(&addrs[0], "q2").await;
        assert_eq!(status, 200);
        assert_eq!(body["value"], "all");
    }

    // ============================================================
    // ROLE I WALIDACJA
    // ============================================================

    #[tokio::test]
    async fn test_follower_rejects_client_writes() {
        let addrs = spawn_leader_follower_cluster(3, 1, 1).await;

        let (status, body) = http_set(&addrs[1], "k", "v").await;
        assert_eq!(status, 403);
        assert_eq!(body["error"], "only leader accepts write requests");
    }

    #[tokio::test]
    async fn test_config_endpoint_validation() {
        let addrs = spawn_leader_follower_cluster(5, 1, 5).await;

        assert_eq!(http_post_config(&addrs[0], 0, 1).await, 400);
        assert_eq!(http_post_config(&addrs[0], 3, 6).await, 400);
        assert_eq!(http_post_config(&addrs[0], 3, 3).await, 200);

        let (status, body) = http_get(&format!("http://{}/config", addrs[0])).await;
        assert_eq!(status, 200);
        assert_eq!(body["r"], 3);
        assert_eq!(body["w"], 3);
        assert_eq!(body["n"], 5);
        assert_eq!(body["role"], "leader");
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let addrs = spawn_leader_follower_cluster(3, 1, 1).await;

        // Pusty klucz
        let (status, body) = http_set(&addrs[0], "", "v").await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "key cannot be empty");

        // Brak parametru key
        let (status, _) = http_get(&format!("http://{}/get", addrs[0])).await;
        assert_eq!(status, 400);

        // Nieistniejacy klucz
        let (status, _) = http_get(&format!("http://{}/get?key=missing", addrs[0])).await;
        assert_eq!(status, 404);
    }

    // ============================================================
    // LEADERLESS: koordynacja przez dowolny wezel
    // ============================================================

    #[tokio::test]
    async fn test_leaderless_write_window_and_convergence() {
        let addrs = spawn_leaderless_cluster(5).await;

        let coordinator_addr = addrs[2].clone();
        let write = tokio::spawn(async move { http_set(&coordinator_addr, "c", "v3").await });

        // W oknie replikacji: peer z opoznionym fan-outem jeszcze nie ma
        // wpisu, a koordynator juz tak
        tokio::time::sleep(Duration::from_millis(120)).await;
        let (status, _) = local_read(&addrs[4], "c").await;
        assert_eq!(status, 404, "write reached the delayed peer too early");

        let (status, body) = http_get(&format!("http://{}/get?key=c", addrs[2])).await;
        assert_eq!(status, 200);
        assert_eq!(body["value"], "v3");

        let (status, body) = write.await.unwrap();
        assert_eq!(status, 201);
        assert_eq!(body["version"], 1);

        // Po zakonczeniu zapisu wszystkie wezly maja te sama pare
        for addr in &addrs {
            let (status, body) = local_read(addr, "c").await;
            assert_eq!(status, 200);
            assert_eq!(body["value"], "v3");
            assert_eq!(body["version"], 1);
        }
    }

    #[tokio::test]
    async fn test_leaderless_any_node_coordinates() {
        let addrs = spawn_leaderless_cluster(3).await;

        let (status, body) = http_set(&addrs[1], "x", "from_node_1").await;
        assert_eq!(status, 201);
        assert_eq!(body["version"], 1);

        let (status, body) = http_set(&addrs[2], "x", "from_node_2").await;
        assert_eq!(status, 201);
        // Koordynator node-2 przejal wersje 1 przez replikacje, wiec jego
        // wlasny zapis musi byc scisle nowszy
        assert_eq!(body["version"], 2);
    }

    // ============================================================
    // POZOSTALE ENDPOINTY
    // ============================================================

    #[tokio::test]
    async fn test_rewriting_key_returns_strictly_greater_versions() {
        let addrs = spawn_leader_follower_cluster(3, 1, 3).await;

        let (_, body) = http_set(&addrs[0], "k", "v").await;
        let first = body["version"].as_i64().unwrap();
        let (_, body) = http_set(&addrs[0], "k", "v").await;
        let second = body["version"].as_i64().unwrap();

        assert!(second > first);

        let (status, body) = http_get(&format!("http://{}/get?key=k", addrs[0])).await;
        assert_eq!(status, 200);
        assert_eq!(body["version"], second);
    }

    #[tokio::test]
    async fn test_internal_read_endpoint() {
        let addrs = spawn_leader_follower_cluster(3, 1, 3).await;

        http_set(&addrs[0], "k", "v").await;

        let (status, body) =
            http_get(&format!("http://{}/internal/read?key=k", addrs[1])).await;
        assert_eq!(status, 200);
        assert_eq!(body["exists"], true);
        assert_eq!(body["version"], 1);

        let (status, body) =
            http_get(&format!("http://{}/internal/read?key=none", addrs[1])).await;
        assert_eq!(status, 404);
        assert_eq!(body["exists"], false);
    }

    #[tokio::test]
    async fn test_health_bodies_per_mode() {
        let lf_addrs = spawn_leader_follower_cluster(2, 1, 1).await;

        let (status, body) = http_get(&format!("http://{}/health", lf_addrs[0])).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["role"], "leader");

        let (_, body) = http_get(&format!("http://{}/health", lf_addrs[1])).await;
        assert_eq!(body["role"], "follower");

        let ll_addrs = spawn_leaderless_cluster(2).await;
        let (status, body) = http_get(&format!("http://{}/health", ll_addrs[0])).await;
        assert_eq!(status, 200);
        assert_eq!(body["mode"], "leaderless");
        assert_eq!(body["node_id"], "node-0");

        // Leaderless nie wystawia /config: kworum jest stale
        let response = reqwest::get(format!("http://{}/config", ll_addrs[0]))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }
}
