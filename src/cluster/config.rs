use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::KvError;

/// Deployment topology of the cluster this node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyMode {
    /// One statically configured leader fans writes out to followers.
    LeaderFollower,
    /// Any node may accept a write and becomes its coordinator.
    Leaderless,
}

/// Role of a node within a leader-follower cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Leader,
    Follower,
}

struct ReplicationParams {
    r: usize,
    w: usize,
}

/// Per-node cluster configuration.
///
/// Identity, role, and the peer list are fixed at startup; only the
/// replication parameters (R, W) are mutable, behind a read/write lock.
pub struct ClusterConfig {
    node_id: String,
    my_addr: String,
    mode: TopologyMode,
    role: Option<NodeRole>,
    /// Addresses of all nodes including self, in cluster order.
    all_node_addrs: Vec<String>,
    n: usize,
    params: RwLock<ReplicationParams>,
}

impl ClusterConfig {
    /// Creates the configuration for a leader-follower node.
    ///
    /// The peer list is the leader followed by the followers, so every node
    /// in the cluster sees the same ordering.
    pub fn leader_follower(
        node_id: &str,
        role: NodeRole,
        my_addr: &str,
        leader_addr: &str,
        follower_addrs: &[String],
    ) -> Self {
        let mut all_node_addrs = vec![leader_addr.to_string()];
        all_node_addrs.extend(follower_addrs.iter().cloned());
        let n = all_node_addrs.len();

        Self {
            node_id: node_id.to_string(),
            my_addr: my_addr.to_string(),
            mode: TopologyMode::LeaderFollower,
            role: Some(role),
            all_node_addrs,
            n,
            params: RwLock::new(ReplicationParams { r: 1, w: 1 }),
        }
    }

    /// Creates the configuration for a leaderless node.
    ///
    /// R and W are not tunable in this mode: R=1, W=N.
    pub fn leaderless(node_id: &str, my_addr: &str, all_node_addrs: &[String]) -> Self {
        let all_node_addrs: Vec<String> = all_node_addrs.to_vec();
        let n = all_node_addrs.len();

        Self {
            node_id: node_id.to_string(),
            my_addr: my_addr.to_string(),
            mode: TopologyMode::Leaderless,
            role: None,
            all_node_addrs,
            n,
            params: RwLock::new(ReplicationParams { r: 1, w: n }),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn my_addr(&self) -> &str {
        &self.my_addr
    }

    pub fn mode(&self) -> TopologyMode {
        self.mode
    }

    pub fn role(&self) -> Option<NodeRole> {
        self.role
    }

    /// True if this node may accept client writes.
    ///
    /// In leaderless mode every node is a coordinator for the writes it
    /// receives, so this is only restrictive under leader-follower.
    pub fn is_leader(&self) -> bool {
        match self.mode {
            TopologyMode::LeaderFollower => self.role == Some(NodeRole::Leader),
            TopologyMode::Leaderless => true,
        }
    }

    /// Total number of nodes in the cluster.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Addresses of all nodes including self, in cluster order.
    pub fn all_node_addrs(&self) -> Vec<String> {
        self.all_node_addrs.clone()
    }

    /// Addresses of every node except this one, in cluster order.
    ///
    /// This is the fan-out target set for writes coordinated here.
    pub fn other_node_addrs(&self) -> Vec<String> {
        self.all_node_addrs
            .iter()
            .filter(|addr| *addr != &self.my_addr)
            .cloned()
            .collect()
    }

    /// Returns the current (R, W) pair.
    pub async fn replication_params(&self) -> (usize, usize) {
        let params = self.params.read().await;
        (params.r, params.w)
    }

    /// Updates R and W, validating `1 <= R, W <= N`.
    pub async fn set_replication_params(&self, r: usize, w: usize) -> Result<(), KvError> {
        if r < 1 || r > self.n || w < 1 || w > self.n {
            return Err(KvError::InvalidQuorum { n: self.n });
        }

        let mut params = self.params.write().await;
        params.r = r;
        params.w = w;

        Ok(())
    }
}
