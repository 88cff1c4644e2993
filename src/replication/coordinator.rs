use std::sync::Arc;
use tokio::sync::mpsc;

use super::client::PeerClient;
use crate::cluster::config::{ClusterConfig, TopologyMode};
use crate::error::KvError;
use crate::store::memory::{KeyValue, VersionedStore};

/// How many acknowledgments gate a write's response, derived from (W, N).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AckPolicy {
    /// W=1: acknowledge after the local apply, replicate fire-and-forget.
    Async,
    /// 1<W<N: respond once `required` nodes (counting the coordinator) ack.
    SyncQuorum(usize),
    /// W=N: every peer must acknowledge success.
    SyncAll,
}

pub(super) fn ack_policy(w: usize, n: usize) -> AckPolicy {
    if w <= 1 {
        AckPolicy::Async
    } else if w >= n {
        AckPolicy::SyncAll
    } else {
        AckPolicy::SyncQuorum(w)
    }
}

/// Executes the write and read quorum protocols for both topologies.
///
/// The coordinator keeps no state between requests: everything a call needs
/// (the ack counter, the reply channel, the quorum target) lives on its stack
/// and dies with it. Serialization of conflicting writes happens in the
/// store's lock, not here, so independent client operations run in parallel.
pub struct ReplicationCoordinator {
    store: Arc<VersionedStore>,
    config: Arc<ClusterConfig>,
    client: PeerClient,
}

impl ReplicationCoordinator {
    pub fn new(store: Arc<VersionedStore>, config: Arc<ClusterConfig>) -> Self {
        Self {
            store,
            config,
            client: PeerClient::new(),
        }
    }

    /// Coordinates a client write: local apply, fan-out, quorum accounting.
    ///
    /// Returns the definitive version assigned by the local apply. On a
    /// quorum failure the local apply and any peer applies stand; there is
    /// no rollback, so the coordinator may keep serving a value that never
    /// fully replicated.
    pub async fn write(&self, key: &str, value: &str) -> Result<i64, KvError> {
        if self.config.mode() == TopologyMode::LeaderFollower && !self.config.is_leader() {
            return Err(KvError::NotLeader);
        }

        let version = self.store.set(key, value).await?;

        let peers = self.config.other_node_addrs();
        if peers.is_empty() {
            return Ok(version);
        }

        let (_, w) = self.config.replication_params().await;
        match ack_policy(w, self.config.n()) {
            AckPolicy::Async => {
                self.replicate_fire_and_forget(&peers, key, value, version);
                Ok(version)
            }
            AckPolicy::SyncAll => {
                self.replicate_and_await(&peers, key, value, version, self.config.n())
                    .await?;
                Ok(version)
            }
            AckPolicy::SyncQuorum(required) => {
                self.replicate_and_await(&peers, key, value, version, required)
                    .await?;
                Ok(version)
            }
        }
    }

    /// W=1 fan-out: peers are updated in the background, nothing is awaited.
    fn replicate_fire_and_forget(&self, peers: &[String], key: &str, value: &str, version: i64) {
        for (index, addr) in peers.iter().cloned().enumerate() {
            let client = self.client.clone();
            let key = key.to_string();
            let value = value.to_string();

            tokio::spawn(async move {
                match client
                    .replicate_write(&addr, &key, &value, version, index > 0)
                    .await
                {
                    Ok(ack) if !ack.success => {
                        tracing::warn!("Async replication to {} rejected: {:?}", addr, ack.error);
                    }
                    Err(e) => {
                        tracing::warn!("Async replication to {} failed: {}", addr, e);
                    }
                    Ok(_) => {}
                }
            });
        }
    }

    /// Dispatches replicate-writes to every peer and collects acks until
    /// `required` nodes (the coordinator included) have succeeded.
    ///
    /// Each task sends its outcome into a mailbox bounded at |peers|. Once the
    /// quorum is met the remaining in-flight calls keep running but no longer
    /// gate the response.
    async fn replicate_and_await(
        &self,
        peers: &[String],
        key: &str,
        value: &str,
        version: i64,
        required: usize,
    ) -> Result<(), KvError> {
        let (tx, mut rx) = mpsc::channel::<bool>(peers.len());

        for (index, addr) in peers.iter().cloned().enumerate() {
            let client = self.client.clone();
            let tx = tx.clone();
            let key = key.to_string();
            let value = value.to_string();

            tokio::spawn(async move {
                let ok = match client
                    .replicate_write(&addr, &key, &value, version, index > 0)
                    .await
                {
                    Ok(ack) => {
                        if !ack.success {
                            tracing::warn!("Replication to {} rejected: {:?}", addr, ack.error);
                        }
                        ack.success
                    }
                    Err(e) => {
                        tracing::warn!("Replication to {} failed: {}", addr, e);
                        false
                    }
                };
                let _ = tx.send(ok).await;
            });
        }
        drop(tx);

        let mut succeeded = 1; // The coordinator's local apply.
        let mut received = 0;
        while received < peers.len() {
            let Some(ok) = rx.recv().await else { break };
            received += 1;
            if ok {
                succeeded += 1;
            }
            if succeeded >= required {
                return Ok(());
            }
        }

        tracing::error!(
            "Write quorum not met for version {}: {}/{}",
            version,
            succeeded,
            required
        );
        Err(KvError::QuorumFailure {
            succeeded,
            required,
        })
    }

    /// Coordinates a client read against the current R.
    ///
    /// R=1 answers from the local store with no network I/O. Larger R fans
    /// out to every node, stops as soon as R present replies are in (or all
    /// nodes answered), and returns the highest-versioned one.
    pub async fn read(&self, key: &str) -> Result<KeyValue, KvError> {
        let (r, _) = self.config.replication_params().await;
        if r <= 1 {
            return self.store.get(key).await.ok_or(KvError::NotFound);
        }

        let addrs = self.config.all_node_addrs();
        let needed = r.min(addrs.len());
        let (tx, mut rx) = mpsc::channel::<(usize, Option<KeyValue>)>(addrs.len());

        for (index, addr) in addrs.iter().cloned().enumerate() {
            let tx = tx.clone();
            let key = key.to_string();

            if addr == self.config.my_addr() {
                // Local fast path: no delay, no HTTP hop.
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    let _ = tx.send((index, store.get(&key).await)).await;
                });
            } else {
                let client = self.client.clone();
                tokio::spawn(async move {
                    let reply = match client.read_from_node(&addr, &key, true).await {
                        Ok(kv) => kv,
                        Err(e) => {
                            tracing::warn!("Read from {} failed: {}", addr, e);
                            None
                        }
                    };
                    let _ = tx.send((index, reply)).await;
                });
            }
        }
        drop(tx);

        let mut replies: Vec<(usize, KeyValue)> = Vec::new();
        let mut received = 0;
        while received < addrs.len() {
            let Some((index, reply)) = rx.recv().await else {
                break;
            };
            received += 1;
            if let Some(kv) = reply {
                replies.push((index, kv));
                if replies.len() >= needed {
                    break;
                }
            }
        }

        most_recent(replies).ok_or(KvError::NotFound)
    }
}

/// Picks the highest-versioned reply; version ties go to the node earliest in
/// cluster order, so repeated reads of a settled cluster are reproducible.
pub(super) fn most_recent(replies: Vec<(usize, KeyValue)>) -> Option<KeyValue> {
    let mut best: Option<(usize, KeyValue)> = None;
    for (index, kv) in replies {
        let better = match &best {
            Some((best_index, best_kv)) => {
                kv.version > best_kv.version
                    || (kv.version == best_kv.version && index < *best_index)
            }
            None => true,
        };
        if better {
            best = Some((index, kv));
        }
    }
    best.map(|(_, kv)| kv)
}
