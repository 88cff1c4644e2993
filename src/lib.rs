//! Distributed Key-Value Store Library
//!
//! This library crate defines the core modules that make up the replicated
//! key-value cluster. It serves as the foundation for the node binaries
//! (`leader_follower`, `leaderless`, `kv_service`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`store`**: The versioned in-memory state. A key-value map guarded by a
//!   read/write lock, with a node-local monotone version counter that orders
//!   writes on each node.
//! - **`cluster`**: The static cluster topology. Per-node identity, role,
//!   peer addresses, and the runtime-tunable read/write quorum sizes (R, W).
//! - **`replication`**: The replication coordinator and its quorum protocol.
//!   Executes write fan-out against the configured W and read fan-in against
//!   R, with the artificial inter-message delays that make the replication
//!   window observable.
//! - **`server`**: The HTTP surface. Translates external client requests and
//!   internal peer messages into coordinator and store calls.

pub mod cluster;
pub mod error;
pub mod replication;
pub mod server;
pub mod store;
