//! Cluster Topology Module
//!
//! Static cluster configuration for a fixed set of N peers. There is no
//! discovery and no failure detection: the full address list is handed to
//! every node at startup and stays fixed for the process lifetime.
//!
//! ## Core Concepts
//! - **Topology**: Either leader-follower (exactly one statically configured
//!   leader accepts writes) or leaderless (any node coordinates the writes it
//!   receives).
//! - **Quorums**: The read quorum R and write quorum W are the only mutable
//!   fields. In leader-follower mode they can be retuned at runtime through
//!   the `/config` endpoint; leaderless mode pins R=1, W=N.

pub mod config;
