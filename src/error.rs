//! Core error taxonomy.
//!
//! Typed errors for the store, cluster config, and replication coordinator.
//! The HTTP handlers map these onto status codes; peer transport failures are
//! absorbed by the coordinator as missing acknowledgments and never surface
//! here individually.

/// Errors produced by the core (store, config, coordinator).
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("key cannot be empty")]
    EmptyKey,

    #[error("only leader accepts write requests")]
    NotLeader,

    #[error("key not found")]
    NotFound,

    #[error("failed to achieve write quorum: {succeeded}/{required} succeeded")]
    QuorumFailure { succeeded: usize, required: usize },

    #[error("R and W must be between 1 and {n}")]
    InvalidQuorum { n: usize },
}
