//! Versioned Store Module
//!
//! The per-node state layer: an in-memory key-value map with a node-local
//! monotone version counter.
//!
//! ## Core Concepts
//! - **Versioning**: Every local write gets the next counter value. Inbound
//!   replicas adopt the coordinator's version and raise the counter to it, so
//!   a node never assigns a version lower than one it has observed.
//! - **Locking**: A read/write lock guards the (map, counter) pair. Writes
//!   are exclusive; reads are shared and always see a complete triple.
//! - **Isolation**: Readers get copies. Nothing hands out references into the
//!   map.

pub mod memory;
