//! HTTP Server Module
//!
//! The node's wire surface. Handlers translate external client requests and
//! inbound peer messages into coordinator and store calls, enforce role
//! constraints (leader-only writes under leader-follower), and map the core
//! error taxonomy onto HTTP status codes.
//!
//! The router is assembled once in `app` and shared by all three node
//! binaries; the only per-mode difference is that `/config` exists solely in
//! leader-follower mode.

pub mod app;
pub mod handlers;
pub mod protocol;

#[cfg(test)]
mod tests;
