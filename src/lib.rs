//! A single-leader replicated key/value node.
//!
//! Nodes in a fixed cluster elect a leader with randomized election
//! timeouts, keep it in place with heartbeats, and copy client writes from
//! the leader to every follower on a best-effort basis.

pub mod config;
pub mod network;
pub mod raft;

// Public exports
pub use config::Config;
pub use network::{MemoryNetwork, Transport, UdpTransport};
pub use raft::{Accepted, NodeRole, NodeStatus, Raft, RaftConfig, RaftError, RaftNode};
