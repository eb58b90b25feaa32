use std::collections::HashSet;
use std::time::Duration;

use super::{NodeId, RaftError};

#[derive(Debug, Clone)]
pub struct RaftConfig {
    pub node_id: NodeId,
    pub peers: Vec<NodeId>,             // other members, never self
    pub election_timeout_min: u64,      // in milliseconds
    pub election_timeout_max: u64,      // in milliseconds
    pub heartbeat_interval: u64,        // in milliseconds
    pub outbound_queue_capacity: usize, // messages awaiting the transport
    pub rng_seed: Option<u64>,          // fixed seed for reproducible timeouts
}

impl RaftConfig {
    pub fn new(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            peers: Vec::new(),
            election_timeout_min: 150,
            election_timeout_max: 300,
            heartbeat_interval: 50,
            outbound_queue_capacity: 1024,
            rng_seed: None,
        }
    }

    pub fn add_peer(&mut self, peer_id: &str) {
        if peer_id != self.node_id && !self.peers.iter().any(|p| p == peer_id) {
            self.peers.push(peer_id.to_string());
        }
    }

    pub fn with_peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            self.add_peer(peer.as_ref());
        }
        self
    }

    pub fn with_timing(mut self, heartbeat: u64, election_min: u64, election_max: u64) -> Self {
        self.heartbeat_interval = heartbeat;
        self.election_timeout_min = election_min;
        self.election_timeout_max = election_max;
        self
    }

    /// Number of members including this node.
    pub fn cluster_size(&self) -> usize {
        self.peers.len() + 1
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    /// How often the driver loop wakes up to evaluate timers.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis((self.heartbeat_interval / 2).max(1))
    }

    pub fn validate(&self) -> Result<(), RaftError> {
        if self.node_id.is_empty() {
            return Err(RaftError::InvalidConfig("node id must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for peer in &self.peers {
            if peer == &self.node_id {
                return Err(RaftError::InvalidConfig(format!(
                    "peer list must not contain this node ({peer})"
                )));
            }
            if !seen.insert(peer) {
                return Err(RaftError::InvalidConfig(format!("duplicate peer: {peer}")));
            }
        }

        if self.heartbeat_interval == 0 {
            return Err(RaftError::InvalidConfig(
                "heartbeat interval must be positive".into(),
            ));
        }
        if self.election_timeout_min > self.election_timeout_max {
            return Err(RaftError::InvalidConfig(format!(
                "election timeout range is empty ({}..={})",
                self.election_timeout_min, self.election_timeout_max
            )));
        }
        if self.heartbeat_interval >= self.election_timeout_min {
            return Err(RaftError::InvalidConfig(format!(
                "heartbeat interval ({}ms) must be below the minimum election timeout ({}ms)",
                self.heartbeat_interval, self.election_timeout_min
            )));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(RaftError::InvalidConfig(
                "outbound queue capacity must be positive".into(),
            ));
        }

        Ok(())
    }
}
