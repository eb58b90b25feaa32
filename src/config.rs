use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::raft::{NodeId, RaftConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid peer spec '{0}', expected id=host:port")]
    InvalidPeer(String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),
}

/// Settings for one node process, loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node_id: NodeId,
    pub address: String,
    pub peers: Vec<PeerConfig>,
    pub heartbeat_interval_ms: u64,
    pub election_timeout_min_ms: u64,
    pub election_timeout_max_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: NodeId,
    pub address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: "node1".to_string(),
            address: "127.0.0.1:8001".to_string(),
            peers: vec![],
            heartbeat_interval_ms: 50,
            election_timeout_min_ms: 150,
            election_timeout_max_ms: 300,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Parses `id=host:port,id=host:port` into peer entries.
    pub fn parse_peers(spec: &str) -> Result<Vec<PeerConfig>, ConfigError> {
        spec.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((id, address)) if !id.is_empty() && !address.is_empty() => Ok(PeerConfig {
                    id: id.trim().to_string(),
                    address: address.trim().to_string(),
                }),
                _ => Err(ConfigError::InvalidPeer(part.to_string())),
            })
            .collect()
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidAddress(self.address.clone()))
    }

    /// Peer id → socket address, excluding this node.
    pub fn peer_addresses(&self) -> Result<HashMap<NodeId, SocketAddr>, ConfigError> {
        self.peers
            .iter()
            .filter(|peer| peer.id != self.node_id)
            .map(|peer| {
                let addr = peer
                    .address
                    .parse::<SocketAddr>()
                    .map_err(|_| ConfigError::InvalidAddress(peer.address.clone()))?;
                Ok((peer.id.clone(), addr))
            })
            .collect()
    }

    pub fn raft_config(&self) -> RaftConfig {
        RaftConfig::new(&self.node_id)
            .with_peers(self.peers.iter().map(|peer| peer.id.as_str()))
            .with_timing(
                self.heartbeat_interval_ms,
                self.election_timeout_min_ms,
                self.election_timeout_max_ms,
            )
    }
}
