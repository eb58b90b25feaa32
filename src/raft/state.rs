use std::fmt;

use serde::{Deserialize, Serialize};

use super::{NodeId, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRole::Follower => "follower",
            NodeRole::Candidate => "candidate",
            NodeRole::Leader => "leader",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub current_term: Term,
    pub voted_for: Option<NodeId>,
    pub role: NodeRole,
    pub leader_id: Option<NodeId>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            current_term: 0,
            voted_for: None,
            role: NodeRole::Follower,
            leader_id: None,
        }
    }
}

/// Point-in-time view of a node, as reported by `Raft::status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub term: Term,
    pub role: NodeRole,
    pub leader_id: Option<NodeId>,
    pub voted_for: Option<NodeId>,
    pub entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_follower_at_term_zero() {
        let state = NodeState::default();
        assert_eq!(state.current_term, 0);
        assert_eq!(state.role, NodeRole::Follower);
        assert!(state.voted_for.is_none());
        assert!(state.leader_id.is_none());
    }

    #[test]
    fn role_display_is_lowercase() {
        assert_eq!(NodeRole::Candidate.to_string(), "candidate");
    }
}
