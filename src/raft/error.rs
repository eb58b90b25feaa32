use thiserror::Error;

use super::{NodeId, Term};

#[derive(Error, Debug)]
pub enum RaftError {
    #[error("Not a leader (known leader: {})", leader_id.as_deref().unwrap_or("none"))]
    NotLeader { leader_id: Option<NodeId> },

    #[error("Already leader for term {term}")]
    AlreadyLeader { term: Term },

    #[error("Node is not running")]
    NotRunning,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_leader_names_known_leader() {
        let err = RaftError::NotLeader {
            leader_id: Some("n2".to_string()),
        };
        assert_eq!(err.to_string(), "Not a leader (known leader: n2)");

        let err = RaftError::NotLeader { leader_id: None };
        assert!(err.to_string().contains("none"));
    }
}
