use std::collections::HashMap;
use std::time::Instant;

use log::{debug, info};

use super::{Message, NodeId, RaftError, RaftNode, Term};

/// The application-visible key/value map each node maintains.
#[derive(Debug, Clone, Default)]
pub struct ReplicatedState {
    entries: HashMap<String, String>,
}

impl ReplicatedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last writer wins. Returns the previous value, if any.
    pub fn apply(&mut self, key: &str, value: &str) -> Option<String> {
        self.entries.insert(key.to_string(), value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.clone()
    }
}

/// Acknowledgement that the leader applied a command locally and queued
/// its replication. It does not imply any follower has applied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub term: Term,
}

impl RaftNode {
    /// Applies `key = value` on the leader and broadcasts it to followers.
    ///
    /// Non-leaders reject the command with the last leader they know of so
    /// the caller can redirect.
    pub fn submit_command(&mut self, key: &str, value: &str) -> Result<Accepted, RaftError> {
        if !self.is_leader() {
            return Err(RaftError::NotLeader {
                leader_id: self.state.leader_id.clone(),
            });
        }

        self.store.apply(key, value);
        debug!(
            "Leader {} applied {}={} in term {}",
            self.id, key, value, self.state.current_term
        );

        self.broadcast(Message::replicate_entry(
            self.state.current_term,
            &self.id,
            key,
            value,
        ));

        Ok(Accepted {
            term: self.state.current_term,
        })
    }

    /// Snapshot of the replicated key/value map.
    pub fn get_state(&self) -> HashMap<String, String> {
        self.store.snapshot()
    }

    pub fn replicated_state(&self) -> &ReplicatedState {
        &self.store
    }

    pub(super) fn handle_client_command(&mut self, client_id: NodeId, key: String, value: String) {
        match self.submit_command(&key, &value) {
            Ok(accepted) => debug!(
                "Node {} accepted command {}={} from {} in term {}",
                self.id, key, value, client_id, accepted.term
            ),
            Err(e) => info!(
                "Node {} ignoring command {}={} from {}: {}",
                self.id, key, value, client_id, e
            ),
        }
    }

    pub(super) fn handle_replicate_entry(
        &mut self,
        leader_id: NodeId,
        key: String,
        value: String,
        now: Instant,
    ) {
        if !self.recognize_leader(&leader_id, now) {
            return;
        }

        let previous = self.store.apply(&key, &value);
        debug!(
            "Node {} replicated {}={} from leader {} (previous: {:?})",
            self.id, key, value, leader_id, previous
        );
    }
}
