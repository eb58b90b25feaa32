//! Candidacy lifecycle: self-nomination, vote counting and the win check.
//!
//! The quorum rule is strict majority over the static cluster size
//! (`votes * 2 > cluster_size`). With strict `>` two candidates can never
//! both reach quorum in the same term, even in even-sized clusters.

use std::collections::HashSet;
use std::time::Instant;

use log::{debug, info};

use super::{Message, NodeId, NodeRole, RaftError, RaftNode};

/// Returns true when `votes` is a strict majority of `cluster_size`.
pub fn has_quorum(votes: usize, cluster_size: usize) -> bool {
    votes * 2 > cluster_size
}

/// Votes collected during one candidacy.
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    votes: HashSet<NodeId>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the tally and records the candidate's own vote.
    pub fn restart(&mut self, candidate_id: &str) {
        self.votes.clear();
        self.votes.insert(candidate_id.to_string());
    }

    /// Records a granted vote. Returns false if the voter was already counted.
    pub fn record(&mut self, voter_id: &str) -> bool {
        self.votes.insert(voter_id.to_string())
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }

    pub fn count(&self) -> usize {
        self.votes.len()
    }

    pub fn voters(&self) -> impl Iterator<Item = &NodeId> {
        self.votes.iter()
    }
}

impl RaftNode {
    /// Starts a new candidacy: bumps the term, votes for itself and asks
    /// every peer for a vote. Replies arrive later through `handle_message`.
    pub fn start_candidacy(&mut self, now: Instant) -> Result<(), RaftError> {
        if self.is_leader() {
            return Err(RaftError::AlreadyLeader {
                term: self.state.current_term,
            });
        }

        self.state.current_term += 1;
        self.state.role = NodeRole::Candidate;
        self.state.voted_for = Some(self.id.clone());
        self.state.leader_id = None;
        self.votes.restart(&self.id);
        self.restart_election_timer(now);

        info!(
            "Node {} starting election for term {} (timeout {:?})",
            self.id, self.state.current_term, self.election_timeout
        );

        self.broadcast(Message::vote_request(self.state.current_term, &self.id));

        // A single-node cluster wins on its own vote.
        if self.evaluate_quorum() {
            self.become_leader(now);
        }

        Ok(())
    }

    /// Whether the current candidacy holds a strict majority.
    pub fn evaluate_quorum(&self) -> bool {
        has_quorum(self.votes.count(), self.config.cluster_size())
    }

    pub(super) fn handle_vote_request(&mut self, candidate_id: NodeId, now: Instant) {
        let granted = match self.state.voted_for.as_deref() {
            None => true,
            Some(existing) => existing == candidate_id,
        };

        if granted {
            self.state.voted_for = Some(candidate_id.clone());
            // Voting restarts the election window.
            self.last_heartbeat_at = now;
            info!(
                "Node {} granted vote to {} for term {}",
                self.id, candidate_id, self.state.current_term
            );
        } else {
            debug!(
                "Node {} denied vote to {} for term {} (already voted for {:?})",
                self.id,
                candidate_id,
                self.state.current_term,
                self.state.voted_for
            );
        }

        let reply = Message::vote_response(self.state.current_term, &self.id, granted);
        self.send(&candidate_id, reply);
    }

    pub(super) fn handle_vote_response(&mut self, voter_id: NodeId, granted: bool, now: Instant) {
        if self.state.role == NodeRole::Follower || !granted {
            return;
        }

        // Votes arriving after the win are still tallied for this term.
        let counted = self.votes.record(&voter_id);
        if counted && self.state.role == NodeRole::Candidate && self.evaluate_quorum() {
            self.become_leader(now);
        }
    }

    fn become_leader(&mut self, now: Instant) {
        if self.state.role != NodeRole::Candidate {
            return;
        }

        info!(
            "Node {} becoming leader for term {} with votes from {:?}",
            self.id,
            self.state.current_term,
            self.votes.voters().collect::<Vec<_>>()
        );

        self.state.role = NodeRole::Leader;
        self.state.leader_id = Some(self.id.clone());
        self.last_heartbeat_at = now;
        self.last_heartbeat_sent = Some(now);

        self.broadcast(Message::leader_announce(self.state.current_term, &self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raft::{ElectionTimer, MessageKind, Outbound, RaftConfig};

    fn node(id: &str, peers: &[&str]) -> (RaftNode, Instant) {
        let now = Instant::now();
        let cfg = RaftConfig::new(id).with_peers(peers.iter().copied());
        let timer = ElectionTimer::seeded(150, 300, 1);
        (RaftNode::new(cfg, timer, now), now)
    }

    #[test]
    fn quorum_is_strict_majority() {
        assert!(has_quorum(1, 1));
        assert!(!has_quorum(1, 2));
        assert!(has_quorum(2, 3));
        assert!(!has_quorum(2, 4));
        assert!(has_quorum(3, 4));
        assert!(has_quorum(3, 5));
        assert!(!has_quorum(2, 5));
    }

    #[test]
    fn tally_counts_each_voter_once() {
        let mut tally = VoteTally::new();
        tally.restart("n1");
        assert!(tally.record("n2"));
        assert!(!tally.record("n2"));
        assert_eq!(tally.count(), 2);
        assert!(tally.voters().any(|v| v == "n1"));

        tally.restart("n1");
        assert_eq!(tally.count(), 1);
    }

    #[test]
    fn start_candidacy_bumps_term_and_requests_votes() {
        let (mut node, now) = node("n1", &["n2", "n3"]);

        node.start_candidacy(now).expect("start_candidacy");

        assert_eq!(node.state().role, NodeRole::Candidate);
        assert_eq!(node.state().current_term, 1);
        assert_eq!(node.state().voted_for.as_deref(), Some("n1"));
        assert_eq!(node.votes_received().count(), 1);

        let outbox = node.drain_outbox();
        assert_eq!(
            outbox,
            vec![Outbound::Broadcast(Message::vote_request(1, "n1"))]
        );
    }

    #[test]
    fn single_node_cluster_wins_immediately() {
        let (mut node, now) = node("solo", &[]);

        node.start_candidacy(now).expect("start_candidacy");

        assert!(node.is_leader());
        assert_eq!(node.state().leader_id.as_deref(), Some("solo"));
        let kinds: Vec<_> = node
            .drain_outbox()
            .into_iter()
            .map(|o| o.message().kind.clone())
            .collect();
        assert_eq!(kinds.last(), Some(&MessageKind::LeaderAnnounce));
    }

    #[test]
    fn start_candidacy_refused_while_leader() {
        let (mut node, now) = node("solo", &[]);
        node.start_candidacy(now).expect("first candidacy");

        let err = node.start_candidacy(now).unwrap_err();
        assert!(matches!(err, RaftError::AlreadyLeader { term: 1 }));
        assert_eq!(node.state().current_term, 1);
    }

    #[test]
    fn even_cluster_needs_more_than_half() {
        let (mut node, now) = node("n1", &["n2", "n3", "n4"]);
        node.start_candidacy(now).expect("start_candidacy");

        node.handle_message(Message::vote_response(1, "n2", true), now);
        assert_eq!(node.state().role, NodeRole::Candidate);

        node.handle_message(Message::vote_response(1, "n3", true), now);
        assert!(node.is_leader());
    }
}
