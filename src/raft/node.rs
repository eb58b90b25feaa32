use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::timer::{heartbeat_due, timeout_elapsed};
use super::{
    ElectionTimer, Message, MessageKind, NodeId, NodeRole, NodeState, NodeStatus, Outbound,
    RaftConfig, ReplicatedState, Term, VoteTally,
};

/// Timeout-driven consensus state machine for one cluster member.
///
/// `RaftNode` performs no I/O. Handlers mutate the state and queue
/// outgoing messages, which the owner collects with [`RaftNode::drain_outbox`]
/// once the handler has returned.
pub struct RaftNode {
    // Node identity
    pub(super) id: NodeId,
    pub(super) config: RaftConfig,

    // Raft state
    pub(super) state: NodeState,
    pub(super) store: ReplicatedState,

    // Election state
    pub(super) votes: VoteTally,
    pub(super) timer: ElectionTimer,
    pub(super) election_timeout: Duration,
    pub(super) last_heartbeat_at: Instant,

    // Leader state
    pub(super) last_heartbeat_sent: Option<Instant>,

    // Messages produced by the last handler(s)
    outbox: Vec<Outbound>,
}

impl RaftNode {
    pub fn new(config: RaftConfig, mut timer: ElectionTimer, now: Instant) -> Self {
        let election_timeout = timer.next_timeout();

        Self {
            id: config.node_id.clone(),
            config,
            state: NodeState::default(),
            store: ReplicatedState::new(),
            votes: VoteTally::new(),
            timer,
            election_timeout,
            last_heartbeat_at: now,
            last_heartbeat_sent: None,
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &RaftConfig {
        &self.config
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.state.role, NodeRole::Leader)
    }

    pub fn votes_received(&self) -> &VoteTally {
        &self.votes
    }

    pub fn election_timeout(&self) -> Duration {
        self.election_timeout
    }

    pub fn last_heartbeat_at(&self) -> Instant {
        self.last_heartbeat_at
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.id.clone(),
            term: self.state.current_term,
            role: self.state.role,
            leader_id: self.state.leader_id.clone(),
            voted_for: self.state.voted_for.clone(),
            entries: self.store.len(),
        }
    }

    /// Takes every message queued since the last call.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Timer wake-up: starts a candidacy once the election timeout has
    /// passed without word from a leader, or emits a heartbeat when leading.
    pub fn on_tick(&mut self, now: Instant) {
        match self.state.role {
            NodeRole::Leader => {
                if heartbeat_due(self.last_heartbeat_sent, now, self.config.heartbeat()) {
                    self.broadcast(Message::heartbeat(self.state.current_term, &self.id));
                    self.last_heartbeat_sent = Some(now);
                    self.last_heartbeat_at = now;
                }
            }
            NodeRole::Follower | NodeRole::Candidate => {
                if !timeout_elapsed(self.last_heartbeat_at, now, self.election_timeout) {
                    return;
                }
                if self.state.role == NodeRole::Candidate {
                    info!(
                        "Node {} got no majority in term {} ({} vote(s)), retrying",
                        self.id,
                        self.state.current_term,
                        self.votes.count()
                    );
                } else {
                    info!(
                        "Node {} heard no leader for {:?}, starting election",
                        self.id, self.election_timeout
                    );
                }
                if let Err(e) = self.start_candidacy(now) {
                    warn!("Node {} could not start candidacy: {}", self.id, e);
                }
            }
        }
    }

    /// Single entry point for every inbound message.
    pub fn handle_message(&mut self, message: Message, now: Instant) {
        let Message {
            term,
            sender_id,
            kind,
        } = message;

        if sender_id == self.id {
            return;
        }

        // Client commands come from outside the cluster and carry no term.
        let kind = match kind {
            MessageKind::ClientCommand { key, value } => {
                self.handle_client_command(sender_id, key, value);
                return;
            }
            other => other,
        };

        if !self.config.peers.contains(&sender_id) {
            warn!(
                "Node {} dropping message from unknown node {}",
                self.id, sender_id
            );
            return;
        }

        if term < self.state.current_term {
            debug!(
                "Node {} dropping stale message from {} (term {} < {})",
                self.id, sender_id, term, self.state.current_term
            );
            return;
        }

        if term > self.state.current_term {
            info!(
                "Node {} saw term {} from {}, stepping down from term {}",
                self.id, term, sender_id, self.state.current_term
            );
            self.step_down(term, now);
        }

        match kind {
            MessageKind::Heartbeat | MessageKind::LeaderAnnounce => {
                self.recognize_leader(&sender_id, now);
            }
            MessageKind::VoteRequest { candidate_id } => {
                if candidate_id != sender_id {
                    warn!(
                        "Node {} got vote request from {} on behalf of {}",
                        self.id, sender_id, candidate_id
                    );
                }
                self.handle_vote_request(sender_id, now);
            }
            MessageKind::VoteResponse { granted } => {
                self.handle_vote_response(sender_id, granted, now);
            }
            MessageKind::ReplicateEntry { key, value } => {
                self.handle_replicate_entry(sender_id, key, value, now);
            }
            MessageKind::ClientCommand { .. } => {}
        }
    }

    /// Adopts a strictly higher term and reverts to follower.
    fn step_down(&mut self, term: Term, now: Instant) {
        self.state.current_term = term;
        self.state.voted_for = None;
        self.state.leader_id = None;
        if self.state.role != NodeRole::Follower {
            info!("Node {} reverting to follower in term {}", self.id, term);
        }
        self.state.role = NodeRole::Follower;
        self.votes.clear();
        self.last_heartbeat_sent = None;
        self.restart_election_timer(now);
    }

    /// Accepts `sender` as leader of the current term if that is consistent
    /// with what this node already believes. Returns whether it did.
    pub(super) fn recognize_leader(&mut self, sender: &str, now: Instant) -> bool {
        match self.state.role {
            NodeRole::Leader => {
                warn!(
                    "Node {} is leader of term {} but {} also claims leadership",
                    self.id, self.state.current_term, sender
                );
                false
            }
            NodeRole::Candidate => {
                info!(
                    "Node {} abandoning candidacy, {} leads term {}",
                    self.id, sender, self.state.current_term
                );
                self.state.role = NodeRole::Follower;
                self.state.leader_id = Some(sender.to_string());
                self.votes.clear();
                self.restart_election_timer(now);
                true
            }
            NodeRole::Follower => match self.state.leader_id.as_deref() {
                Some(leader) if leader == sender => {
                    self.last_heartbeat_at = now;
                    true
                }
                Some(leader) => {
                    warn!(
                        "Node {} follows {} in term {} but {} also claims leadership",
                        self.id, leader, self.state.current_term, sender
                    );
                    false
                }
                None => {
                    info!(
                        "Node {} following {} in term {}",
                        self.id, sender, self.state.current_term
                    );
                    self.state.leader_id = Some(sender.to_string());
                    self.restart_election_timer(now);
                    true
                }
            },
        }
    }

    /// Resets the timeout base and draws a fresh randomized timeout.
    pub(super) fn restart_election_timer(&mut self, now: Instant) {
        self.last_heartbeat_at = now;
        self.election_timeout = self.timer.next_timeout();
    }

    pub(super) fn broadcast(&mut self, message: Message) {
        self.outbox.push(Outbound::Broadcast(message));
    }

    pub(super) fn send(&mut self, to: &str, message: Message) {
        self.outbox.push(Outbound::Send {
            to: to.to_string(),
            message,
        });
    }
}
