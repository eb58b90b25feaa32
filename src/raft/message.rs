use serde::{Deserialize, Serialize};

/// Identifier of a cluster member.
pub type NodeId = String;

/// Logical election epoch.
pub type Term = u64;

/// Payload of a [`Message`], tagged on the wire by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    Heartbeat,
    VoteRequest {
        #[serde(rename = "candidateId")]
        candidate_id: NodeId,
    },
    VoteResponse {
        granted: bool,
    },
    LeaderAnnounce,
    ClientCommand {
        key: String,
        value: String,
    },
    ReplicateEntry {
        key: String,
        value: String,
    },
}

/// A message exchanged between nodes (or sent by a client to a node).
///
/// On the wire this is a flat object:
/// `{"kind": "...", "term": 3, "senderId": "n1", "key": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub term: Term,
    pub sender_id: NodeId,
    #[serde(flatten)]
    pub kind: MessageKind,
}

impl Message {
    pub fn heartbeat(term: Term, leader_id: &str) -> Self {
        Self::new(term, leader_id, MessageKind::Heartbeat)
    }

    pub fn leader_announce(term: Term, leader_id: &str) -> Self {
        Self::new(term, leader_id, MessageKind::LeaderAnnounce)
    }

    pub fn vote_request(term: Term, candidate_id: &str) -> Self {
        Self::new(
            term,
            candidate_id,
            MessageKind::VoteRequest {
                candidate_id: candidate_id.to_string(),
            },
        )
    }

    pub fn vote_response(term: Term, voter_id: &str, granted: bool) -> Self {
        Self::new(term, voter_id, MessageKind::VoteResponse { granted })
    }

    /// Clients are not cluster members and do not track terms; the term
    /// of a client command is ignored by the receiving node.
    pub fn client_command(sender_id: &str, key: &str, value: &str) -> Self {
        Self::new(
            0,
            sender_id,
            MessageKind::ClientCommand {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    pub fn replicate_entry(term: Term, leader_id: &str, key: &str, value: &str) -> Self {
        Self::new(
            term,
            leader_id,
            MessageKind::ReplicateEntry {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    fn new(term: Term, sender_id: &str, kind: MessageKind) -> Self {
        Self {
            term,
            sender_id: sender_id.to_string(),
            kind,
        }
    }

    /// Short name of the message kind, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::VoteRequest { .. } => "vote_request",
            MessageKind::VoteResponse { .. } => "vote_response",
            MessageKind::LeaderAnnounce => "leader_announce",
            MessageKind::ClientCommand { .. } => "client_command",
            MessageKind::ReplicateEntry { .. } => "replicate_entry",
        }
    }
}

/// A message the state machine wants delivered once the current handler
/// has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Send { to: NodeId, message: Message },
    Broadcast(Message),
}

impl Outbound {
    pub fn message(&self) -> &Message {
        match self {
            Outbound::Send { message, .. } => message,
            Outbound::Broadcast(message) => message,
        }
    }
}
