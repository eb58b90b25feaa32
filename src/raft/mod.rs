mod config;
mod election;
mod error;
mod message;
mod node;
mod replication;
mod state;
mod timer;

pub use self::config::RaftConfig;
pub use self::election::{has_quorum, VoteTally};
pub use self::error::RaftError;
pub use self::message::{Message, MessageKind, NodeId, Outbound, Term};
pub use self::node::RaftNode;
pub use self::replication::{Accepted, ReplicatedState};
pub use self::state::{NodeRole, NodeState, NodeStatus};
pub use self::timer::ElectionTimer;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::network::Transport;

/// Requests from API callers, serialized with ticks and inbound messages.
enum Request {
    Submit {
        key: String,
        value: String,
        reply: oneshot::Sender<Result<Accepted, RaftError>>,
    },
    State {
        reply: oneshot::Sender<HashMap<String, String>>,
    },
    Status {
        reply: oneshot::Sender<NodeStatus>,
    },
}

/// Handle to a running node.
///
/// The node's [`RaftNode`] is owned by a single driver task; timer ticks,
/// inbound messages and API requests are all processed one at a time in
/// that task. Outbound messages go through a bounded queue to a separate
/// worker so a slow transport never delays timeout detection.
///
/// Dropping the handle stops the node.
pub struct Raft {
    node_id: NodeId,
    requests: mpsc::Sender<Request>,
    driver: JoinHandle<()>,
    outbound: JoinHandle<()>,
}

impl Raft {
    /// Validates `config` and spawns the node's tasks on the current tokio
    /// runtime. `inbound` yields every message the transport receives for
    /// this node.
    pub fn start(
        config: RaftConfig,
        transport: Arc<dyn Transport>,
        inbound: mpsc::Receiver<Message>,
    ) -> Result<Self, RaftError> {
        config.validate()?;

        let timer = ElectionTimer::from_config(&config);
        let node = RaftNode::new(config.clone(), timer, Instant::now());

        let (outbox_tx, outbox_rx) = mpsc::channel(config.outbound_queue_capacity);
        let (requests_tx, requests_rx) = mpsc::channel(64);

        let outbound = tokio::spawn(run_outbound_worker(outbox_rx, transport));
        let driver = tokio::spawn(drive(
            node,
            inbound,
            requests_rx,
            outbox_tx,
            config.tick_interval(),
        ));

        info!(
            "Node {} started with peers {:?} (heartbeat {}ms, election timeout {}..={}ms)",
            config.node_id,
            config.peers,
            config.heartbeat_interval,
            config.election_timeout_min,
            config.election_timeout_max
        );

        Ok(Self {
            node_id: config.node_id,
            requests: requests_tx,
            driver,
            outbound,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Submits `key = value`. Only the leader accepts; other nodes answer
    /// with [`RaftError::NotLeader`] naming the leader they know of.
    pub async fn submit_command(&self, key: &str, value: &str) -> Result<Accepted, RaftError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Submit {
            key: key.to_string(),
            value: value.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RaftError::NotRunning)?
    }

    /// Snapshot of the replicated key/value map.
    pub async fn get_state(&self) -> Result<HashMap<String, String>, RaftError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::State { reply }).await?;
        rx.await.map_err(|_| RaftError::NotRunning)
    }

    pub async fn status(&self) -> Result<NodeStatus, RaftError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Status { reply }).await?;
        rx.await.map_err(|_| RaftError::NotRunning)
    }

    /// Stops the node's tasks. Peers are not notified.
    pub fn shutdown(&self) {
        self.driver.abort();
        self.outbound.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.driver.is_finished()
    }

    async fn request(&self, request: Request) -> Result<(), RaftError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| RaftError::NotRunning)
    }
}

impl Drop for Raft {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn drive(
    mut node: RaftNode,
    mut inbound: mpsc::Receiver<Message>,
    mut requests: mpsc::Receiver<Request>,
    outbox: mpsc::Sender<Outbound>,
    tick_every: Duration,
) {
    let mut ticker = tokio::time::interval(tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut inbound_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => node.on_tick(Instant::now()),
            message = inbound.recv(), if inbound_open => match message {
                Some(message) => {
                    debug!(
                        "Node {} received {} from {} (term {})",
                        node.id(),
                        message.kind_name(),
                        message.sender_id,
                        message.term
                    );
                    node.handle_message(message, Instant::now());
                }
                None => {
                    warn!("Node {} inbound stream closed", node.id());
                    inbound_open = false;
                }
            },
            request = requests.recv() => match request {
                Some(request) => handle_request(&mut node, request),
                None => break,
            },
        }

        flush_outbox(&mut node, &outbox);
    }

    debug!("Node {} driver stopped", node.id());
}

fn handle_request(node: &mut RaftNode, request: Request) {
    // A dropped receiver means the caller gave up waiting; nothing to do.
    match request {
        Request::Submit { key, value, reply } => {
            let _ = reply.send(node.submit_command(&key, &value));
        }
        Request::State { reply } => {
            let _ = reply.send(node.get_state());
        }
        Request::Status { reply } => {
            let _ = reply.send(node.status());
        }
    }
}

/// Hands queued messages to the outbound worker without waiting.
fn flush_outbox(node: &mut RaftNode, outbox: &mpsc::Sender<Outbound>) {
    for out in node.drain_outbox() {
        match outbox.try_send(out) {
            Ok(()) => {}
            Err(TrySendError::Full(out)) => warn!(
                "Node {} outbound queue full, dropping {}",
                node.id(),
                out.message().kind_name()
            ),
            Err(TrySendError::Closed(_)) => {
                debug!("Node {} outbound worker gone", node.id());
                return;
            }
        }
    }
}

async fn run_outbound_worker(mut outbox: mpsc::Receiver<Outbound>, transport: Arc<dyn Transport>) {
    while let Some(out) = outbox.recv().await {
        let result = match out {
            Outbound::Send { to, message } => transport.send(&to, message).await,
            Outbound::Broadcast(message) => transport.broadcast(message).await,
        };
        if let Err(e) = result {
            debug!("Failed to deliver message: {e}");
        }
    }
}
