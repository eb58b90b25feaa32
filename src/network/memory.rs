use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{Transport, TransportError};
use crate::raft::{Message, NodeId};

const MAILBOX_CAPACITY: usize = 1024;

#[derive(Default)]
struct Registry {
    mailboxes: HashMap<NodeId, mpsc::Sender<Message>>,
    isolated: HashSet<NodeId>,
}

/// In-process message hub connecting several nodes.
///
/// Delivery has datagram semantics: traffic to or from an isolated node,
/// or into a full mailbox, is dropped without error.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    registry: Arc<Mutex<Registry>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node_id` to the hub. Returns the node's transport and the
    /// receiver for messages addressed to it.
    pub fn register<I, S>(
        &self,
        node_id: &str,
        peers: I,
    ) -> (MemoryTransport, mpsc::Receiver<Message>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        self.lock().mailboxes.insert(node_id.to_string(), tx);

        let peers = peers
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| p != node_id)
            .collect();

        let transport = MemoryTransport {
            node_id: node_id.to_string(),
            peers,
            network: self.clone(),
        };
        (transport, rx)
    }

    /// Cuts `node_id` off from every other node.
    pub fn isolate(&self, node_id: &str) {
        self.lock().isolated.insert(node_id.to_string());
    }

    pub fn heal(&self, node_id: &str) {
        self.lock().isolated.remove(node_id);
    }

    pub fn is_isolated(&self, node_id: &str) -> bool {
        self.lock().isolated.contains(node_id)
    }

    /// Delivers `message` from `from` to `to`. Also used to inject client
    /// traffic that does not originate from a registered node.
    pub fn deliver(&self, from: &str, to: &str, message: Message) -> Result<(), TransportError> {
        let mailbox = {
            let registry = self.lock();
            if registry.isolated.contains(from) || registry.isolated.contains(to) {
                debug!("Dropping {} from {from} to {to}: partitioned", message.kind_name());
                return Ok(());
            }
            registry
                .mailboxes
                .get(to)
                .cloned()
                .ok_or_else(|| TransportError::UnknownPeer(to.to_string()))?
        };

        match mailbox.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                debug!("Dropping {} from {from} to {to}: mailbox full", message.kind_name());
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(TransportError::Unreachable(to.to_string())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A node's endpoint on a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryTransport {
    node_id: NodeId,
    peers: Vec<NodeId>,
    network: MemoryNetwork,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, peer: &str, message: Message) -> Result<(), TransportError> {
        self.network.deliver(&self.node_id, peer, message)
    }

    fn peers(&self) -> Vec<NodeId> {
        self.peers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_reaches_registered_peer() {
        let net = MemoryNetwork::new();
        let (a, _rx_a) = net.register("a", ["a", "b"]);
        let (_b, mut rx_b) = net.register("b", ["a", "b"]);

        assert_eq!(a.peers(), vec!["b".to_string()]);
        a.send("b", Message::heartbeat(1, "a")).await.expect("send");

        assert_eq!(rx_b.recv().await, Some(Message::heartbeat(1, "a")));
    }

    #[tokio::test]
    async fn broadcast_skips_self_and_reaches_all_peers() {
        let net = MemoryNetwork::new();
        let ids = ["a", "b", "c"];
        let (a, mut rx_a) = net.register("a", ids);
        let (_b, mut rx_b) = net.register("b", ids);
        let (_c, mut rx_c) = net.register("c", ids);

        a.broadcast(Message::vote_request(2, "a")).await.expect("broadcast");

        assert!(rx_b.recv().await.is_some());
        assert!(rx_c.recv().await.is_some());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn isolated_node_neither_sends_nor_receives() {
        let net = MemoryNetwork::new();
        let (a, _rx_a) = net.register("a", ["b"]);
        let (b, mut rx_b) = net.register("b", ["a"]);

        net.isolate("a");
        a.send("b", Message::heartbeat(1, "a")).await.expect("dropped silently");
        assert!(rx_b.try_recv().is_err());
        assert!(net.is_isolated("a"));

        net.heal("a");
        a.send("b", Message::heartbeat(1, "a")).await.expect("send");
        assert!(rx_b.recv().await.is_some());

        b.send("a", Message::heartbeat(1, "b")).await.expect("send back");
    }

    #[tokio::test]
    async fn unknown_peer_is_an_error() {
        let net = MemoryNetwork::new();
        let (a, _rx) = net.register("a", ["ghost"]);
        let err = a.send("ghost", Message::heartbeat(1, "a")).await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownPeer(p) if p == "ghost"));
    }
}
