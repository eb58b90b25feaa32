use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::codec::{self, MAX_DATAGRAM_SIZE};
use super::{Transport, TransportError};
use crate::raft::{Message, NodeId};

const INBOUND_CAPACITY: usize = 1024;

/// UDP transport: one JSON-encoded message per datagram, addressed through
/// a static id → socket address book.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peers: HashMap<NodeId, SocketAddr>,
    receiver: JoinHandle<()>,
}

impl UdpTransport {
    /// Binds `addr` and starts the receive task. Returns the transport and
    /// the stream of decoded inbound messages.
    pub async fn bind(
        node_id: &str,
        addr: SocketAddr,
        peers: HashMap<NodeId, SocketAddr>,
    ) -> Result<(Self, mpsc::Receiver<Message>), TransportError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);

        let peers: HashMap<NodeId, SocketAddr> =
            peers.into_iter().filter(|(id, _)| id != node_id).collect();

        let receiver = tokio::spawn(receive_loop(
            node_id.to_string(),
            Arc::clone(&socket),
            peers.clone(),
            tx,
        ));

        Ok((
            Self {
                socket,
                peers,
                receiver,
            },
            rx,
        ))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, peer: &str, message: Message) -> Result<(), TransportError> {
        let addr = self
            .peers
            .get(peer)
            .ok_or_else(|| TransportError::UnknownPeer(peer.to_string()))?;
        let bytes = codec::encode(&message)?;
        self.socket.send_to(&bytes, addr).await?;
        Ok(())
    }

    fn peers(&self) -> Vec<NodeId> {
        self.peers.keys().cloned().collect()
    }
}

/// False when `message` claims to come from a peer in the address book but
/// arrived from a different address. Senders outside the book (clients)
/// always match.
fn sender_matches_source(
    peers: &HashMap<NodeId, SocketAddr>,
    message: &Message,
    from: SocketAddr,
) -> bool {
    peers
        .get(&message.sender_id)
        .map_or(true, |expected| *expected == from)
}

async fn receive_loop(
    node_id: NodeId,
    socket: Arc<UdpSocket>,
    peers: HashMap<NodeId, SocketAddr>,
    inbound: mpsc::Sender<Message>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                debug!("Node {node_id} receive error: {e}");
                continue;
            }
        };

        match codec::decode(&buf[..len]) {
            Ok(message) => {
                if !sender_matches_source(&peers, &message, from) {
                    warn!(
                        "Node {node_id} got {} claiming sender {} from unexpected address {from}",
                        message.kind_name(),
                        message.sender_id
                    );
                }
                if inbound.send(message).await.is_err() {
                    debug!("Node {node_id} inbound consumer gone, stopping receiver");
                    return;
                }
            }
            Err(e) => warn!("Node {node_id} dropping malformed datagram from {from}: {e}"),
        }
    }
}
