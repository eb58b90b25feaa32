use async_trait::async_trait;
use log::debug;

use super::TransportError;
use crate::raft::{Message, NodeId};

/// Best-effort delivery of messages to other cluster members.
///
/// Implementations may drop messages silently; the consensus layer never
/// waits for delivery. Inbound messages are handed out separately as a
/// `tokio::sync::mpsc::Receiver<Message>` when the transport is created.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `message` to one peer.
    async fn send(&self, peer: &str, message: Message) -> Result<(), TransportError>;

    /// All members except the local node.
    fn peers(&self) -> Vec<NodeId>;

    /// Sends `message` to every peer. Per-peer failures are logged, not
    /// returned.
    async fn broadcast(&self, message: Message) -> Result<(), TransportError> {
        for peer in self.peers() {
            if let Err(e) = self.send(&peer, message.clone()).await {
                debug!("Broadcast of {} to {peer} failed: {e}", message.kind_name());
            }
        }
        Ok(())
    }
}
