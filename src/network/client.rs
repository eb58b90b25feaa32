use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

use super::codec;
use super::TransportError;
use crate::raft::Message;

/// Sender id used for commands that come from outside the cluster.
pub const CLIENT_ID: &str = "client";

/// Fires a `ClientCommand` datagram at `target`.
///
/// Delivery is not confirmed: a node that is not the leader ignores the
/// command, and the datagram itself may be lost.
pub async fn send_command(
    target: SocketAddr,
    key: &str,
    value: &str,
) -> Result<(), TransportError> {
    let local = if target.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };

    let socket = UdpSocket::bind(local).await?;
    let bytes = codec::encode(&Message::client_command(CLIENT_ID, key, value))?;
    socket.send_to(&bytes, target).await?;
    Ok(())
}
