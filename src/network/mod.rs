//! Message delivery between nodes. The consensus core only depends on the
//! [`Transport`] trait; the in-memory and UDP implementations live here.

pub mod client;
pub mod codec;
mod error;
mod memory;
mod transport;
mod udp;

pub use self::client::send_command;
pub use self::error::TransportError;
pub use self::memory::{MemoryNetwork, MemoryTransport};
pub use self::transport::Transport;
pub use self::udp::UdpTransport;
