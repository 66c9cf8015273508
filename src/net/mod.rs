//! Peer replication
//!
//! - `wire`: fixed-size frame codec
//! - `transport`: frame delivery (in-process channels, TCP)
//! - `sync`: roles, connection lifecycle, roster and stale-update filtering

pub mod sync;
pub mod transport;
pub mod wire;

pub use sync::{ConnectionState, NetworkSync, Role, RosterEntry, SyncStats};
pub use transport::{ChannelTransport, PeerId, TcpTransport, Transport, TransportEvent, link};
pub use wire::{FRAME_LEN, MessageType, NetworkMessage, PROTOCOL_VERSION};
