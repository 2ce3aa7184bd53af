//! P2P Networking module
//!
//! Peer connection lifecycle and liveness protocol.
//!
//! # Features
//! - Channel registry with stable per-connection ids
//! - Periodic ping with timeout-based disconnection
//! - Version / genesis handshake
//! - Peer address list exchange
//! - Sync state negotiation
//! - TCP transport with length-prefixed framing

pub mod addrbook;
pub mod discovery;
pub mod dispatch;
pub mod handshake;
pub mod liveness;
pub mod management;
pub mod message;
pub mod node;
pub mod peer;
pub mod registry;
pub mod server;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use addrbook::{PeerBook, MAX_KNOWN_ADDRESSES};
pub use discovery::PeerDiscoveryHandler;
pub use dispatch::{route, Dispatch, Route};
pub use handshake::{HandshakeHandler, HandshakeOutcome};
pub use liveness::{
    CycleReport, LivenessEvent, LivenessHandle, LivenessMonitor, LivenessTable, Verdict,
};
pub use management::PeerManagement;
pub use message::{
    Message, MessageType, PeerListData, ProtocolError, SyncData, VersionData, MAGIC,
    MAX_MESSAGE_SIZE, SYNC_STATE_SYNCED,
};
pub use node::{Node, NodeError, NodeStatus};
pub use peer::{ChannelId, NodeContext, PeerChannel, PeerError};
pub use registry::ChannelRegistry;
pub use server::{connect_to_peer, MessageCodec, Server, TcpChannel, TcpPeerManagement};
pub use sync::{SyncNegotiator, SyncOutcome};
