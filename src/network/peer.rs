//! Peer channel abstractions
//!
//! A `PeerChannel` is one live connection owned by the transport. The
//! peer management core only holds shared handles to it while the channel
//! is registered. `NodeContext` is the node-side collaborator that owns the
//! address book and per-peer sync flags.

use crate::network::message::Message;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Peer connection errors
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Peer disconnected")]
    Disconnected,
    #[error("Send queue full")]
    QueueFull,
}

/// Stable identifier issued to a channel when it is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One active peer connection.
///
/// `send` and `disconnect` are requests handed to the transport; neither
/// waits on network I/O.
pub trait PeerChannel: Send + Sync + 'static {
    /// Transport-assigned connection label, used in logs
    fn connection_id(&self) -> &str;

    /// Remote peer address
    fn peer_ip(&self) -> &str;

    /// Our own address as seen on this connection
    fn host_ip(&self) -> &str;

    /// Queue a message for delivery
    fn send(&self, message: Message) -> Result<(), PeerError>;

    /// Ask the transport to close the connection
    fn disconnect(&self);
}

/// Node-side state the peer protocol reports into
#[async_trait]
pub trait NodeContext: Send + Sync + 'static {
    /// Merge newly learned peer addresses into the address book
    async fn update_peer_addresses(&self, addrs: HashSet<String>);

    /// Record whether the peer on `channel` reports itself synced
    async fn set_peer_synced(&self, channel: ChannelId, synced: bool);

    /// Whether this node is synced with the chain head
    async fn synced(&self) -> bool;
}
