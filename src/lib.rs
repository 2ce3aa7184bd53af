//! Mini-P2P: peer connection lifecycle for a mini-blockchain node
//!
//! This crate provides the peer management layer of a P2P node:
//! - Channel registry for live peer connections
//! - Liveness cycle (periodic ping, timeout-based disconnect)
//! - Version / genesis handshake
//! - Peer address exchange for discovery
//! - Sync state negotiation
//! - A TCP transport and node that wire it all together
//!
//! # Example
//!
//! ```rust,no_run
//! use mini_p2p::{Node, NodeConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = NodeConfig {
//!     listen_port: 9000,
//!     bootstrap_peers: vec!["127.0.0.1:9001".to_string()],
//!     ..Default::default()
//! };
//!
//! let node = Node::new(config).await?;
//! node.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod network;

// Re-export commonly used types
pub use config::{ConfigError, NodeConfig};
pub use network::{
    ChannelId, ChannelRegistry, LivenessMonitor, Message, MessageType, Node, NodeContext,
    PeerBook, PeerChannel, PeerManagement,
};
