//! P2P Node implementation
//!
//! The node that owns the listener, the peer book and the peer management
//! core, and runs one task per connection.

use crate::config::{ConfigError, NodeConfig};
use crate::network::addrbook::PeerBook;
use crate::network::management::PeerManagement;
use crate::network::peer::PeerError;
use crate::network::server::{connect_to_peer, handle_connection, Server, TcpPeerManagement};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Node startup errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),
}

/// The main P2P node
pub struct Node {
    pub config: NodeConfig,
    pub peer_book: Arc<PeerBook>,
    core: Arc<TcpPeerManagement>,
    shutdown_tx: watch::Sender<bool>,
}

impl Node {
    /// Create a node and start its liveness timer
    pub async fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;

        let peer_book = Arc::new(PeerBook::new(own_addr(&config)));
        peer_book
            .add_addresses(config.bootstrap_peers.iter().cloned())
            .await;

        let core = Arc::new(PeerManagement::start(&config, Arc::clone(&peer_book)));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            peer_book,
            core,
            shutdown_tx,
        })
    }

    pub fn core(&self) -> &Arc<TcpPeerManagement> {
        &self.core
    }

    /// Bind the configured port and run until `shutdown`
    pub async fn start(&self) -> Result<(), NodeError> {
        let server = Server::bind(self.config.listen_port).await?;
        self.run(server).await
    }

    /// Accept connections on `server` until `shutdown`
    pub async fn run(&self, server: Server) -> Result<(), NodeError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            self.core.shutdown().await;
            return Ok(());
        }

        log::info!("Node started on {}", server.local_addr()?);

        for peer_addr in &self.config.bootstrap_peers {
            if let Err(e) = self.connect_to(peer_addr).await {
                log::warn!("Failed to connect to bootstrap peer {}: {}", peer_addr, e);
            }
        }

        loop {
            tokio::select! {
                accepted = server.accept() => match accepted {
                    Ok((stream, addr)) => {
                        log::info!("Incoming connection from {}", addr);
                        self.spawn_connection(stream, addr, false);
                    }
                    Err(e) => {
                        log::error!("Accept error: {}", e);
                    }
                },
                _ = shutdown_rx.changed() => {
                    log::info!("Node shutting down...");
                    break;
                }
            }
        }

        self.core.shutdown().await;
        Ok(())
    }

    /// Connect to a peer
    pub async fn connect_to(&self, addr: &str) -> Result<(), PeerError> {
        log::info!("Connecting to peer: {}", addr);
        let (stream, peer_addr) = connect_to_peer(addr).await?;
        self.spawn_connection(stream, peer_addr, true);
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: tokio::net::TcpStream,
        addr: std::net::SocketAddr,
        outbound: bool,
    ) {
        let core = Arc::clone(&self.core);
        let own_addr = own_addr(&self.config);
        let port = self.config.listen_port;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, core, own_addr, port, outbound).await {
                log::warn!("Connection error with {}: {}", addr, e);
            }
        });
    }

    /// Update this node's own sync state
    pub fn set_synced(&self, synced: bool) {
        self.peer_book.set_synced(synced);
    }

    /// Get node status
    pub async fn status(&self) -> NodeStatus {
        NodeStatus {
            port: self.config.listen_port,
            peers: self.core.registry().len().await,
            known_addresses: self.peer_book.known_count().await,
            synced_peers: self.peer_book.synced_peer_count().await,
            liveness_running: self.core.is_running().await,
        }
    }

    /// Stop accepting connections, stop the liveness timer and close every
    /// peer connection. Works whether or not `run` was ever called.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.core.shutdown().await;
    }
}

fn own_addr(config: &NodeConfig) -> Option<String> {
    config
        .advertised_ip
        .as_ref()
        .map(|ip| format!("{}:{}", ip, config.listen_port))
}

/// Node status information
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub port: u16,
    pub peers: usize,
    pub known_addresses: usize,
    pub synced_peers: usize,
    pub liveness_running: bool,
}
