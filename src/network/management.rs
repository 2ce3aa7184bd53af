//! Peer management core
//!
//! Ties the channel registry, liveness monitor and protocol handlers
//! together. The transport registers each new connection here and feeds
//! every inbound message to `dispatch`.

use crate::config::NodeConfig;
use crate::network::discovery::PeerDiscoveryHandler;
use crate::network::dispatch::{route, Dispatch, Route};
use crate::network::handshake::HandshakeHandler;
use crate::network::liveness::{LivenessHandle, LivenessMonitor};
use crate::network::message::{validate_message, Message, MessageType, ProtocolError};
use crate::network::peer::{ChannelId, NodeContext, PeerChannel};
use crate::network::registry::ChannelRegistry;
use crate::network::sync::SyncNegotiator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Peer connection lifecycle and liveness protocol
pub struct PeerManagement<C, N: ?Sized> {
    registry: Arc<ChannelRegistry<C>>,
    liveness: LivenessHandle,
    handshake: HandshakeHandler,
    discovery: PeerDiscoveryHandler,
    sync: SyncNegotiator,
    context: Arc<N>,
    stopped: AtomicBool,
}

impl<C, N> PeerManagement<C, N>
where
    C: PeerChannel,
    N: NodeContext + ?Sized,
{
    /// Build the core and start its liveness timer. Must be called from
    /// within a tokio runtime.
    pub fn start(config: &NodeConfig, context: Arc<N>) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let liveness = LivenessMonitor::new(
            Arc::clone(&registry),
            config.ping_period(),
            config.ping_timeout(),
        )
        .spawn();

        Self {
            registry,
            liveness,
            handshake: HandshakeHandler::from_config(config),
            discovery: PeerDiscoveryHandler::new(config.peer_discovery_enabled),
            sync: SyncNegotiator::new(),
            context,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry<C>> {
        &self.registry
    }

    pub fn context(&self) -> &Arc<N> {
        &self.context
    }

    pub fn discovery_enabled(&self) -> bool {
        self.discovery.is_enabled()
    }

    /// Attach a freshly set up connection. After `shutdown` the channel is
    /// closed straight away.
    pub async fn new_channel(&self, channel: Arc<C>) -> ChannelId {
        let id = self.registry.register(Arc::clone(&channel)).await;
        log::info!(
            "New channel {} [{}] {} -> {}",
            id,
            channel.connection_id(),
            channel.host_ip(),
            channel.peer_ip()
        );

        if self.stopped.load(Ordering::SeqCst) {
            log::debug!("Shutting down, closing channel {}", id);
            channel.disconnect();
        }
        id
    }

    /// Detach a connection the transport has closed
    pub async fn channel_closed(&self, id: ChannelId) {
        self.registry.unregister(id).await;
        self.liveness.forget(id);
    }

    /// Route an inbound message from a registered channel to its handler
    pub async fn dispatch(
        &self,
        id: ChannelId,
        message: Message,
    ) -> Result<Dispatch, ProtocolError> {
        let channel = self
            .registry
            .get(id)
            .await
            .ok_or(ProtocolError::UnknownChannel(id.0))?;

        match route(message.message_type()) {
            Route::Handshake => {
                self.handshake.handle_version(channel.as_ref(), &message)?;
            }
            Route::Discovery => {
                self.discovery
                    .handle_peer_list(channel.as_ref(), &message, self.context.as_ref())
                    .await?;
            }
            Route::Liveness => {
                self.handle_pong(id, &message)?;
            }
            Route::Sync => {
                self.sync
                    .handle_sync(id, channel.as_ref(), &message, self.context.as_ref())
                    .await?;
            }
            Route::Transport => return Ok(Dispatch::Unhandled(message)),
        }

        Ok(Dispatch::Handled)
    }

    /// A pong resets the channel's liveness clock
    pub fn handle_pong(&self, id: ChannelId, message: &Message) -> Result<(), ProtocolError> {
        validate_message(message, MessageType::Pong)?;
        self.liveness.pong(id);
        Ok(())
    }

    /// Stop the liveness timer and close every registered channel.
    /// Calling it again is a no-op for the timer.
    pub async fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.liveness.stop().await;

        for (_, channel) in self.registry.snapshot().await {
            channel.disconnect();
        }
    }

    pub async fn is_running(&self) -> bool {
        self.liveness.is_running().await
    }
}
