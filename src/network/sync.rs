//! Sync state negotiation
//!
//! A peer announcing `"Synced"` is flagged synced in the node context. An
//! empty state is a query; a synced node answers it with `"Synced"`.

use crate::network::message::{Message, MessageType, ProtocolError, SYNC_STATE_SYNCED};
use crate::network::peer::{ChannelId, NodeContext, PeerChannel};

/// What the negotiator did with a sync message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Peer reported itself synced
    PeerSynced,
    /// Peer queried us and we answered "Synced"
    Replied,
    /// Peer queried us but we are not synced yet
    Ignored,
}

/// Handles `Sync` messages
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncNegotiator;

impl SyncNegotiator {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle_sync<C, N>(
        &self,
        source_id: ChannelId,
        source: &C,
        message: &Message,
        context: &N,
    ) -> Result<SyncOutcome, ProtocolError>
    where
        C: PeerChannel,
        N: NodeContext + ?Sized,
    {
        let data = match message {
            Message::Sync(data) => data,
            other => return Err(ProtocolError::unexpected(MessageType::Sync, other)),
        };

        match data.state.as_str() {
            SYNC_STATE_SYNCED => {
                context.set_peer_synced(source_id, true).await;
                Ok(SyncOutcome::PeerSynced)
            }
            "" => {
                if !context.synced().await {
                    return Ok(SyncOutcome::Ignored);
                }

                if let Err(e) = source.send(Message::synced()) {
                    log::warn!("Failed to send sync state to {}: {}", source.peer_ip(), e);
                }
                // The peer stays unconfirmed until it announces "Synced" itself
                context.set_peer_synced(source_id, false).await;
                Ok(SyncOutcome::Replied)
            }
            other => Err(ProtocolError::UnknownSyncState(other.to_string())),
        }
    }
}
