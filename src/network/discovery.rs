//! Peer address exchange
//!
//! Peer lists received from other nodes are reduced to a set of distinct
//! addresses and handed to the node's address book. Our own address, as
//! reported on the connection, is never forwarded.

use crate::network::message::{Message, MessageType, ProtocolError};
use crate::network::peer::{NodeContext, PeerChannel};
use std::collections::HashSet;

/// Handles `PeerList` messages
#[derive(Debug, Clone, Copy)]
pub struct PeerDiscoveryHandler {
    enabled: bool,
}

impl PeerDiscoveryHandler {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Merge the addresses in `message` into the address book. Returns the
    /// number of addresses forwarded, or `None` when nothing was forwarded.
    pub async fn handle_peer_list<C, N>(
        &self,
        source: &C,
        message: &Message,
        context: &N,
    ) -> Result<Option<usize>, ProtocolError>
    where
        C: PeerChannel,
        N: NodeContext + ?Sized,
    {
        let data = match message {
            Message::PeerList(data) => data,
            other => return Err(ProtocolError::unexpected(MessageType::PeerList, other)),
        };

        if !self.enabled {
            return Ok(None);
        }

        let Some(peer_ips) = &data.peer_ips else {
            return Ok(None);
        };

        let new_ips = collect_addresses(peer_ips, source.host_ip());
        log::info!("{} peers data received: {:?}", source.peer_ip(), new_ips);

        let count = new_ips.len();
        context.update_peer_addresses(new_ips).await;
        Ok(Some(count))
    }
}

/// Distinct addresses from `peer_ips`, excluding `own_ip`. Entries are
/// taken as sent.
pub fn collect_addresses(peer_ips: &[String], own_ip: &str) -> HashSet<String> {
    let mut addrs: HashSet<String> = peer_ips.iter().cloned().collect();
    addrs.remove(own_ip);
    addrs
}
