//! Address book and per-peer sync flags
//!
//! The node-side state that peer management reports into: addresses learned
//! through peer lists, whether each connected peer claims to be synced, and
//! whether this node itself is synced.

use crate::network::peer::{ChannelId, NodeContext};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Upper bound on remembered peer addresses
pub const MAX_KNOWN_ADDRESSES: usize = 1000;

/// Node context backed by in-memory tables
pub struct PeerBook {
    known: RwLock<BTreeSet<String>>,
    peer_synced: RwLock<HashMap<ChannelId, bool>>,
    synced: AtomicBool,
    own_addr: Option<String>,
}

impl PeerBook {
    /// `own_addr` is never stored, even if a peer reports it
    pub fn new(own_addr: Option<String>) -> Self {
        Self {
            known: RwLock::new(BTreeSet::new()),
            peer_synced: RwLock::new(HashMap::new()),
            synced: AtomicBool::new(false),
            own_addr,
        }
    }

    /// Seed the book with addresses from configuration
    pub async fn add_addresses<I>(&self, addrs: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut known = self.known.write().await;
        let before = known.len();
        for addr in addrs {
            if known.len() >= MAX_KNOWN_ADDRESSES {
                log::debug!("Address book full, dropping remaining addresses");
                break;
            }
            if Some(&addr) == self.own_addr.as_ref() || addr.is_empty() {
                continue;
            }
            known.insert(addr);
        }
        known.len() - before
    }

    /// Known addresses in sorted order
    pub async fn known_addresses(&self) -> Vec<String> {
        self.known.read().await.iter().cloned().collect()
    }

    pub async fn known_count(&self) -> usize {
        self.known.read().await.len()
    }

    pub async fn is_peer_synced(&self, channel: ChannelId) -> bool {
        self.peer_synced
            .read()
            .await
            .get(&channel)
            .copied()
            .unwrap_or(false)
    }

    pub async fn synced_peer_count(&self) -> usize {
        self.peer_synced.read().await.values().filter(|s| **s).count()
    }

    /// Update this node's own sync state
    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }

    /// Drop the sync flag of a closed connection
    pub async fn forget_peer(&self, channel: ChannelId) {
        self.peer_synced.write().await.remove(&channel);
    }
}

impl Default for PeerBook {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl NodeContext for PeerBook {
    async fn update_peer_addresses(&self, addrs: HashSet<String>) {
        let added = self.add_addresses(addrs).await;
        if added > 0 {
            log::info!("Learned {} new peer addresses", added);
        }
    }

    async fn set_peer_synced(&self, channel: ChannelId, synced: bool) {
        self.peer_synced.write().await.insert(channel, synced);
    }

    async fn synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(addrs: &[&str]) -> HashSet<String> {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    #[tokio::test]
    async fn test_merge_addresses() {
        let book = PeerBook::new(Some("10.0.0.1:9000".to_string()));

        book.update_peer_addresses(set(&["10.0.0.2:9000", "10.0.0.1:9000"]))
            .await;
        book.update_peer_addresses(set(&["10.0.0.2:9000", "10.0.0.3:9000"]))
            .await;

        assert_eq!(
            book.known_addresses().await,
            vec!["10.0.0.2:9000".to_string(), "10.0.0.3:9000".to_string()]
        );
    }

    #[tokio::test]
    async fn test_address_limit() {
        let book = PeerBook::default();
        let addrs =
            (0..MAX_KNOWN_ADDRESSES + 10).map(|i| format!("10.1.{}.{}:9000", i / 256, i % 256));

        let added = book.add_addresses(addrs).await;
        assert_eq!(added, MAX_KNOWN_ADDRESSES);
        assert_eq!(book.known_count().await, MAX_KNOWN_ADDRESSES);
    }

    #[tokio::test]
    async fn test_peer_sync_flags() {
        let book = PeerBook::default();
        let a = ChannelId(1);
        let b = ChannelId(2);

        book.set_peer_synced(a, true).await;
        book.set_peer_synced(b, false).await;
        assert!(book.is_peer_synced(a).await);
        assert!(!book.is_peer_synced(b).await);
        assert_eq!(book.synced_peer_count().await, 1);

        book.forget_peer(a).await;
        assert!(!book.is_peer_synced(a).await);
        assert_eq!(book.synced_peer_count().await, 0);
    }

    #[tokio::test]
    async fn test_own_sync_state() {
        let book = PeerBook::default();
        assert!(!book.synced().await);
        book.set_synced(true);
        assert!(book.synced().await);
    }
}
