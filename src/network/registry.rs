//! Channel registry
//!
//! Ordered set of currently attached peer channels. Insertion order is
//! connection order; ids are issued once and never reused.

use crate::network::peer::{ChannelId, PeerChannel};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Registered channels, shared between connection tasks and the liveness cycle
pub struct ChannelRegistry<C> {
    channels: RwLock<Vec<(ChannelId, Arc<C>)>>,
    next_id: AtomicU64,
}

impl<C: PeerChannel> ChannelRegistry<C> {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a channel and issue its id. Ids follow insertion order.
    pub async fn register(&self, channel: Arc<C>) -> ChannelId {
        let mut channels = self.channels.write().await;
        let id = ChannelId(self.next_id.fetch_add(1, Ordering::Relaxed));
        log::debug!(
            "Registered channel {} [{}] from {}",
            id,
            channel.connection_id(),
            channel.peer_ip()
        );
        channels.push((id, channel));
        id
    }

    /// Remove a channel. Returns it if it was still registered.
    pub async fn unregister(&self, id: ChannelId) -> Option<Arc<C>> {
        let mut channels = self.channels.write().await;
        let pos = channels.iter().position(|(cid, _)| *cid == id)?;
        let (_, channel) = channels.remove(pos);
        log::debug!("Unregistered channel {} [{}]", id, channel.connection_id());
        Some(channel)
    }

    /// Look up a registered channel
    pub async fn get(&self, id: ChannelId) -> Option<Arc<C>> {
        let channels = self.channels.read().await;
        channels
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, channel)| Arc::clone(channel))
    }

    /// Registered channels in connection order, as of now
    pub async fn snapshot(&self) -> Vec<(ChannelId, Arc<C>)> {
        let channels = self.channels.read().await;
        channels.clone()
    }

    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}

impl<C: PeerChannel> Default for ChannelRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::RecordingChannel;

    #[tokio::test]
    async fn test_register_preserves_order() {
        let registry = ChannelRegistry::new();
        let a = registry.register(RecordingChannel::new("a")).await;
        let b = registry.register(RecordingChannel::new("b")).await;
        let c = registry.register(RecordingChannel::new("c")).await;

        let ids: Vec<_> = registry.snapshot().await.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = ChannelRegistry::new();
        let a = registry.register(RecordingChannel::new("a")).await;
        let b = registry.register(RecordingChannel::new("b")).await;

        let removed = registry.unregister(a).await.unwrap();
        assert_eq!(removed.connection_id(), "a");
        assert!(registry.unregister(a).await.is_none());
        assert!(registry.get(a).await.is_none());
        assert!(registry.get(b).await.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let registry = Arc::new(ChannelRegistry::new());

        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry
                    .register(RecordingChannel::new(&format!("peer-{}", i)))
                    .await
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 32);
        assert_eq!(registry.len().await, 32);

        // Connection order and id order agree
        let order: Vec<_> = registry.snapshot().await.into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, ids);
    }
}
