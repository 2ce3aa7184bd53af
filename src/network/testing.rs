//! Test doubles for the peer management core

use crate::network::message::Message;
use crate::network::peer::{ChannelId, NodeContext, PeerChannel, PeerError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Channel that records everything sent to it
pub struct RecordingChannel {
    connection_id: String,
    peer_ip: String,
    host_ip: String,
    sent: Mutex<Vec<Message>>,
    disconnects: AtomicUsize,
}

impl RecordingChannel {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_ips(name, "10.0.0.2", "10.0.0.1")
    }

    pub fn with_ips(name: &str, peer_ip: &str, host_ip: &str) -> Arc<Self> {
        Arc::new(Self {
            connection_id: name.to_string(),
            peer_ip: peer_ip.to_string(),
            host_ip: host_ip.to_string(),
            sent: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn take_sent(&self) -> Vec<Message> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn ping_count(&self) -> usize {
        self.sent().iter().filter(|m| **m == Message::Pong).count()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl PeerChannel for RecordingChannel {
    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    fn peer_ip(&self) -> &str {
        &self.peer_ip
    }

    fn host_ip(&self) -> &str {
        &self.host_ip
    }

    fn send(&self, message: Message) -> Result<(), PeerError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Node context that records address merges and sync flags
#[derive(Default)]
pub struct RecordingContext {
    pub synced: AtomicBool,
    pub address_updates: Mutex<Vec<HashSet<String>>>,
    pub peer_synced: Mutex<HashMap<ChannelId, bool>>,
}

impl RecordingContext {
    pub fn new(synced: bool) -> Arc<Self> {
        let ctx = Self::default();
        ctx.synced.store(synced, Ordering::SeqCst);
        Arc::new(ctx)
    }

    pub fn address_updates(&self) -> Vec<HashSet<String>> {
        self.address_updates.lock().unwrap().clone()
    }

    pub fn peer_synced(&self, channel: ChannelId) -> Option<bool> {
        self.peer_synced.lock().unwrap().get(&channel).copied()
    }
}

#[async_trait]
impl NodeContext for RecordingContext {
    async fn update_peer_addresses(&self, addrs: HashSet<String>) {
        self.address_updates.lock().unwrap().push(addrs);
    }

    async fn set_peer_synced(&self, channel: ChannelId, synced: bool) {
        self.peer_synced.lock().unwrap().insert(channel, synced);
    }

    async fn synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}
