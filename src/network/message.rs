//! Network message types for the peer management protocol
//!
//! Every message carries a type tag (`MessageType`). Version, peer-list,
//! pong and sync messages are consumed by the peer management core; the
//! remaining tags belong to the transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Magic bytes for message framing
pub const MAGIC: [u8; 4] = [0x50, 0x32, 0x50, 0x4E]; // "P2PN"

/// Maximum encoded message size accepted by the codec
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Sync state a peer reports once it has caught up with the chain head
pub const SYNC_STATE_SYNCED: &str = "Synced";

/// Message type discriminator carried on every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Version / genesis negotiation
    Version,
    /// Peer address list exchange
    PeerList,
    /// Liveness signal, used as both ping and pong
    Pong,
    /// Sync state negotiation
    Sync,
    /// Chain height announcement (transport-level)
    BlockHeight,
    /// Flow-control acknowledgement (transport-level)
    P2pAck,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Version => "VERSION",
            MessageType::PeerList => "PEER_LIST",
            MessageType::Pong => "PONG",
            MessageType::Sync => "SYNC",
            MessageType::BlockHeight => "BLOCK_HEIGHT",
            MessageType::P2pAck => "P2P_ACK",
        };
        f.write_str(name)
    }
}

/// Version payload. An empty `version` asks the receiver for its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionData {
    pub version: String,
    #[serde(with = "hex")]
    pub genesis_prev_hash: Vec<u8>,
}

/// Peer address list payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerListData {
    /// `None` when the sender attached no list at all
    #[serde(default)]
    pub peer_ips: Option<Vec<String>>,
}

/// Sync payload. An empty `state` is a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncData {
    #[serde(default)]
    pub state: String,
}

/// Network message envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Version(VersionData),
    PeerList(PeerListData),
    Pong,
    Sync(SyncData),
    BlockHeight { height: u64 },
    P2pAck { bytes_processed: u64 },
}

impl Message {
    /// Type tag of this message
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Version(_) => MessageType::Version,
            Message::PeerList(_) => MessageType::PeerList,
            Message::Pong => MessageType::Pong,
            Message::Sync(_) => MessageType::Sync,
            Message::BlockHeight { .. } => MessageType::BlockHeight,
            Message::P2pAck { .. } => MessageType::P2pAck,
        }
    }

    /// Version message asking the peer to announce its version
    pub fn version_request() -> Self {
        Message::Version(VersionData {
            version: String::new(),
            genesis_prev_hash: Vec::new(),
        })
    }

    /// Version message announcing our own version and genesis reference
    pub fn version(version: &str, genesis_prev_hash: &[u8]) -> Self {
        Message::Version(VersionData {
            version: version.to_string(),
            genesis_prev_hash: genesis_prev_hash.to_vec(),
        })
    }

    /// Liveness ping
    pub fn ping() -> Self {
        Message::Pong
    }

    /// Peer list carrying the given addresses
    pub fn peer_list<I>(addrs: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Message::PeerList(PeerListData {
            peer_ips: Some(addrs.into_iter().collect()),
        })
    }

    /// Sync query ("are you synced?")
    pub fn sync_query() -> Self {
        Message::Sync(SyncData::default())
    }

    /// Sync announcement that we are synced
    pub fn synced() -> Self {
        Message::Sync(SyncData {
            state: SYNC_STATE_SYNCED.to_string(),
        })
    }

    /// Serialize message to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Message-level protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unexpected message: expected {expected}, found {found}")]
    UnexpectedMessage {
        expected: MessageType,
        found: MessageType,
    },
    #[error("Unknown sync state: {0:?}")]
    UnknownSyncState(String),
    #[error("Message from unregistered channel {0}")]
    UnknownChannel(u64),
}

impl ProtocolError {
    /// `UnexpectedMessage` for a handler expecting `expected`
    pub fn unexpected(expected: MessageType, found: &Message) -> Self {
        ProtocolError::UnexpectedMessage {
            expected,
            found: found.message_type(),
        }
    }
}

/// Fail with `UnexpectedMessage` unless `message` carries the `expected` tag
pub fn validate_message(message: &Message, expected: MessageType) -> Result<(), ProtocolError> {
    if message.message_type() != expected {
        return Err(ProtocolError::unexpected(expected, message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let msg = Message::version("1.2.0", &[0xab, 0xcd]);
        let bytes = msg.to_bytes().unwrap();

        let json = String::from_utf8(bytes.clone()).unwrap();
        assert!(json.contains("\"abcd\""));

        let decoded = Message::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_peer_list_without_addresses() {
        let decoded = Message::from_bytes(br#"{"PeerList":{}}"#).unwrap();
        assert_eq!(decoded, Message::PeerList(PeerListData { peer_ips: None }));
    }

    #[test]
    fn test_message_type_tags() {
        assert_eq!(Message::ping().message_type(), MessageType::Pong);
        assert_eq!(Message::sync_query().message_type(), MessageType::Sync);
        assert_eq!(
            Message::BlockHeight { height: 3 }.message_type(),
            MessageType::BlockHeight
        );
        assert_eq!(MessageType::PeerList.to_string(), "PEER_LIST");
    }

    #[test]
    fn test_validate_message() {
        assert!(validate_message(&Message::Pong, MessageType::Pong).is_ok());

        let err = validate_message(&Message::sync_query(), MessageType::Version).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnexpectedMessage {
                expected: MessageType::Version,
                found: MessageType::Sync,
            }
        );
    }
}
