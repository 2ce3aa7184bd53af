//! Version negotiation
//!
//! An empty version is a request: we answer with our own version and genesis
//! reference. A filled-in version is checked against our genesis reference;
//! peers on a different chain are dropped.

use crate::config::NodeConfig;
use crate::network::message::{Message, MessageType, ProtocolError};
use crate::network::peer::PeerChannel;

/// What the handler did with a version message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Peer asked for our version and got it
    Replied,
    /// Peer is on our chain
    Accepted,
    /// Genesis mismatch, connection terminated
    Rejected,
}

/// Handles `Version` messages
#[derive(Debug, Clone)]
pub struct HandshakeHandler {
    version: String,
    genesis_prev_hash: Vec<u8>,
}

impl HandshakeHandler {
    pub fn new(version: impl Into<String>, genesis_prev_hash: Vec<u8>) -> Self {
        Self {
            version: version.into(),
            genesis_prev_hash,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            config.protocol_version.clone(),
            config.genesis_prev_headerhash.clone(),
        )
    }

    /// Our own version announcement
    pub fn version_message(&self) -> Message {
        Message::version(&self.version, &self.genesis_prev_hash)
    }

    pub fn handle_version<C: PeerChannel>(
        &self,
        source: &C,
        message: &Message,
    ) -> Result<HandshakeOutcome, ProtocolError> {
        let data = match message {
            Message::Version(data) => data,
            other => return Err(ProtocolError::unexpected(MessageType::Version, other)),
        };

        if data.version.is_empty() {
            if let Err(e) = source.send(self.version_message()) {
                log::warn!("Failed to send version to {}: {}", source.peer_ip(), e);
            }
            return Ok(HandshakeOutcome::Replied);
        }

        log::info!(
            "{} version: {} | genesis prev_headerhash {}",
            source.peer_ip(),
            data.version,
            hex::encode(&data.genesis_prev_hash)
        );

        if data.genesis_prev_hash != self.genesis_prev_hash {
            log::warn!(
                "{} genesis_prev_headerhash mismatch",
                source.connection_id()
            );
            log::warn!("Expected: {}", hex::encode(&self.genesis_prev_hash));
            log::warn!("Found: {}", hex::encode(&data.genesis_prev_hash));
            source.disconnect();
            return Ok(HandshakeOutcome::Rejected);
        }

        Ok(HandshakeOutcome::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::RecordingChannel;

    fn handler() -> HandshakeHandler {
        HandshakeHandler::new("1.0.0", vec![0x11; 32])
    }

    #[test]
    fn test_empty_version_gets_reply() {
        let channel = RecordingChannel::new("a");
        let outcome = handler()
            .handle_version(channel.as_ref(), &Message::version_request())
            .unwrap();

        assert_eq!(outcome, HandshakeOutcome::Replied);
        assert_eq!(channel.sent(), vec![Message::version("1.0.0", &[0x11; 32])]);
        assert_eq!(channel.disconnects(), 0);
    }

    #[test]
    fn test_matching_genesis_accepted() {
        let channel = RecordingChannel::new("a");
        let outcome = handler()
            .handle_version(channel.as_ref(), &Message::version("0.9.0", &[0x11; 32]))
            .unwrap();

        assert_eq!(outcome, HandshakeOutcome::Accepted);
        assert!(channel.sent().is_empty());
        assert_eq!(channel.disconnects(), 0);
    }

    #[test]
    fn test_genesis_mismatch_disconnects() {
        let channel = RecordingChannel::new("a");
        let outcome = handler()
            .handle_version(channel.as_ref(), &Message::version("1.0.0", &[0x22; 32]))
            .unwrap();

        assert_eq!(outcome, HandshakeOutcome::Rejected);
        assert!(channel.sent().is_empty());
        assert_eq!(channel.disconnects(), 1);
    }

    #[test]
    fn test_wrong_message_type() {
        let channel = RecordingChannel::new("a");
        let err = handler()
            .handle_version(channel.as_ref(), &Message::Pong)
            .unwrap_err();

        assert!(matches!(err, ProtocolError::UnexpectedMessage { .. }));
        assert!(channel.sent().is_empty());
        assert_eq!(channel.disconnects(), 0);
    }
}
