//! Message routing
//!
//! Maps every message tag to the component that consumes it. The table is
//! an exhaustive match, so adding a tag without routing it fails to compile.

use crate::network::message::{Message, MessageType};

/// Component responsible for a message tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Handshake,
    Discovery,
    Liveness,
    Sync,
    /// Not consumed by peer management; left to the transport
    Transport,
}

/// Routing table
pub const fn route(tag: MessageType) -> Route {
    match tag {
        MessageType::Version => Route::Handshake,
        MessageType::PeerList => Route::Discovery,
        MessageType::Pong => Route::Liveness,
        MessageType::Sync => Route::Sync,
        MessageType::BlockHeight | MessageType::P2pAck => Route::Transport,
    }
}

/// Result of dispatching one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// Returned to the caller untouched
    Unhandled(Message),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        assert_eq!(route(MessageType::Version), Route::Handshake);
        assert_eq!(route(MessageType::PeerList), Route::Discovery);
        assert_eq!(route(MessageType::Pong), Route::Liveness);
        assert_eq!(route(MessageType::Sync), Route::Sync);
        assert_eq!(route(MessageType::BlockHeight), Route::Transport);
        assert_eq!(route(MessageType::P2pAck), Route::Transport);
    }

    #[test]
    fn test_dispatch_is_handled() {
        assert!(Dispatch::Handled.is_handled());
        assert!(!Dispatch::Unhandled(Message::Pong).is_handled());
    }
}
