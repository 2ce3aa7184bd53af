//! TCP transport
//!
//! Length-prefixed framing, the `PeerChannel` implementation backed by a
//! connection's writer task, and the per-connection read loop that feeds
//! peer management.

use crate::network::addrbook::PeerBook;
use crate::network::dispatch::Dispatch;
use crate::network::management::PeerManagement;
use crate::network::message::{Message, MAGIC, MAX_MESSAGE_SIZE};
use crate::network::peer::{PeerChannel, PeerError};
use bytes::{Buf, BufMut, BytesMut};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{Decoder, Encoder, Framed};

/// Outbound queue depth per connection
const SEND_QUEUE_SIZE: usize = 256;

/// Header: magic (4) + length (4)
const HEADER_LEN: usize = 8;

/// Peer management specialised to TCP channels and the in-memory peer book
pub type TcpPeerManagement = PeerManagement<TcpChannel, PeerBook>;

/// Message codec for length-prefixed framing
pub struct MessageCodec;

impl Encoder<Message> for MessageCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = item
            .to_bytes()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        if data.len() > MAX_MESSAGE_SIZE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Message too large: {} bytes", data.len()),
            ));
        }

        dst.reserve(HEADER_LEN + data.len());
        dst.put_slice(&MAGIC);
        dst.put_u32(data.len() as u32);
        dst.put_slice(&data);

        Ok(())
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        if src[..4] != MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Invalid magic bytes",
            ));
        }

        let len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Message too large: {} bytes", len),
            ));
        }

        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let data = src.split_to(len);

        let msg = Message::from_bytes(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        Ok(Some(msg))
    }
}

/// `PeerChannel` over one TCP connection
pub struct TcpChannel {
    connection_id: String,
    peer_ip: String,
    host_ip: String,
    tx: mpsc::Sender<Message>,
    close: watch::Sender<bool>,
}

impl PeerChannel for TcpChannel {
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
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => PeerError::QueueFull,
            TrySendError::Closed(_) => PeerError::Disconnected,
        })
    }

    fn disconnect(&self) {
        self.close.send_replace(true);
    }
}

/// TCP server for accepting peer connections
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind to a port on all interfaces. Port 0 picks a free port.
    pub async fn bind(port: u16) -> Result<Self, std::io::Error> {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr).await?;
        log::info!("Server listening on {}", listener.local_addr()?);

        Ok(Self { listener })
    }

    /// Actual bound address
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept incoming connections
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), std::io::Error> {
        self.listener.accept().await
    }
}

/// Connect to a peer
pub async fn connect_to_peer(addr: &str) -> Result<(TcpStream, SocketAddr), PeerError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| PeerError::ConnectionFailed(e.to_string()))?;

    let peer_addr = stream
        .peer_addr()
        .map_err(|e| PeerError::ConnectionFailed(e.to_string()))?;

    Ok((stream, peer_addr))
}

/// Run one peer connection (inbound or outbound) until either side closes it
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    core: Arc<TcpPeerManagement>,
    own_addr: Option<String>,
    listen_port: u16,
    outbound: bool,
) -> Result<(), PeerError> {
    let local = stream.local_addr()?;
    let host_ip = own_addr.unwrap_or_else(|| format!("{}:{}", local.ip(), listen_port));

    let framed = Framed::new(stream, MessageCodec);
    let (mut writer, mut reader) = framed.split();

    let (tx, mut rx) = mpsc::channel::<Message>(SEND_QUEUE_SIZE);
    let (close_tx, mut close_rx) = watch::channel(false);

    let channel = Arc::new(TcpChannel {
        connection_id: format!("{}:{}", if outbound { "out" } else { "in" }, addr),
        peer_ip: addr.to_string(),
        host_ip,
        tx,
        close: close_tx,
    });

    let id = core.new_channel(Arc::clone(&channel)).await;

    let mut writer_close = close_rx.clone();
    let write_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        if writer.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = writer_close.changed() => break,
            }
        }
        let _ = writer.close().await;
    });

    // Ask for the peer's version and sync state, and share what we know
    let mut greeting = vec![Message::version_request(), Message::sync_query()];
    if core.discovery_enabled() {
        let known = core.context().known_addresses().await;
        if !known.is_empty() {
            greeting.push(Message::peer_list(known));
        }
    }
    for msg in greeting {
        if let Err(e) = channel.send(msg) {
            log::warn!("Failed to greet {}: {}", addr, e);
        }
    }

    loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(msg)) => match core.dispatch(id, msg).await {
                    Ok(Dispatch::Handled) => {}
                    Ok(Dispatch::Unhandled(msg)) => {
                        log::debug!("Ignoring {} from {}", msg.message_type(), addr);
                    }
                    Err(e) => {
                        log::warn!("Protocol error from {}: {}", addr, e);
                    }
                },
                Some(Err(e)) => {
                    log::warn!("Error reading from {}: {}", addr, e);
                    break;
                }
                None => {
                    log::info!("Peer {} disconnected", addr);
                    break;
                }
            },
            _ = close_rx.changed() => {
                log::info!("Closing connection to {}", addr);
                break;
            }
        }
    }

    // Cleanup
    channel.disconnect();
    if let Err(e) = write_handle.await {
        log::debug!("Writer task for {} ended abnormally: {}", addr, e);
    }
    core.channel_closed(id).await;
    core.context().forget_peer(id).await;

    Ok(())
}
