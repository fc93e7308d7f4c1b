// Path: crates/upstream/src/transport.rs

//! Framed TCP transport for the state-history protocol.
//!
//! Frames are a `u32` little-endian payload length followed by the payload.
//! The first frame a server sends is its schema announcement; every later
//! frame is a canonical-codec message.

use async_trait::async_trait;
use statefill_types::codec::to_bytes_canonical;
use statefill_types::wire::UpstreamRequest;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Hard cap on a single frame. Bootstrap delta batches are large, but
/// anything beyond this is a corrupt length prefix, not data.
pub const MAX_FRAME_BYTES: u32 = 512 * 1024 * 1024;

/// Errors raised by the transport layer. All of them are transient from the
/// session's point of view: the supervisor reconnects.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dialing the upstream failed.
    #[error("connect error: {0}")]
    Connect(String),
    /// A read or write on the established connection failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The upstream closed the connection.
    #[error("connection closed by upstream")]
    Closed,
    /// The upstream announced a frame larger than [`MAX_FRAME_BYTES`].
    #[error("frame too large: {got} bytes (max {max})")]
    FrameTooLarge {
        /// Announced payload length.
        got: u32,
        /// The configured cap.
        max: u32,
    },
}

/// The narrow interface the session drives the upstream through.
///
/// `recv` is the session's only block-stream suspension point; a frame is
/// returned whole, so a block apply never suspends mid-message.
#[async_trait]
pub trait Transport: Send {
    /// Sends one request frame.
    async fn send(&mut self, request: &UpstreamRequest) -> Result<(), TransportError>;

    /// Receives the next frame payload.
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Closes the connection. Dropping the transport has the same effect;
    /// this exists so a clean stop can half-close before the session is
    /// dropped.
    async fn close(&mut self);
}

/// A [`Transport`] over a plain TCP stream.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Dials `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| TransportError::Connect(format!("{host}:{port}: {e}")))?;
        stream.set_nodelay(true).map_err(TransportError::Io)?;
        tracing::debug!(target: "upstream", host, port, "connected");
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, request: &UpstreamRequest) -> Result<(), TransportError> {
        let payload = to_bytes_canonical(request);
        let len = u32::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
            got: u32::MAX,
            max: MAX_FRAME_BYTES,
        })?;
        self.stream.write_u32_le(len).await?;
        self.stream.write_all(&payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let len = match self.stream.read_u32_le().await {
            Ok(len) => len,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(TransportError::Closed)
            }
            Err(e) => return Err(TransportError::Io(e)),
        };
        if len > MAX_FRAME_BYTES {
            return Err(TransportError::FrameTooLarge { got: len, max: MAX_FRAME_BYTES });
        }
        let mut payload = vec![0u8; len as usize];
        match self.stream.read_exact(&mut payload).await {
            Ok(_) => Ok(payload),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(TransportError::Closed),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
