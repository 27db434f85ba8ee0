//! Tokio transport.
//!
//! Tokio's `UnixStream` cannot peek, so this transport reads greedily into a
//! [`FrameBuffer`] owned by the connection. Bytes past the current PDU stay
//! in that buffer for the next [`receive`](AsyncConnection::receive).

use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::config::ClientConfig;
use crate::error::{Result, TransportError};
use crate::protocol::{FrameBuffer, Pdu};

/// An async connection to the daemon.
pub struct AsyncConnection {
    stream: UnixStream,
    frames: FrameBuffer,
    config: ClientConfig,
}

impl AsyncConnection {
    /// Connect to the socket at `path` with default limits.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, ClientConfig::default()).await
    }

    /// Connect to the socket at `path`.
    pub async fn connect_with_config(path: impl AsRef<Path>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let stream = UnixStream::connect(path.as_ref()).await?;
        tracing::debug!(path = %path.as_ref().display(), "connected to daemon");
        Ok(Self::from_stream(stream, config))
    }

    /// Wrap an already-connected stream.
    pub fn from_stream(stream: UnixStream, config: ClientConfig) -> Self {
        Self {
            stream,
            frames: FrameBuffer::with_max_pdu(config.max_pdu_size),
            config,
        }
    }

    /// Limits in effect for this connection.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Write a complete PDU.
    pub async fn send(&mut self, pdu: &[u8]) -> Result<()> {
        self.stream.write_all(pdu).await?;
        self.stream.flush().await?;
        tracing::debug!(bytes = pdu.len(), "sent PDU");
        Ok(())
    }

    /// Read exactly one PDU.
    pub async fn receive(&mut self) -> Result<Pdu> {
        loop {
            if let Some(pdu) = self.frames.next_pdu()? {
                tracing::debug!(
                    header_len = pdu.header.header_len,
                    payload_len = pdu.header.payload_length,
                    "received PDU"
                );
                return Ok(pdu);
            }
            let n = self.stream.read_buf(self.frames.buffer_mut()).await?;
            if n == 0 {
                return Err(TransportError::ConnectionClosed.into());
            }
        }
    }

    /// Send `pdu` and wait for the response.
    pub async fn round_trip(&mut self, pdu: &[u8]) -> Result<Pdu> {
        self.send(pdu).await?;
        self.receive().await
    }

    /// Shut down the write side and drop the socket.
    pub async fn disconnect(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tags;
    use crate::error::WatchwireError;
    use crate::protocol::frame_payload;

    #[tokio::test]
    async fn test_receive_split_across_reads() {
        let (client, mut daemon) = UnixStream::pair().unwrap();
        let mut conn = AsyncConnection::from_stream(client, ClientConfig::default());

        let bytes = frame_payload(&[tags::INT16, 0xe8, 0x03]);
        let writer = tokio::spawn(async move {
            daemon.write_all(&bytes[..2]).await.unwrap();
            daemon.flush().await.unwrap();
            tokio::task::yield_now().await;
            daemon.write_all(&bytes[2..]).await.unwrap();
            daemon
        });

        let pdu = conn.receive().await.unwrap();
        assert_eq!(pdu.decoder(8).read_int().unwrap(), 1000);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_back_to_back_pdus_are_kept() {
        let (client, mut daemon) = UnixStream::pair().unwrap();
        let mut conn = AsyncConnection::from_stream(client, ClientConfig::default());

        let mut bytes = frame_payload(&[tags::TRUE]);
        bytes.extend(frame_payload(&[tags::NULL]));
        daemon.write_all(&bytes).await.unwrap();

        assert!(conn.receive().await.unwrap().decoder(8).read_bool().unwrap());
        conn.receive().await.unwrap().decoder(8).read_null().unwrap();
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let (client, daemon) = UnixStream::pair().unwrap();
        let mut conn = AsyncConnection::from_stream(client, ClientConfig::default());
        drop(daemon);

        assert!(matches!(
            conn.receive().await,
            Err(WatchwireError::Transport(TransportError::ConnectionClosed))
        ));
    }

    #[tokio::test]
    async fn test_round_trip_echo() {
        let (client, mut daemon) = UnixStream::pair().unwrap();
        let mut conn = AsyncConnection::from_stream(client, ClientConfig::default());

        let echo = tokio::spawn(async move {
            let mut request = [0u8; 5];
            daemon.read_exact(&mut request).await.unwrap();
            daemon.write_all(&request).await.unwrap();
        });

        let response = conn
            .round_trip(&frame_payload(&[tags::FALSE]))
            .await
            .unwrap();
        echo.await.unwrap();
        assert!(!response.decoder(8).read_bool().unwrap());
        conn.disconnect().await.unwrap();
    }
}
