//! Blocking Unix socket transport.
//!
//! One [`Connection`] exchanges one request/response pair at a time. The
//! socket is forced into blocking mode so every read can wait for the
//! exact number of bytes it needs.
//!
//! Receiving peeks before it reads, so it never consumes bytes belonging to
//! a later PDU on the same stream:
//!
//! 1. peek marker + size tag (3 bytes)
//! 2. peek the whole header (4, 5, 7 or 11 bytes)
//! 3. read header + payload with `MSG_WAITALL`
//!
//! # Example
//!
//! ```ignore
//! use watchwire::transport::Connection;
//!
//! let mut conn = Connection::connect("/usr/local/var/run/watchman/me-state/sock")?;
//! let watch = conn.watch_project("/home/me/project")?;
//! conn.disconnect()?;
//! ```

use std::io::Write;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::Path;

use bytes::Bytes;
use nix::errno::Errno;
use nix::sys::socket::{recv, MsgFlags};

use crate::config::ClientConfig;
use crate::error::{Result, TransportError};
use crate::protocol::{Pdu, PduHeader, MAX_HEADER_SIZE, SNIFF_SIZE};

/// A blocking connection to the daemon.
#[derive(Debug)]
pub struct Connection {
    stream: UnixStream,
    config: ClientConfig,
}

impl Connection {
    /// Connect to the socket at `path` with default limits.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, ClientConfig::default())
    }

    /// Connect to the socket at `path`.
    ///
    /// Paths longer than the platform's `sun_path` are rejected rather than
    /// truncated.
    pub fn connect_with_config(path: impl AsRef<Path>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let stream = UnixStream::connect(path)?;
        tracing::debug!(path = %path.display(), "connected to daemon");
        Self::from_stream(stream, config)
    }

    /// Connect to the socket named in `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let path = config.require_socket_path()?.clone();
        Self::connect_with_config(path, config)
    }

    /// Wrap an already-connected stream.
    pub fn from_stream(stream: UnixStream, config: ClientConfig) -> Result<Self> {
        stream.set_nonblocking(false)?;
        Ok(Self { stream, config })
    }

    /// Limits in effect for this connection.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Close the socket, reporting the OS error if close fails.
    pub fn disconnect(self) -> Result<()> {
        let fd = self.stream.into_raw_fd();
        nix::unistd::close(fd).map_err(std::io::Error::from)?;
        Ok(())
    }

    /// Write a complete PDU in a single send.
    pub fn send(&mut self, pdu: &[u8]) -> Result<()> {
        let written = self.stream.write(pdu)?;
        if written != pdu.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: pdu.len(),
            }
            .into());
        }
        tracing::debug!(bytes = written, "sent PDU");
        Ok(())
    }

    /// Read exactly one PDU.
    pub fn receive(&mut self) -> Result<Pdu> {
        let fd = self.stream.as_raw_fd();
        let peek = MsgFlags::MSG_PEEK | MsgFlags::MSG_WAITALL;

        let mut sniff = [0u8; SNIFF_SIZE];
        recv_exact(fd, &mut sniff, peek)?;
        let header_len = PduHeader::sniff(&sniff)?;

        let mut head = [0u8; MAX_HEADER_SIZE];
        recv_exact(fd, &mut head[..header_len], peek)?;
        let header = PduHeader::decode(&head[..header_len])?.ok_or(
            TransportError::NoResponse {
                received: header_len,
                expected: header_len,
            },
        )?;
        header.validate(self.config.max_pdu_size)?;

        let mut buf = vec![0u8; header.total_len()];
        recv_exact(fd, &mut buf, MsgFlags::MSG_WAITALL)?;

        tracing::debug!(
            header_len = header.header_len,
            payload_len = header.payload_length,
            "received PDU"
        );
        let payload = Bytes::from(buf).slice(header.header_len..);
        Ok(Pdu::new(header, payload))
    }

    /// Send `pdu` and wait for the response.
    pub fn round_trip(&mut self, pdu: &[u8]) -> Result<Pdu> {
        self.send(pdu)?;
        self.receive()
    }
}

/// `recv` that must fill `buf`; anything shorter is a missing response.
fn recv_exact(fd: RawFd, buf: &mut [u8], flags: MsgFlags) -> Result<()> {
    let received = loop {
        match recv(fd, buf, flags) {
            Ok(n) => break n,
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(std::io::Error::from(errno).into()),
        }
    };
    if received != buf.len() {
        return Err(TransportError::NoResponse {
            received,
            expected: buf.len(),
        }
        .into());
    }
    Ok(())
}
