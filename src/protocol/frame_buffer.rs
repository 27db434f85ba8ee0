//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` so completed payloads are split off without
//! copying. Implements a state machine for fragmented PDUs:
//! - `WaitingForHeader`: need the marker, size tag and size field
//! - `WaitingForPayload`: header parsed, need N more payload bytes
//!
//! Bytes past the end of one PDU stay buffered for the next one, so a
//! stream reader that reads greedily never loses a later response.
//!
//! # Example
//!
//! ```
//! use watchwire::protocol::{frame_payload, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = frame_payload(&[0x0a]);
//!
//! assert!(buffer.push(&bytes[..2]).unwrap().is_empty());
//! let pdus = buffer.push(&bytes[2..]).unwrap();
//! assert_eq!(&pdus[0].payload[..], &[0x0a]);
//! ```

use bytes::BytesMut;

use super::frame::Pdu;
use super::wire_format::PduHeader;
use crate::config::DEFAULT_MAX_PDU_SIZE;
use crate::error::{FramingError, Result};

/// State machine for PDU parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header (4 to 11 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    WaitingForPayload { header: PduHeader },
}

/// Buffer for accumulating incoming bytes and extracting complete PDUs.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_pdu_size: u64,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max payload: 1GB.
    pub fn new() -> Self {
        Self::with_capacity_and_max_pdu(64 * 1024, DEFAULT_MAX_PDU_SIZE)
    }

    /// Create a new frame buffer with a custom max payload size.
    pub fn with_max_pdu(max_pdu_size: u64) -> Self {
        Self::with_capacity_and_max_pdu(64 * 1024, max_pdu_size)
    }

    /// Create a new frame buffer with custom capacity and max payload.
    pub fn with_capacity_and_max_pdu(capacity: usize, max_pdu_size: u64) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForHeader,
            max_pdu_size,
        }
    }

    /// Push data into the buffer and extract all complete PDUs.
    ///
    /// Returns the complete PDUs, possibly none if still waiting for data.
    ///
    /// # Errors
    ///
    /// Returns an error on a bad marker, bad size tag, empty payload, or a
    /// payload larger than the configured maximum.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Pdu>> {
        self.buffer.extend_from_slice(data);

        let mut pdus = Vec::new();
        while let Some(pdu) = self.try_extract_one()? {
            pdus.push(pdu);
        }
        Ok(pdus)
    }

    /// Extract one PDU from the bytes already buffered, if complete.
    pub fn next_pdu(&mut self) -> Result<Option<Pdu>> {
        self.try_extract_one()
    }

    /// Append data to the buffer without extracting PDUs.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Mutable access to the buffer, for reading straight into it.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    fn try_extract_one(&mut self) -> Result<Option<Pdu>> {
        loop {
            match &self.state {
                State::WaitingForHeader => {
                    let Some(header) = PduHeader::decode(&self.buffer)? else {
                        return Ok(None);
                    };
                    header.validate(self.max_pdu_size)?;
                    let _ = self.buffer.split_to(header.header_len);
                    self.state = State::WaitingForPayload { header };
                }

                State::WaitingForPayload { header } => {
                    let remaining = usize::try_from(header.payload_length).map_err(|_| {
                        FramingError::PayloadTooLarge {
                            size: header.payload_length,
                            max: usize::MAX as u64,
                        }
                    })?;
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(remaining).freeze();
                    let header = *header;
                    self.state = State::WaitingForHeader;
                    return Ok(Some(Pdu::new(header, payload)));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
