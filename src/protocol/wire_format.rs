//! PDU header encoding and decoding.
//!
//! Every PDU starts with a variable-length header:
//! ```text
//! ┌──────────┬──────────┬──────────────────┐
//! │ Marker   │ Size tag │ Payload length   │
//! │ 00 01    │ 03..=06  │ 1, 2, 4 or 8     │
//! │ 2 bytes  │ 1 byte   │ bytes, LE signed │
//! └──────────┴──────────┴──────────────────┘
//! ```
//!
//! The size tag is an ordinary BSER integer tag, and the length is written
//! with the same smallest-fits rule as any other integer.

use crate::codec::{encode_int_into, tags};
use crate::error::FramingError;

/// Leading bytes of every BSER v1 PDU.
pub const BINARY_MARKER: [u8; 2] = [0x00, 0x01];

/// Bytes needed to learn the header size: marker + size tag.
pub const SNIFF_SIZE: usize = BINARY_MARKER.len() + 1;

/// Largest possible header: marker + size tag + int64.
pub const MAX_HEADER_SIZE: usize = SNIFF_SIZE + 8;

/// Smallest possible header: marker + size tag + int8.
pub const MIN_HEADER_SIZE: usize = SNIFF_SIZE + 1;

/// Decoded PDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    /// Header length in bytes (4, 5, 7 or 11).
    pub header_len: usize,
    /// Payload length in bytes.
    pub payload_length: u64,
}

impl PduHeader {
    /// Header for a payload of `payload_length` bytes.
    pub fn for_payload(payload_length: usize) -> Self {
        let (_, width) = crate::codec::int_tag_for(payload_length as i64);
        Self {
            header_len: SNIFF_SIZE + width,
            payload_length: payload_length as u64,
        }
    }

    /// Header length announced by the first [`SNIFF_SIZE`] bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use watchwire::protocol::PduHeader;
    ///
    /// assert_eq!(PduHeader::sniff(&[0x00, 0x01, 0x05]).unwrap(), 7);
    /// assert!(PduHeader::sniff(&[0x00, 0x02, 0x05]).is_err());
    /// ```
    pub fn sniff(buf: &[u8]) -> Result<usize, FramingError> {
        if buf.len() < SNIFF_SIZE {
            return Err(FramingError::UndersizedHeader(buf.len()));
        }
        if buf[..BINARY_MARKER.len()] != BINARY_MARKER {
            return Err(FramingError::MissingMarker);
        }
        let size_tag = buf[BINARY_MARKER.len()];
        let width = tags::int_width(size_tag).ok_or(FramingError::InvalidSizeTag(size_tag))?;
        Ok(SNIFF_SIZE + width)
    }

    /// Decode a header from the start of `buf`.
    ///
    /// Returns `Ok(None)` if `buf` is too short to hold the whole header.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>, FramingError> {
        if buf.len() < SNIFF_SIZE {
            return Ok(None);
        }
        let header_len = Self::sniff(buf)?;
        if buf.len() < header_len {
            return Ok(None);
        }

        let body = &buf[SNIFF_SIZE..header_len];
        let declared = match body.len() {
            1 => body[0] as i8 as i64,
            2 => i16::from_le_bytes([body[0], body[1]]) as i64,
            4 => i32::from_le_bytes([body[0], body[1], body[2], body[3]]) as i64,
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(body);
                i64::from_le_bytes(raw)
            }
        };
        if declared <= 0 {
            return Err(FramingError::EmptyPayload(declared));
        }

        Ok(Some(Self {
            header_len,
            payload_length: declared as u64,
        }))
    }

    /// Encode into `out`, which must hold exactly `header_len` bytes.
    pub fn encode_into(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.header_len);
        out[..BINARY_MARKER.len()].copy_from_slice(&BINARY_MARKER);
        let mut rest = &mut out[BINARY_MARKER.len()..];
        encode_int_into(&mut rest, self.payload_length as i64);
    }

    /// Encode to a fresh vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.header_len];
        self.encode_into(&mut out);
        out
    }

    /// Reject payloads above `max_pdu_size`.
    pub fn validate(&self, max_pdu_size: u64) -> Result<(), FramingError> {
        if self.payload_length > max_pdu_size {
            return Err(FramingError::PayloadTooLarge {
                size: self.payload_length,
                max: max_pdu_size,
            });
        }
        Ok(())
    }

    /// Header plus payload length.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.header_len + self.payload_length as usize
    }
}
