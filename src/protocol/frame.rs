//! Complete PDUs: building outgoing ones and loading in-memory ones.
//!
//! # Example
//!
//! ```
//! use watchwire::codec::{Encoder, Value};
//! use watchwire::protocol::{build_pdu, load};
//!
//! let mut encoder = Encoder::new();
//! encoder.write_array(2);
//! encoder.write_str("watch-project");
//! encoder.write_str("/tmp/project");
//!
//! let pdu = build_pdu(encoder);
//! assert_eq!(&pdu[..2], &[0x00, 0x01]);
//!
//! let value = load(&pdu).unwrap();
//! assert_eq!(value.as_array().unwrap()[0], Value::from("watch-project"));
//! ```

use bytes::{Buf, Bytes};

use super::wire_format::{PduHeader, MIN_HEADER_SIZE};
use crate::codec::{Decoder, Encoder, Value, HEADER_RESERVE};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{FramingError, Result};

/// A received PDU: decoded header and payload bytes.
#[derive(Debug, Clone)]
pub struct Pdu {
    pub header: PduHeader,
    pub payload: Bytes,
}

impl Pdu {
    pub fn new(header: PduHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Payload length in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// A decoder positioned at the start of the payload.
    pub fn decoder(&self, max_depth: usize) -> Decoder {
        Decoder::with_max_depth(self.payload.clone(), max_depth)
    }
}

/// Frame an encoded request.
///
/// The header is written into the space the encoder reserved in front of
/// the payload, right-aligned, so the payload is never copied.
pub fn build_pdu(encoder: Encoder) -> Bytes {
    let mut buf = encoder.into_reserved();
    let payload_len = buf.len() - HEADER_RESERVE;
    let header = PduHeader::for_payload(payload_len);

    let start = HEADER_RESERVE - header.header_len;
    header.encode_into(&mut buf[start..HEADER_RESERVE]);
    buf.advance(start);
    buf.freeze()
}

/// Frame an arbitrary payload (copies it).
pub fn frame_payload(payload: &[u8]) -> Vec<u8> {
    let header = PduHeader::for_payload(payload.len());
    let mut out = header.encode();
    out.extend_from_slice(payload);
    out
}

/// Encode `value` as a complete PDU.
pub fn dump(value: &Value) -> Bytes {
    let mut encoder = Encoder::new();
    encoder.write_value(value);
    build_pdu(encoder)
}

/// Decode a complete in-memory PDU into a value tree.
///
/// The buffer must hold exactly one PDU: the declared length must match
/// the bytes after the header, and the value must fill the payload.
pub fn load(buf: &[u8]) -> Result<Value> {
    load_with_max_depth(buf, DEFAULT_MAX_DEPTH)
}

/// [`load`] with a custom nesting limit.
pub fn load_with_max_depth(buf: &[u8], max_depth: usize) -> Result<Value> {
    if buf.len() < MIN_HEADER_SIZE {
        return Err(FramingError::UndersizedHeader(buf.len()).into());
    }
    let header = PduHeader::decode(buf)?
        .ok_or(FramingError::UndersizedHeader(buf.len()))?;

    let actual = buf.len() - header.header_len;
    if header.payload_length != actual as u64 {
        return Err(FramingError::SizeMismatch {
            declared: header.payload_length as usize,
            actual,
        }
        .into());
    }

    let mut decoder = Decoder::with_max_depth(
        Bytes::copy_from_slice(&buf[header.header_len..]),
        max_depth,
    );
    let value = decoder.read_value()?;
    if !decoder.is_empty() {
        return Err(FramingError::TrailingBytes(decoder.remaining()).into());
    }
    Ok(value)
}
