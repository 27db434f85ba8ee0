//! Protocol module - PDU framing.
//!
//! This module implements the framing layer around BSER payloads:
//! - variable-length header encoding/decoding
//! - building outgoing PDUs and loading in-memory ones
//! - frame buffer for accumulating partial reads

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_pdu, dump, frame_payload, load, load_with_max_depth, Pdu};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{PduHeader, BINARY_MARKER, MAX_HEADER_SIZE, MIN_HEADER_SIZE, SNIFF_SIZE};
