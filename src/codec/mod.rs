//! Codec module - BSER encoding and pull-style decoding.
//!
//! BSER is the tagged binary serialization spoken by the watchman daemon.
//! Every value starts with a one-byte tag (see [`tags`]):
//!
//! ```text
//! ┌─────┬──────────────────────────────────────────────┐
//! │ Tag │ Body                                         │
//! ├─────┼──────────────────────────────────────────────┤
//! │ 00  │ array: int count, then count values          │
//! │ 01  │ object: int count, then count (string, value)│
//! │ 02  │ string: int length, then raw bytes           │
//! │ 03  │ int8  (1 byte)                               │
//! │ 04  │ int16 (2 bytes, little endian)               │
//! │ 05  │ int32 (4 bytes, little endian)               │
//! │ 06  │ int64 (8 bytes, little endian)               │
//! │ 07  │ real  (8 bytes, IEEE 754, little endian)     │
//! │ 08  │ true                                         │
//! │ 09  │ false                                        │
//! │ 0a  │ null                                         │
//! │ 0b  │ template: key array, int rows, rows x values │
//! │ 0c  │ skip (missing key inside a template row)     │
//! └─────┴──────────────────────────────────────────────┘
//! ```
//!
//! - [`Encoder`] - request buffer with smallest-fits integer encoding
//! - [`Decoder`] - cursor over a response payload; reads only what is asked
//! - [`Value`] - materialized tree, for callers that want everything
//!
//! # Example
//!
//! ```
//! use watchwire::codec::{Decoder, Encoder};
//!
//! let mut encoder = Encoder::new();
//! encoder.write_array(2);
//! encoder.write_str("watch-project");
//! encoder.write_int(1000);
//!
//! let mut decoder = Decoder::from_slice(encoder.payload());
//! assert_eq!(decoder.read_array().unwrap(), 2);
//! assert_eq!(&decoder.read_string().unwrap()[..], b"watch-project");
//! assert_eq!(decoder.read_int().unwrap(), 1000);
//! assert!(decoder.is_empty());
//! ```

mod decoder;
mod encoder;
mod value;

pub use decoder::Decoder;
pub use encoder::{encode_int_into, int_tag_for, Encoder, HEADER_RESERVE};
pub use value::Value;

/// Tag bytes of the BSER value model.
pub mod tags {
    /// Array: followed by an int count.
    pub const ARRAY: u8 = 0x00;
    /// Object: followed by an int count of key/value pairs.
    pub const OBJECT: u8 = 0x01;
    /// String: followed by an int length and the raw bytes.
    pub const STRING: u8 = 0x02;
    /// 8-bit signed integer.
    pub const INT8: u8 = 0x03;
    /// 16-bit signed integer.
    pub const INT16: u8 = 0x04;
    /// 32-bit signed integer.
    pub const INT32: u8 = 0x05;
    /// 64-bit signed integer.
    pub const INT64: u8 = 0x06;
    /// IEEE 754 double.
    pub const REAL: u8 = 0x07;
    /// Boolean true.
    pub const TRUE: u8 = 0x08;
    /// Boolean false.
    pub const FALSE: u8 = 0x09;
    /// Null.
    pub const NULL: u8 = 0x0a;
    /// Template (compact array of same-shaped objects).
    pub const TEMPLATE: u8 = 0x0b;
    /// Placeholder for a key missing from one template row.
    pub const SKIP: u8 = 0x0c;

    /// Byte width of the integer body for an integer tag.
    #[inline]
    pub fn int_width(tag: u8) -> Option<usize> {
        match tag {
            INT8 => Some(1),
            INT16 => Some(2),
            INT32 => Some(4),
            INT64 => Some(8),
            _ => None,
        }
    }
}
