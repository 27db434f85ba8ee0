//! Request buffer and BSER encoding.
//!
//! The buffer starts with [`HEADER_RESERVE`] bytes kept free for the PDU
//! header, so framing never has to move the payload (see
//! [`crate::protocol::build_pdu`]).

use bytes::{BufMut, Bytes, BytesMut};

use super::tags;
use super::value::Value;
use crate::config::DEFAULT_REQUEST_CAPACITY;

/// Room for the widest PDU header: marker (2) + size tag (1) + int64 (8).
pub const HEADER_RESERVE: usize = 11;

/// Integer tag and body width that exactly represent `num`.
#[inline]
pub fn int_tag_for(num: i64) -> (u8, usize) {
    if i8::try_from(num).is_ok() {
        (tags::INT8, 1)
    } else if i16::try_from(num).is_ok() {
        (tags::INT16, 2)
    } else if i32::try_from(num).is_ok() {
        (tags::INT32, 4)
    } else {
        (tags::INT64, 8)
    }
}

/// Append `num` with the narrowest integer tag.
pub fn encode_int_into<B: BufMut>(buf: &mut B, num: i64) {
    match int_tag_for(num) {
        (tag @ tags::INT8, _) => {
            buf.put_u8(tag);
            buf.put_i8(num as i8);
        }
        (tag @ tags::INT16, _) => {
            buf.put_u8(tag);
            buf.put_i16_le(num as i16);
        }
        (tag @ tags::INT32, _) => {
            buf.put_u8(tag);
            buf.put_i32_le(num as i32);
        }
        (tag, _) => {
            buf.put_u8(tag);
            buf.put_i64_le(num);
        }
    }
}

/// Growable request buffer.
///
/// Compound values are written header-first: call [`write_array`] or
/// [`write_object`] with the element count, then write exactly that many
/// values (for objects, alternate a string key and a value). The encoder
/// does not track counts or key uniqueness.
///
/// [`write_array`]: Encoder::write_array
/// [`write_object`]: Encoder::write_object
#[derive(Debug)]
pub struct Encoder {
    buf: BytesMut,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Create an encoder with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REQUEST_CAPACITY)
    }

    /// Create an encoder with room for `capacity` payload bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = BytesMut::with_capacity(HEADER_RESERVE + capacity);
        buf.put_bytes(0, HEADER_RESERVE);
        Self { buf }
    }

    /// Encoded payload so far (header reserve excluded).
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.buf[HEADER_RESERVE..]
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - HEADER_RESERVE
    }

    /// True if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write an integer using the narrowest width.
    pub fn write_int(&mut self, num: i64) {
        encode_int_into(&mut self.buf, num);
    }

    /// Write a string as tag, length and raw bytes.
    pub fn write_string(&mut self, bytes: &[u8]) {
        self.buf.put_u8(tags::STRING);
        encode_int_into(&mut self.buf, bytes.len() as i64);
        self.buf.put_slice(bytes);
    }

    /// Write a UTF-8 string.
    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.write_string(s.as_bytes());
    }

    /// Start an array of `count` values.
    pub fn write_array(&mut self, count: usize) {
        self.buf.put_u8(tags::ARRAY);
        encode_int_into(&mut self.buf, count as i64);
    }

    /// Start an object of `count` key/value pairs.
    pub fn write_object(&mut self, count: usize) {
        self.buf.put_u8(tags::OBJECT);
        encode_int_into(&mut self.buf, count as i64);
    }

    /// Write a double.
    pub fn write_double(&mut self, num: f64) {
        self.buf.put_u8(tags::REAL);
        self.buf.put_f64_le(num);
    }

    /// Write a boolean.
    pub fn write_bool(&mut self, value: bool) {
        self.buf
            .put_u8(if value { tags::TRUE } else { tags::FALSE });
    }

    /// Write null.
    pub fn write_null(&mut self) {
        self.buf.put_u8(tags::NULL);
    }

    /// Write a whole value tree.
    pub fn write_value(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                self.write_array(items.len());
                for item in items {
                    self.write_value(item);
                }
            }
            Value::Object(entries) => {
                self.write_object(entries.len());
                for (key, item) in entries {
                    self.write_string(key);
                    self.write_value(item);
                }
            }
            Value::String(bytes) => self.write_string(bytes),
            Value::Int(num) => self.write_int(*num),
            Value::Real(num) => self.write_double(*num),
            Value::Bool(flag) => self.write_bool(*flag),
            Value::Null => self.write_null(),
        }
    }

    /// Consume into the raw buffer, header reserve included.
    pub(crate) fn into_reserved(self) -> BytesMut {
        self.buf
    }

    /// Consume into the payload bytes only.
    pub fn into_payload(self) -> Bytes {
        let mut buf = self.buf;
        buf.split_off(HEADER_RESERVE).freeze()
    }

    /// Frame the payload as a complete PDU. Same as [`crate::protocol::build_pdu`].
    pub fn finish(self) -> Bytes {
        crate::protocol::build_pdu(self)
    }
}
