//! Pull-style BSER decoder.
//!
//! A [`Decoder`] owns one response payload and a read cursor. Each `read_*`
//! call checks the tag and the remaining length, advances past exactly one
//! value, and returns it. Compound reads return only the element count; the
//! caller reads or skips that many values next.

use bytes::Bytes;

use super::tags;
use super::value::Value;
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{DecodeError, DecodeResult};

/// Cursor over a BSER payload.
#[derive(Debug, Clone)]
pub struct Decoder {
    buf: Bytes,
    pos: usize,
    max_depth: usize,
}

impl Decoder {
    /// Create a decoder over `buf` with the default depth limit.
    pub fn new(buf: Bytes) -> Self {
        Self::with_max_depth(buf, DEFAULT_MAX_DEPTH)
    }

    /// Create a decoder with a custom nesting limit for skip/read_value.
    pub fn with_max_depth(buf: Bytes, max_depth: usize) -> Self {
        Self {
            buf,
            pos: 0,
            max_depth,
        }
    }

    /// Create a decoder over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Current read offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True once the whole payload has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    fn need(&self, n: usize) -> DecodeResult<()> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        Ok(())
    }

    /// Tag of the next value, without consuming it.
    pub fn peek_tag(&self) -> DecodeResult<u8> {
        self.need(1)?;
        Ok(self.buf[self.pos])
    }

    fn expect_tag(&mut self, expected_tag: u8, expected: &'static str) -> DecodeResult<()> {
        let tag = self.peek_tag()?;
        if tag != expected_tag {
            return Err(DecodeError::UnexpectedTag {
                tag,
                offset: self.pos,
                expected,
            });
        }
        self.pos += 1;
        Ok(())
    }

    /// Read an integer of any width.
    pub fn read_int(&mut self) -> DecodeResult<i64> {
        let tag = self.peek_tag()?;
        let width = tags::int_width(tag).ok_or(DecodeError::UnexpectedTag {
            tag,
            offset: self.pos,
            expected: "integer",
        })?;
        self.need(1 + width)?;

        let body = &self.buf[self.pos + 1..self.pos + 1 + width];
        let value = match width {
            1 => body[0] as i8 as i64,
            2 => i16::from_le_bytes([body[0], body[1]]) as i64,
            4 => i32::from_le_bytes([body[0], body[1], body[2], body[3]]) as i64,
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(body);
                i64::from_le_bytes(raw)
            }
        };
        self.pos += 1 + width;
        Ok(value)
    }

    fn read_count(&mut self) -> DecodeResult<usize> {
        let offset = self.pos;
        let count = self.read_int()?;
        usize::try_from(count).map_err(|_| DecodeError::NegativeCount { count, offset })
    }

    /// Read a string as a zero-copy slice of the payload.
    pub fn read_string(&mut self) -> DecodeResult<Bytes> {
        self.expect_tag(tags::STRING, "string")?;
        let length = self.read_count()?;
        if length == 0 {
            return Ok(Bytes::new());
        }
        self.need(length)?;
        let string = self.buf.slice(self.pos..self.pos + length);
        self.pos += length;
        Ok(string)
    }

    /// Read a string that must be valid UTF-8.
    pub fn read_utf8(&mut self) -> DecodeResult<String> {
        let offset = self.pos;
        let bytes = self.read_string()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    /// Read an array header; returns the element count.
    pub fn read_array(&mut self) -> DecodeResult<usize> {
        self.expect_tag(tags::ARRAY, "array")?;
        self.read_count()
    }

    /// Read an object header; returns the number of key/value pairs.
    pub fn read_object(&mut self) -> DecodeResult<usize> {
        self.expect_tag(tags::OBJECT, "object")?;
        self.read_count()
    }

    /// Read a template header; returns the key names and the row count.
    ///
    /// The caller then reads `rows * keys.len()` values, row by row. A
    /// [`tags::SKIP`] marker stands for a key missing from that row.
    pub fn read_template(&mut self) -> DecodeResult<(Vec<Bytes>, usize)> {
        self.expect_tag(tags::TEMPLATE, "template")?;
        let key_count = self.read_array()?;
        let mut keys = Vec::with_capacity(key_count.min(self.remaining()));
        for _ in 0..key_count {
            keys.push(self.read_string()?);
        }
        let offset = self.pos;
        let rows = self.read_count()?;
        if keys.is_empty() && rows > 0 {
            return Err(DecodeError::EmptyTemplate { rows, offset });
        }
        Ok((keys, rows))
    }

    /// Read a double.
    pub fn read_double(&mut self) -> DecodeResult<f64> {
        self.expect_tag(tags::REAL, "real")?;
        self.need(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(f64::from_le_bytes(raw))
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        let tag = self.peek_tag()?;
        let value = match tag {
            tags::TRUE => true,
            tags::FALSE => false,
            _ => {
                return Err(DecodeError::UnexpectedTag {
                    tag,
                    offset: self.pos,
                    expected: "boolean",
                })
            }
        };
        self.pos += 1;
        Ok(value)
    }

    /// Read a null.
    pub fn read_null(&mut self) -> DecodeResult<()> {
        self.expect_tag(tags::NULL, "null")
    }

    /// Consume one value of any shape without materializing it.
    ///
    /// Advances the cursor by exactly as many bytes as [`read_value`] would.
    ///
    /// [`read_value`]: Decoder::read_value
    pub fn skip_value(&mut self) -> DecodeResult<()> {
        self.skip_at(0)
    }

    fn enter(&self, depth: usize) -> DecodeResult<usize> {
        if depth >= self.max_depth {
            return Err(DecodeError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        Ok(depth + 1)
    }

    fn skip_at(&mut self, depth: usize) -> DecodeResult<()> {
        match self.peek_tag()? {
            tags::ARRAY => {
                let inner = self.enter(depth)?;
                let count = self.read_array()?;
                for _ in 0..count {
                    self.skip_at(inner)?;
                }
            }
            tags::OBJECT => {
                let inner = self.enter(depth)?;
                let count = self.read_object()?;
                for _ in 0..count {
                    self.read_string()?;
                    self.skip_at(inner)?;
                }
            }
            tags::STRING => {
                self.read_string()?;
            }
            tags::INT8 | tags::INT16 | tags::INT32 | tags::INT64 => {
                self.read_int()?;
            }
            tags::REAL => {
                self.read_double()?;
            }
            // SKIP only belongs inside template rows, but consuming it is harmless.
            tags::TRUE | tags::FALSE | tags::NULL | tags::SKIP => {
                self.pos += 1;
            }
            tags::TEMPLATE => {
                let inner = self.enter(depth)?;
                let (keys, rows) = self.read_template()?;
                for _ in 0..rows {
                    for _ in 0..keys.len() {
                        self.skip_at(inner)?;
                    }
                }
            }
            tag => {
                return Err(DecodeError::UnexpectedTag {
                    tag,
                    offset: self.pos,
                    expected: "value",
                })
            }
        }
        Ok(())
    }

    /// Materialize one value.
    ///
    /// Templates become arrays of objects; skipped template cells are left
    /// out of their row.
    pub fn read_value(&mut self) -> DecodeResult<Value> {
        self.read_value_at(0)
    }

    fn read_value_at(&mut self, depth: usize) -> DecodeResult<Value> {
        let value = match self.peek_tag()? {
            tags::ARRAY => {
                let inner = self.enter(depth)?;
                let count = self.read_array()?;
                // Every element is at least one byte.
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.read_value_at(inner)?);
                }
                Value::Array(items)
            }
            tags::OBJECT => {
                let inner = self.enter(depth)?;
                let count = self.read_object()?;
                let mut entries = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    let key = self.read_string()?;
                    entries.push((key, self.read_value_at(inner)?));
                }
                Value::Object(entries)
            }
            tags::STRING => Value::String(self.read_string()?),
            tags::INT8 | tags::INT16 | tags::INT32 | tags::INT64 => Value::Int(self.read_int()?),
            tags::REAL => Value::Real(self.read_double()?),
            tags::TRUE | tags::FALSE => Value::Bool(self.read_bool()?),
            tags::NULL => {
                self.read_null()?;
                Value::Null
            }
            tags::TEMPLATE => {
                let inner = self.enter(depth)?;
                let (keys, rows) = self.read_template()?;
                let mut items = Vec::with_capacity(rows.min(self.remaining()));
                for _ in 0..rows {
                    let mut entries = Vec::with_capacity(keys.len());
                    for key in &keys {
                        if self.peek_tag()? == tags::SKIP {
                            self.pos += 1;
                            continue;
                        }
                        entries.push((key.clone(), self.read_value_at(inner)?));
                    }
                    items.push(Value::Object(entries));
                }
                Value::Array(items)
            }
            tag => {
                return Err(DecodeError::UnexpectedTag {
                    tag,
                    offset: self.pos,
                    expected: "value",
                })
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;

    fn decoder_for(build: impl FnOnce(&mut Encoder)) -> Decoder {
        let mut encoder = Encoder::new();
        build(&mut encoder);
        Decoder::new(encoder.into_payload())
    }

    #[test]
    fn test_int_roundtrip_all_widths() {
        let values = [
            0,
            1,
            -1,
            100,
            i8::MIN as i64,
            i8::MAX as i64,
            1000,
            i16::MIN as i64,
            i16::MAX as i64,
            100_000,
            i32::MIN as i64,
            i32::MAX as i64,
            1 << 40,
            i64::MIN,
            i64::MAX,
        ];
        for value in values {
            let mut decoder = decoder_for(|e| e.write_int(value));
            assert_eq!(decoder.read_int().unwrap(), value);
            assert!(decoder.is_empty());
        }
    }

    #[test]
    fn test_int_bad_tag() {
        let mut decoder = Decoder::from_slice(&[tags::STRING, tags::INT8, 0]);
        let err = decoder.read_int().unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedTag {
                tag: tags::STRING,
                offset: 0,
                expected: "integer"
            }
        );
        assert_eq!(decoder.position(), 0);
    }

    #[test]
    fn test_int_truncated_body() {
        let mut decoder = Decoder::from_slice(&[tags::INT32, 1, 2]);
        assert_eq!(
            decoder.read_int().unwrap_err(),
            DecodeError::UnexpectedEof {
                offset: 0,
                needed: 2
            }
        );
    }

    #[test]
    fn test_read_on_empty_input() {
        let mut decoder = Decoder::from_slice(&[]);
        assert!(matches!(
            decoder.read_string(),
            Err(DecodeError::UnexpectedEof { offset: 0, needed: 1 })
        ));
        assert!(decoder.skip_value().is_err());
    }

    #[test]
    fn test_string_roundtrip() {
        for len in [0usize, 1, 127, 128, 40_000] {
            let text = "a".repeat(len);
            let mut decoder = decoder_for(|e| e.write_str(&text));
            let read = decoder.read_string().unwrap();
            assert_eq!(read.len(), len);
            assert_eq!(&read[..], text.as_bytes());
            assert!(decoder.is_empty());
        }
    }

    #[test]
    fn test_empty_string_consumes_only_header() {
        let mut decoder = Decoder::from_slice(&[tags::STRING, tags::INT8, 0, tags::NULL]);
        assert!(decoder.read_string().unwrap().is_empty());
        assert_eq!(decoder.position(), 3);
        decoder.read_null().unwrap();
    }

    #[test]
    fn test_string_overrun() {
        let mut decoder = Decoder::from_slice(&[tags::STRING, tags::INT8, 5, b'a', b'b']);
        assert_eq!(
            decoder.read_string().unwrap_err(),
            DecodeError::UnexpectedEof {
                offset: 3,
                needed: 3
            }
        );
    }

    #[test]
    fn test_string_negative_length() {
        let mut decoder = Decoder::from_slice(&[tags::STRING, tags::INT8, 0xff]);
        assert_eq!(
            decoder.read_string().unwrap_err(),
            DecodeError::NegativeCount { count: -1, offset: 1 }
        );
    }

    #[test]
    fn test_read_utf8_rejects_invalid() {
        let mut decoder = Decoder::from_slice(&[tags::STRING, tags::INT8, 1, 0xff]);
        assert_eq!(
            decoder.read_utf8().unwrap_err(),
            DecodeError::InvalidUtf8 { offset: 0 }
        );
    }

    #[test]
    fn test_array_and_object_headers() {
        let mut decoder = decoder_for(|e| {
            e.write_array(3);
            e.write_object(1000);
        });
        assert_eq!(decoder.read_array().unwrap(), 3);
        assert_eq!(decoder.read_object().unwrap(), 1000);
    }

    #[test]
    fn test_negative_array_count() {
        let mut decoder = Decoder::from_slice(&[tags::ARRAY, tags::INT8, 0xfe]);
        assert!(matches!(
            decoder.read_array(),
            Err(DecodeError::NegativeCount { count: -2, .. })
        ));
    }

    #[test]
    fn test_object_where_array_expected() {
        let mut decoder = decoder_for(|e| e.write_object(0));
        assert!(matches!(
            decoder.read_array(),
            Err(DecodeError::UnexpectedTag {
                tag: tags::OBJECT,
                expected: "array",
                ..
            })
        ));
    }

    #[test]
    fn test_scalars() {
        let mut decoder = decoder_for(|e| {
            e.write_double(-2.25);
            e.write_bool(true);
            e.write_bool(false);
            e.write_null();
        });
        assert_eq!(decoder.read_double().unwrap(), -2.25);
        assert!(decoder.read_bool().unwrap());
        assert!(!decoder.read_bool().unwrap());
        decoder.read_null().unwrap();
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_truncated_double() {
        let mut decoder = Decoder::from_slice(&[tags::REAL, 0, 0, 0]);
        assert!(matches!(
            decoder.read_double(),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    fn nested_payload() -> Bytes {
        let mut e = Encoder::new();
        e.write_object(3);
        e.write_str("files");
        e.write_array(2);
        e.write_str("a.rs");
        e.write_array(2);
        e.write_int(70_000);
        e.write_double(0.5);
        e.write_str("meta");
        e.write_object(2);
        e.write_str("fresh");
        e.write_bool(true);
        e.write_str("none");
        e.write_null();
        e.write_str("version");
        e.write_str("2024.01.01");
        e.into_payload()
    }

    fn template_payload() -> Bytes {
        // [{"name": "a", "size": 1}, {"name": "b"}] in template form
        Bytes::from_static(&[
            tags::TEMPLATE,
            tags::ARRAY, tags::INT8, 2,
            tags::STRING, tags::INT8, 4, b'n', b'a', b'm', b'e',
            tags::STRING, tags::INT8, 4, b's', b'i', b'z', b'e',
            tags::INT8, 2,
            tags::STRING, tags::INT8, 1, b'a',
            tags::INT8, 1,
            tags::STRING, tags::INT8, 1, b'b',
            tags::SKIP,
        ])
    }

    #[test]
    fn test_skip_matches_full_decode() {
        for payload in [nested_payload(), template_payload()] {
            let mut skipped = Decoder::new(payload.clone());
            skipped.skip_value().unwrap();

            let mut read = Decoder::new(payload.clone());
            read.read_value().unwrap();

            assert_eq!(skipped.position(), read.position());
            assert_eq!(skipped.position(), payload.len());
        }
    }

    #[test]
    fn test_skip_field_by_field_agreement() {
        let payload = nested_payload();
        let mut manual = Decoder::new(payload.clone());
        assert_eq!(manual.read_object().unwrap(), 3);
        manual.read_string().unwrap();
        assert_eq!(manual.read_array().unwrap(), 2);
        manual.read_string().unwrap();
        assert_eq!(manual.read_array().unwrap(), 2);
        manual.read_int().unwrap();
        manual.read_double().unwrap();
        manual.read_string().unwrap();
        assert_eq!(manual.read_object().unwrap(), 2);
        manual.read_string().unwrap();
        manual.read_bool().unwrap();
        manual.read_string().unwrap();
        manual.read_null().unwrap();
        manual.read_string().unwrap();
        manual.read_string().unwrap();

        let mut skipped = Decoder::new(payload);
        skipped.skip_value().unwrap();
        assert_eq!(manual.position(), skipped.position());
    }

    #[test]
    fn test_skip_leaves_following_value() {
        let mut decoder = decoder_for(|e| {
            e.write_array(2);
            e.write_str("x");
            e.write_array(0);
            e.write_int(5);
        });
        decoder.skip_value().unwrap();
        assert_eq!(decoder.read_int().unwrap(), 5);
    }

    #[test]
    fn test_template_read_value() {
        let mut decoder = Decoder::new(template_payload());
        let value = decoder.read_value().unwrap();

        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name").and_then(Value::as_bytes), Some(&b"a"[..]));
        assert_eq!(rows[0].get("size").and_then(Value::as_int), Some(1));
        assert_eq!(rows[1].get("name").and_then(Value::as_bytes), Some(&b"b"[..]));
        assert!(rows[1].get("size").is_none());
    }

    #[test]
    fn test_read_template_header() {
        let mut decoder = Decoder::new(template_payload());
        let (keys, rows) = decoder.read_template().unwrap();
        assert_eq!(keys, vec![Bytes::from_static(b"name"), Bytes::from_static(b"size")]);
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_keyless_template_rejected() {
        let payload = [tags::TEMPLATE, tags::ARRAY, tags::INT8, 0, tags::INT32, 0, 0, 0, 0x40];
        let mut decoder = Decoder::from_slice(&payload);
        assert!(matches!(
            decoder.skip_value(),
            Err(DecodeError::EmptyTemplate { rows: 0x4000_0000, offset: 4 })
        ));

        let mut decoder = Decoder::from_slice(&[tags::TEMPLATE, tags::ARRAY, tags::INT8, 0, tags::INT8, 0]);
        assert_eq!(decoder.read_value().unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_skip_unknown_tag() {
        let mut decoder = Decoder::from_slice(&[0x42]);
        assert!(matches!(
            decoder.skip_value(),
            Err(DecodeError::UnexpectedTag { tag: 0x42, .. })
        ));
        let mut decoder = Decoder::from_slice(&[0x42]);
        assert!(decoder.read_value().is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut e = Encoder::new();
        for _ in 0..10 {
            e.write_array(1);
        }
        e.write_int(1);
        let payload = e.into_payload();

        let mut shallow = Decoder::with_max_depth(payload.clone(), 4);
        assert_eq!(
            shallow.skip_value().unwrap_err(),
            DecodeError::DepthExceeded { max_depth: 4 }
        );
        let mut shallow = Decoder::with_max_depth(payload.clone(), 4);
        assert!(matches!(
            shallow.read_value(),
            Err(DecodeError::DepthExceeded { .. })
        ));

        let mut deep = Decoder::with_max_depth(payload, 10);
        deep.skip_value().unwrap();
        assert!(deep.is_empty());
    }

    #[test]
    fn test_huge_count_fails_without_allocating() {
        // Claims 2^40 elements but holds none.
        let mut e = Encoder::new();
        e.write_array(1 << 40);
        let mut decoder = Decoder::new(e.into_payload());
        assert!(matches!(
            decoder.read_value(),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_strings_share_payload() {
        let payload = Bytes::from_static(&[tags::STRING, tags::INT8, 2, b'h', b'i']);
        let mut decoder = Decoder::new(payload.clone());
        let s = decoder.read_string().unwrap();
        assert_eq!(s.as_ptr(), payload[3..].as_ptr());
    }
}
