//! Materialized BSER values.
//!
//! Most callers should pull fields straight off a [`Decoder`]; a [`Value`]
//! tree is for responses whose shape is not known ahead of time, or for
//! logging a response as JSON.
//!
//! # Example
//!
//! ```
//! use watchwire::codec::Value;
//!
//! let value = Value::Object(vec![("watch".into(), Value::from("/tmp/project"))]);
//! assert_eq!(value.get("watch").and_then(Value::as_str), Some("/tmp/project"));
//! assert_eq!(
//!     serde_json::to_string(&value).unwrap(),
//!     r#"{"watch":"/tmp/project"}"#
//! );
//! ```
//!
//! [`Decoder`]: super::Decoder

use bytes::Bytes;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A decoded BSER value.
///
/// Strings are raw bytes: watchman reports paths exactly as the filesystem
/// stores them, which need not be UTF-8. Object entries keep wire order and
/// may repeat keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Array(Vec<Value>),
    Object(Vec<(Bytes, Value)>),
    String(Bytes),
    Int(i64),
    Real(f64),
    Bool(bool),
    Null,
}

impl Value {
    /// First value stored under `key`, if this is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries
                .iter()
                .find(|(k, _)| k.as_ref() == key.as_bytes())
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The string contents, if this is a UTF-8 string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(num) => Some(*num),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Bytes::from(s))
    }
}

impl From<i64> for Value {
    fn from(num: i64) -> Self {
        Value::Int(num)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

// Non-UTF-8 strings fall back to a byte sequence.
fn serialize_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    match std::str::from_utf8(bytes) {
        Ok(s) => serializer.serialize_str(s),
        Err(_) => serializer.serialize_bytes(bytes),
    }
}

struct Key<'a>(&'a [u8]);

impl Serialize for Key<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(self.0))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, item) in entries {
                    map.serialize_entry(&Key(key), item)?;
                }
                map.end()
            }
            Value::String(bytes) => serialize_bytes(bytes, serializer),
            Value::Int(num) => serializer.serialize_i64(*num),
            Value::Real(num) => serializer.serialize_f64(*num),
            Value::Bool(flag) => serializer.serialize_bool(*flag),
            Value::Null => serializer.serialize_unit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decoder, Encoder};

    fn sample() -> Value {
        Value::Object(vec![
            (Bytes::from_static(b"version"), Value::from("2024.01.01")),
            (
                Bytes::from_static(b"files"),
                Value::from(vec![Value::from("a.rs"), Value::from("b.rs")]),
            ),
            (Bytes::from_static(b"fresh"), Value::from(true)),
            (Bytes::from_static(b"clock"), Value::from(-7i64)),
            (Bytes::from_static(b"ratio"), Value::Real(0.25)),
            (Bytes::from_static(b"none"), Value::Null),
        ])
    }

    #[test]
    fn test_accessors() {
        let value = sample();
        assert_eq!(value.get("version").and_then(Value::as_str), Some("2024.01.01"));
        assert_eq!(value.get("files").and_then(Value::as_array).map(|a| a.len()), Some(2));
        assert_eq!(value.get("fresh").and_then(Value::as_bool), Some(true));
        assert_eq!(value.get("clock").and_then(Value::as_int), Some(-7));
        assert!(value.get("none").is_some_and(Value::is_null));
        assert!(value.get("missing").is_none());
        assert!(Value::Int(1).get("x").is_none());
    }

    #[test]
    fn test_encode_then_read_value() {
        let value = sample();
        let mut encoder = Encoder::new();
        encoder.write_value(&value);

        let mut decoder = Decoder::new(encoder.into_payload());
        assert_eq!(decoder.read_value().unwrap(), value);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_serialize_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "version": "2024.01.01",
                "files": ["a.rs", "b.rs"],
                "fresh": true,
                "clock": -7,
                "ratio": 0.25,
                "none": null,
            })
        );
    }

    #[test]
    fn test_serialize_non_utf8_string() {
        let value = Value::String(Bytes::from_static(&[0x66, 0xff]));
        assert_eq!(serde_json::to_string(&value).unwrap(), "[102,255]");
        assert!(value.as_str().is_none());
        assert_eq!(value.as_bytes(), Some(&[0x66, 0xff][..]));
    }
}
