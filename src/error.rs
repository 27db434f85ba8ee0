//! Error types for watchwire.

use thiserror::Error;

/// Main error type for all watchwire operations.
#[derive(Debug, Error)]
pub enum WatchwireError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (config loading, JSON views of values).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed BSER payload.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Malformed PDU header or length.
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// Socket exchange failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The daemon answered with an `error` field.
    #[error("Daemon error: {0}")]
    Daemon(String),

    /// A required response field was absent.
    #[error("Missing field in response: {0}")]
    MissingField(&'static str),

    /// Invalid client configuration.
    #[error("Config error: {0}")]
    Config(String),
}

/// Failures while pulling values out of a BSER payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes remain than the value needs.
    #[error("unexpected end of input at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// A tag byte that is not valid at this position.
    #[error("unexpected tag 0x{tag:02x} at offset {offset}, expected {expected}")]
    UnexpectedTag {
        tag: u8,
        offset: usize,
        expected: &'static str,
    },

    /// Array, object, template or string length below zero.
    #[error("negative count {count} at offset {offset}")]
    NegativeCount { count: i64, offset: usize },

    /// A template with rows but no keys.
    #[error("template with {rows} rows but no keys at offset {offset}")]
    EmptyTemplate { rows: usize, offset: usize },

    /// Nesting deeper than the configured limit.
    #[error("nesting exceeds maximum depth {max_depth}")]
    DepthExceeded { max_depth: usize },

    /// An object key or string that had to be UTF-8 was not.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },
}

/// Failures while validating a PDU header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Not enough bytes for marker, size tag and size field.
    #[error("undersized header ({0} bytes)")]
    UndersizedHeader(usize),

    /// The PDU does not start with the BSER binary marker.
    #[error("missing binary marker")]
    MissingMarker,

    /// The size-of-size tag is not one of the integer tags.
    #[error("invalid size tag 0x{0:02x}")]
    InvalidSizeTag(u8),

    /// The declared payload length is zero or negative.
    #[error("empty payload (declared length {0})")]
    EmptyPayload(i64),

    /// The declared payload length exceeds the configured maximum.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: u64, max: u64 },

    /// The declared length disagrees with the bytes present.
    #[error("payload size mismatch (declared {declared}, found {actual})")]
    SizeMismatch { declared: usize, actual: usize },

    /// The payload value ended before the payload did.
    #[error("payload termination mismatch ({0} trailing bytes)")]
    TrailingBytes(usize),
}

/// Failures of a single request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request was not written in one send.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// The daemon did not deliver a complete response.
    #[error("no response ({received} of {expected} bytes received)")]
    NoResponse { received: usize, expected: usize },

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using WatchwireError.
pub type Result<T> = std::result::Result<T, WatchwireError>;

/// Result type alias for the pull decoder.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
