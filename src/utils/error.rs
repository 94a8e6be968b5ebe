use thiserror::Error;

/// Main error type for the MQ coder library.
///
/// Register arithmetic itself is total and never errors; failures arise only
/// while pulling bytes during decoding and in byte-stream access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MqError {
    /// A 0xFF-prefixed byte with a disallowed successor appeared before the
    /// stream end. The segment is corrupt or contains a foreign marker.
    #[error("invalid marker 0xFF{successor:02X} at stream offset {offset}")]
    InvalidMarker { offset: usize, successor: u8 },
    /// The byte stream rejected a read or truncation request.
    #[error("byte stream access out of range: offset {offset}, length {length}")]
    StreamIo { offset: usize, length: usize },
}

/// A specialized `Result` type for MQ coding operations.
pub type Result<T> = std::result::Result<T, MqError>;
