//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while building or unpacking a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Gzip compression of the encoded message failed.
    #[error("compression failed: {message}")]
    CompressionFailed {
        /// Description of the compression error.
        message: String,
    },

    /// Gzip decompression of a document failed.
    #[error("decompression failed: {message}")]
    DecompressionFailed {
        /// Description of the decompression error.
        message: String,
    },

    /// The document was not valid standard base64.
    #[error("invalid base64: {message}")]
    InvalidBase64 {
        /// Description of the base64 error.
        message: String,
    },

    /// The payload does not start with the gzip magic bytes.
    #[error("payload is not gzip compressed")]
    NotCompressed,

    /// Unexpected end of input while reading a message.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A varint ran past ten bytes.
    #[error("varint overflow")]
    VarintOverflow,

    /// A field used a wire type this codec does not understand.
    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType {
        /// Field number of the offending tag.
        field: u32,
        /// Raw wire type bits.
        wire_type: u8,
    },
}

impl CodecError {
    /// Create a compression failed error.
    pub fn compression_failed(message: impl Into<String>) -> Self {
        Self::CompressionFailed {
            message: message.into(),
        }
    }

    /// Create a decompression failed error.
    pub fn decompression_failed(message: impl Into<String>) -> Self {
        Self::DecompressionFailed {
            message: message.into(),
        }
    }

    /// Create an invalid base64 error.
    pub fn invalid_base64(message: impl Into<String>) -> Self {
        Self::InvalidBase64 {
            message: message.into(),
        }
    }
}
