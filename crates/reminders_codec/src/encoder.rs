//! Document encoder.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use uuid::Uuid;

use crate::error::{CodecError, CodecResult};
use crate::wire::MessageBuilder;

/// Offset of the terminating op, written as an unsigned 32-bit all-ones value.
pub const SENTINEL_OFFSET: u64 = 0xFFFF_FFFF;

/// Encode `text` as a base64 gzip document ready for a `TitleDocument` or
/// `NotesDocument` field.
///
/// # Errors
///
/// Returns [`CodecError::CompressionFailed`] if gzip compression fails.
pub fn encode_document(text: &str) -> CodecResult<String> {
    let message = document_message(text, Uuid::new_v4());
    let compressed = compress(&message)?;
    Ok(BASE64_STANDARD.encode(compressed))
}

/// Build the uncompressed message for `text` using `replica_id` as the
/// metadata identifier.
///
/// Every length in the message except the text field's own prefix is a
/// character count.
pub fn document_message(text: &str, replica_id: Uuid) -> Vec<u8> {
    let chars = text.chars().count() as u64;

    let note = MessageBuilder::new()
        .bytes(2, text.as_bytes())
        .message(3, op(0, 0, 0, Some(1)))
        .message(3, op(1, 0, chars, Some(2)))
        .message(3, op(0, SENTINEL_OFFSET, 0, None))
        .message(4, metadata(replica_id, chars))
        .message(5, MessageBuilder::new().varint(1, chars));

    let document = MessageBuilder::new()
        .varint(1, 0)
        .varint(2, 0)
        .message(3, note);

    MessageBuilder::new()
        .varint(1, 0)
        .message(2, document)
        .into_bytes()
}

fn position(replica: u64, offset: u64) -> MessageBuilder {
    MessageBuilder::new().varint(1, replica).varint(2, offset)
}

fn op(replica: u64, offset: u64, length: u64, marker: Option<u64>) -> MessageBuilder {
    let op = MessageBuilder::new()
        .message(1, position(replica, offset))
        .varint(2, length)
        .message(3, position(replica, offset));
    match marker {
        Some(marker) => op.varint(5, marker),
        None => op,
    }
}

fn metadata(replica_id: Uuid, chars: u64) -> MessageBuilder {
    let entry = MessageBuilder::new()
        .bytes(1, replica_id.as_bytes())
        .message(2, MessageBuilder::new().varint(1, chars))
        .message(2, MessageBuilder::new().varint(1, chars));
    MessageBuilder::new().message(1, entry)
}

fn compress(bytes: &[u8]) -> CodecResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| CodecError::compression_failed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::compression_failed(e.to_string()))
}
