//! Heuristic document decoder.
//!
//! Decoding does not parse the message. It scans the decompressed bytes for
//! the first run of printable text, which is where the note's text field
//! sits in every document the service produces.

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;

use crate::error::{CodecError, CodecResult};
use crate::wire::read_varint;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Minimum number of characters a run must have to count as text.
const MIN_TEXT_CHARS: usize = 2;

/// Decode a base64 document into its text.
///
/// Never fails: empty, malformed, or textless input yields an empty string.
/// Payloads that are not gzip compressed are treated as plain text.
pub fn decode_document(wire: &str) -> String {
    let wire = wire.trim();
    if wire.is_empty() {
        return String::new();
    }
    let raw = match BASE64_STANDARD.decode(wire) {
        Ok(raw) => raw,
        Err(_) => return String::new(),
    };
    if !raw.starts_with(&GZIP_MAGIC) {
        return String::from_utf8_lossy(&raw).trim().to_string();
    }
    match decompress(&raw) {
        Ok(message) => extract_text(&message),
        Err(_) => String::new(),
    }
}

/// Base64-decode and decompress a document, returning the raw message.
///
/// # Errors
///
/// Fails if the input is not base64, is not gzip, or does not inflate.
pub fn unpack_document(wire: &str) -> CodecResult<Vec<u8>> {
    let raw = BASE64_STANDARD
        .decode(wire.trim())
        .map_err(|e| CodecError::invalid_base64(e.to_string()))?;
    if !raw.starts_with(&GZIP_MAGIC) {
        return Err(CodecError::NotCompressed);
    }
    decompress(&raw)
}

fn decompress(raw: &[u8]) -> CodecResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(raw);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::decompression_failed(e.to_string()))?;
    Ok(out)
}

/// Return the first printable run in `message` that has at least two
/// characters after trimming.
pub fn extract_text(message: &[u8]) -> String {
    for (start, end) in printable_runs(message) {
        let start = peel_length_prefix(message, start, end);
        // Runs are built from valid chunks and peeling stops on char boundaries.
        let Ok(run) = std::str::from_utf8(&message[start..end]) else {
            continue;
        };
        let text = run.trim();
        if text.chars().count() >= MIN_TEXT_CHARS {
            return text.to_string();
        }
    }
    String::new()
}

fn is_printable(c: char) -> bool {
    !matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}')
}

/// Byte ranges of maximal printable runs. Invalid UTF-8 ends a run.
fn printable_runs(message: &[u8]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut offset = 0;
    let mut current: Option<usize> = None;

    for chunk in message.utf8_chunks() {
        for (i, c) in chunk.valid().char_indices() {
            let at = offset + i;
            match (is_printable(c), current) {
                (true, None) => current = Some(at),
                (false, Some(start)) => {
                    runs.push((start, at));
                    current = None;
                }
                _ => {}
            }
        }
        offset += chunk.valid().len();
        if let Some(start) = current.take() {
            if !chunk.invalid().is_empty() {
                runs.push((start, offset));
            } else {
                current = Some(start);
            }
        }
        offset += chunk.invalid().len();
    }
    if let Some(start) = current {
        runs.push((start, offset));
    }
    runs
}

/// Strip the text field's own length prefix when it leaked into the run.
///
/// A title of 32 to 126 bytes has a printable length byte, which then reads
/// as the first character of the run. A varint starting at or just before
/// the run, ending inside it, and whose value equals the rest of the run is
/// taken to be that prefix.
fn peel_length_prefix(message: &[u8], start: usize, end: usize) -> usize {
    for q in start.saturating_sub(2)..=start {
        let Some((value, next)) = read_varint(message, q) else {
            continue;
        };
        if next >= start
            && next < end
            && value == (end - next) as u64
            && std::str::from_utf8(&message[next..end]).is_ok()
        {
            return next;
        }
    }
    start
}
