//! Protobuf-style wire primitives.
//!
//! Only the two wire shapes the document format uses are supported:
//! base-128 varints and length-delimited byte strings.

use crate::error::{CodecError, CodecResult};

/// Longest legal varint encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

/// Wire shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Base-128 varint.
    Varint = 0,
    /// Length-prefixed byte string or embedded message.
    LengthDelimited = 2,
}

impl WireType {
    fn from_bits(field: u32, bits: u8) -> CodecResult<Self> {
        match bits {
            0 => Ok(Self::Varint),
            2 => Ok(Self::LengthDelimited),
            other => Err(CodecError::UnsupportedWireType {
                field,
                wire_type: other,
            }),
        }
    }
}

/// Append `value` as a base-128 varint.
pub fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Append a field tag.
pub fn put_tag(buf: &mut Vec<u8>, field: u32, wire_type: WireType) {
    put_varint(buf, (u64::from(field) << 3) | wire_type as u64);
}

/// Read a varint starting at `pos`.
///
/// Returns the value and the index just past the varint, or `None` if the
/// input ends first or the encoding is longer than ten bytes.
pub fn read_varint(bytes: &[u8], pos: usize) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in bytes.get(pos..)?.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, pos + i + 1));
        }
    }
    None
}

/// Incremental builder for one message.
///
/// Nested messages are built separately and attached with
/// [`MessageBuilder::message`].
#[derive(Debug, Default, Clone)]
pub struct MessageBuilder {
    buffer: Vec<u8>,
}

impl MessageBuilder {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a varint field.
    pub fn varint(mut self, field: u32, value: u64) -> Self {
        put_tag(&mut self.buffer, field, WireType::Varint);
        put_varint(&mut self.buffer, value);
        self
    }

    /// Append a length-delimited byte field.
    pub fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        put_tag(&mut self.buffer, field, WireType::LengthDelimited);
        put_varint(&mut self.buffer, value.len() as u64);
        self.buffer.extend_from_slice(value);
        self
    }

    /// Append an embedded message field.
    pub fn message(self, field: u32, nested: MessageBuilder) -> Self {
        self.bytes(field, &nested.buffer)
    }

    /// Encoded bytes so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the builder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    /// Varint payload.
    Varint(u64),
    /// Length-delimited payload, borrowed from the input.
    Bytes(&'a [u8]),
}

impl<'a> WireValue<'a> {
    /// The varint payload, if this is a varint.
    pub fn as_varint(&self) -> Option<u64> {
        match self {
            Self::Varint(v) => Some(*v),
            Self::Bytes(_) => None,
        }
    }

    /// The byte payload, if this is length-delimited.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Varint(_) => None,
        }
    }
}

/// Sequential reader over one encoded message.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader over `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Returns true when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Read the next `(field, value)` pair, or `None` at end of input.
    pub fn next_field(&mut self) -> CodecResult<Option<(u32, WireValue<'a>)>> {
        if self.is_empty() {
            return Ok(None);
        }
        let tag = self.varint()?;
        let field = (tag >> 3) as u32;
        let value = match WireType::from_bits(field, (tag & 0x7) as u8)? {
            WireType::Varint => WireValue::Varint(self.varint()?),
            WireType::LengthDelimited => {
                let len = self.varint()? as usize;
                let end = self
                    .pos
                    .checked_add(len)
                    .filter(|&end| end <= self.bytes.len())
                    .ok_or(CodecError::UnexpectedEof)?;
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                WireValue::Bytes(slice)
            }
        };
        Ok(Some((field, value)))
    }

    /// Read every remaining field.
    pub fn collect_fields(mut self) -> CodecResult<Vec<(u32, WireValue<'a>)>> {
        let mut fields = Vec::new();
        while let Some(field) = self.next_field()? {
            fields.push(field);
        }
        Ok(fields)
    }

    fn varint(&mut self) -> CodecResult<u64> {
        match read_varint(self.bytes, self.pos) {
            Some((value, next)) => {
                self.pos = next;
                Ok(value)
            }
            None if self.bytes.len() - self.pos >= MAX_VARINT_LEN => {
                Err(CodecError::VarintOverflow)
            }
            None => Err(CodecError::UnexpectedEof),
        }
    }
}
