//! # Reminders Codec
//!
//! Encoding and decoding of the CRDT text documents stored in the
//! `TitleDocument` and `NotesDocument` fields of reminder records.
//!
//! A document is a small protobuf-style message, gzip compressed and
//! base64 encoded. This crate does not implement a general protobuf schema:
//! the encoder emits the one fixed shape the service accepts for a freshly
//! written string, and the decoder recovers text heuristically.
//!
//! ## Document Shape
//!
//! - A zero-length start marker op
//! - One op inserting every character
//! - A terminating sentinel op at offset `0xFFFF_FFFF`
//! - One metadata block with a random 128-bit replica identifier
//! - One attribute run covering the whole text
//!
//! All semantic lengths are character counts, not byte counts.
//!
//! ## Usage
//!
//! ```
//! use reminders_codec::{decode_document, encode_document};
//!
//! let wire = encode_document("Buy milk").unwrap();
//! assert_eq!(decode_document(&wire), "Buy milk");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
pub mod wire;

pub use decoder::{decode_document, extract_text, unpack_document};
pub use encoder::{document_message, encode_document, SENTINEL_OFFSET};
pub use error::{CodecError, CodecResult};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wire::{WireReader, WireValue};

    fn nested(value: &WireValue<'_>) -> Vec<(u32, u64)> {
        WireReader::new(value.as_bytes().unwrap())
            .collect_fields()
            .unwrap()
            .into_iter()
            .filter_map(|(n, v)| v.as_varint().map(|v| (n, v)))
            .collect()
    }

    fn printable_text() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            "[a-zA-Z0-9 ,.!?-]{1,6}",
            "[àéîõüßçñ]{1,3}",
            "[日本語中文한국어]{1,3}",
            "[😀🎉🛒]{1,2}",
        ];
        proptest::collection::vec(piece, 1..8)
            .prop_map(|parts| parts.concat())
            .prop_filter("needs two visible characters", |s| {
                s.trim().chars().count() >= 2
            })
    }

    proptest! {
        #[test]
        fn roundtrip_printable_text(text in printable_text()) {
            let wire = encode_document(&text).unwrap();
            prop_assert_eq!(decode_document(&wire), text.trim());
        }

        #[test]
        fn lengths_are_character_counts(text in printable_text()) {
            let chars = text.chars().count() as u64;
            let message = unpack_document(&encode_document(&text).unwrap()).unwrap();

            let outer = WireReader::new(&message).collect_fields().unwrap();
            let document = WireReader::new(outer[1].1.as_bytes().unwrap())
                .collect_fields()
                .unwrap();
            let note = WireReader::new(document[2].1.as_bytes().unwrap())
                .collect_fields()
                .unwrap();

            prop_assert_eq!(note[0].1, WireValue::Bytes(text.as_bytes()));
            prop_assert!(nested(&note[2].1).contains(&(2, chars)));
            prop_assert_eq!(nested(&note[5].1), vec![(1, chars)]);

            let metadata = WireReader::new(note[4].1.as_bytes().unwrap())
                .collect_fields()
                .unwrap();
            let entry = WireReader::new(metadata[0].1.as_bytes().unwrap())
                .collect_fields()
                .unwrap();
            prop_assert_eq!(nested(&entry[1].1), vec![(1, chars)]);
            prop_assert_eq!(nested(&entry[2].1), vec![(1, chars)]);
        }

        #[test]
        fn decode_never_panics(input in ".{0,64}") {
            let _ = decode_document(&input);
        }
    }
}
