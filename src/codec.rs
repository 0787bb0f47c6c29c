//! Byte-buffer codecs shared by the framing and licensing layers.
//!
//! FairPlay init data carries a UTF-16 little-endian locator string, and key
//! messages travel to the license server as base64 text.

use base64::Engine;
use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;

/// Encode bytes as standard base64 (`A-Za-z0-9+/` with `=` padding).
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a standard, validly padded base64 string.
pub fn base64_decode(data: &str) -> Result<Vec<u8>> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
}

/// Encode each UTF-16 code unit of `text` as two little-endian bytes.
///
/// This is a code-unit copy, not a UTF-8 transcode: characters above the
/// basic multilingual plane emit their two surrogate halves independently.
#[must_use]
pub fn utf16_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Reinterpret a byte buffer as little-endian UTF-16 code units.
///
/// A trailing odd byte is ignored. Unpaired surrogates become U+FFFD.
#[must_use]
pub fn utf16_string(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .collect::<Vec<u16>>();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::{base64_decode, base64_encode, utf16_bytes, utf16_string};

    #[test]
    fn base64_known_vectors() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_encode(b"M"), "TQ==");
        assert_eq!(base64_encode(b"Ma"), "TWE=");
        assert_eq!(base64_encode(b"Man"), "TWFu");
    }

    #[test]
    fn base64_roundtrip() {
        let data = (0u8..=255).collect::<Vec<u8>>();
        let decoded = base64_decode(&base64_encode(&data)).expect("decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn utf16_roundtrip() {
        let text = "skd://fairplay.example/abc123";
        assert_eq!(utf16_string(&utf16_bytes(text)), text);
    }

    #[test]
    fn utf16_bytes_are_little_endian_pairs() {
        assert_eq!(utf16_bytes("A\u{00e9}"), vec![0x41, 0x00, 0xe9, 0x00]);
    }

    #[test]
    fn utf16_string_drops_trailing_odd_byte() {
        assert_eq!(utf16_string(&[0x41, 0x00, 0x42]), "A");
    }

    #[test]
    fn utf16_empty() {
        assert_eq!(utf16_bytes(""), Vec::<u8>::new());
        assert_eq!(utf16_string(&[]), "");
    }
}
