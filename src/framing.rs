//! Key-request framing for the FairPlay license exchange.
//!
//! A key session is opened with a combined request buffer: the raw init data,
//! the extracted content identifier, and the application certificate, joined
//! with little-endian length prefixes. The layout must match the license
//! server byte for byte.

use crate::codec::{utf16_bytes, utf16_string};

/// Extract the content identifier from key-system init data.
///
/// Init data decodes to a UTF-16 locator (`skd://host/<content id>`); the
/// identifier is the text after the final `/`. Data without a separator
/// yields the whole decoded text. No validation is performed.
#[must_use]
pub fn extract_content_id(init_data: &[u8]) -> String {
    let locator = utf16_string(init_data);
    locator.rsplit('/').next().unwrap_or("").to_string()
}

/// Build the combined key request buffer.
///
/// Layout: `[init data][u32 LE: content id byte length][content id as UTF-16
/// LE][u32 LE: certificate length][certificate]`. Length fields are
/// little-endian regardless of host endianness; there is no padding.
#[must_use]
pub fn build_key_request(init_data: &[u8], content_id: &str, certificate: &[u8]) -> Vec<u8> {
    let content_id = utf16_bytes(content_id);

    let mut out =
        Vec::with_capacity(init_data.len() + 4 + content_id.len() + 4 + certificate.len());
    out.extend_from_slice(init_data);
    out.extend_from_slice(&(content_id.len() as u32).to_le_bytes());
    out.extend_from_slice(&content_id);
    out.extend_from_slice(&(certificate.len() as u32).to_le_bytes());
    out.extend_from_slice(certificate);
    out
}
