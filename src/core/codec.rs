//! Hex codec
//!
//! Converts operator-typed hex text into raw payload bytes and renders
//! bytes back as spaced, uppercase hex for display and logging.

use crate::domain::error::{HexLinkError, HexLinkResult};

/// Strip all whitespace and upper-case the remaining characters.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Parse hex text into bytes.
///
/// Whitespace anywhere in the input is ignored, so both `"A00101A2"` and
/// `"A0 01 01 A2"` are accepted. The cleaned text must be a non-empty,
/// even-length run of hex digits.
pub fn encode(text: &str) -> HexLinkResult<Vec<u8>> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(HexLinkError::InvalidHex("hex code is empty".to_string()));
    }

    hex::decode(&cleaned).map_err(|e| match e {
        hex::FromHexError::OddLength => HexLinkError::InvalidHex(format!(
            "'{}' has an odd number of digits ({})",
            cleaned,
            cleaned.len()
        )),
        hex::FromHexError::InvalidHexCharacter { c, index } => HexLinkError::InvalidHex(
            format!("'{}' contains non-hex character '{}' at {}", cleaned, c, index),
        ),
        other => HexLinkError::InvalidHex(other.to_string()),
    })
}

/// Render bytes as two uppercase digits per byte, separated by single spaces.
pub fn decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group hex text into display pairs: `"a00101a2"` becomes `"A0 01 01 A2"`.
///
/// Purely presentational; a trailing odd digit is kept as its own group.
pub fn format_hex(text: &str) -> String {
    let cleaned = normalize(text);
    cleaned
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
