//! Hex text representation of configuration payloads
//!
//! The service channel carries JSON text, so binary payloads travel as
//! lowercase hex digit pairs.

use crate::{CodecError, CodecResult};

/// Encode bytes as lowercase hex, two digits per byte, in buffer order.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(hex_digit(byte >> 4));
        out.push(hex_digit(byte & 0x0F));
    }
    out
}

/// Decode a string of hex digit pairs.
///
/// Both cases are accepted. Odd-length input and non-hex characters are
/// rejected rather than truncated.
pub fn hex_to_bytes(hex: &str) -> CodecResult<Vec<u8>> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(CodecError::OddHexLength { len: hex.len() });
    }

    let mut out = Vec::with_capacity(digits.len() / 2);
    for (pair_index, pair) in digits.chunks_exact(2).enumerate() {
        let position = pair_index * 2;
        let (hi, lo) = match pair {
            [hi, lo] => (*hi, *lo),
            _ => continue,
        };
        let hi = nibble(hi).ok_or_else(|| invalid_digit(hex, position))?;
        let lo = nibble(lo).ok_or_else(|| invalid_digit(hex, position + 1))?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16).unwrap_or('0')
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

fn invalid_digit(hex: &str, position: usize) -> CodecError {
    // Report the character, not the raw byte, so multi-byte UTF-8 shows up intact.
    let found = hex
        .char_indices()
        .find(|(index, ch)| *index <= position && position < index + ch.len_utf8())
        .map(|(_, ch)| ch)
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    CodecError::InvalidHexDigit { position, found }
}
