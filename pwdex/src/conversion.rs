//! Hex decoding for corpus lines and key rendering for error reporting.

use crate::KEY_LEN;

/// Convert hex ASCII character to nibble value (0-15).
#[inline]
pub fn hex_to_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Decode exactly 40 hex characters into a 20-byte key.
pub fn parse_hex_key(hex: &[u8]) -> Option<[u8; KEY_LEN]> {
    if hex.len() != KEY_LEN * 2 {
        return None;
    }

    let mut key = [0u8; KEY_LEN];
    for (byte, pair) in key.iter_mut().zip(hex.chunks_exact(2)) {
        *byte = (hex_to_nibble(pair[0])? << 4) | hex_to_nibble(pair[1])?;
    }
    Some(key)
}

/// Parse one corpus line of the form `<40 hex chars>:<decimal count>`.
///
/// The count is validated but discarded; only the key matters to the packed
/// dataset. Errors are static reasons for the caller to attach a line number
/// to.
pub fn parse_corpus_line(line: &[u8]) -> Result<[u8; KEY_LEN], &'static str> {
    if line.len() < KEY_LEN * 2 {
        return Err("line is shorter than a 40-character hex key");
    }

    let (hex, rest) = line.split_at(KEY_LEN * 2);
    let key = parse_hex_key(hex).ok_or("invalid hex character in key")?;

    match rest.split_first() {
        Some((b':', count)) if !count.is_empty() && count.iter().all(u8::is_ascii_digit) => Ok(key),
        Some((b':', _)) => Err("missing or non-decimal count after ':'"),
        _ => Err("expected ':' after the 40-character hex key"),
    }
}

/// Render a key as 40 uppercase hex characters.
pub fn key_to_hex(key: &[u8; KEY_LEN]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(KEY_LEN * 2);
    for &b in key {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0F) as usize] as char);
    }
    out
}
