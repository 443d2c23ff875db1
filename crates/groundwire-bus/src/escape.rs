//! Preamble escaping.
//!
//! The tunnel's frame preamble is the literal byte `'S'` (0x53). Inside a
//! frame, every `'S'` in the length byte and payload is escaped by
//! duplication, so an un-doubled `'S'` on the wire is always a frame start.

/// Frame preamble byte.
pub const PREAMBLE: u8 = b'S';

/// Appends `byte` to `out`, doubling it if it is the preamble.
pub fn escape_byte_into(out: &mut Vec<u8>, byte: u8) {
    out.push(byte);
    if byte == PREAMBLE {
        out.push(byte);
    }
}

/// Appends `bytes` to `out` with every preamble byte doubled.
pub fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        escape_byte_into(out, byte);
    }
}

/// Wire length of `bytes` after escape expansion.
#[must_use]
pub fn escaped_len(bytes: &[u8]) -> usize {
    bytes.len() + bytes.iter().filter(|&&b| b == PREAMBLE).count()
}
