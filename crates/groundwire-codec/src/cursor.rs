//! Byte cursor with positioned parse failures.

use thiserror::Error;

/// A failed parse: where it happened and what the parser was looking for.
///
/// Failures are values, not panics. They terminate the current parse branch
/// only; [`crate::alternative`] catches them, restores the cursor, and tries
/// the next branch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse failure at byte {position}: expected {expected}")]
pub struct ParseFailure {
    /// Byte offset at which the parser gave up.
    pub position: usize,
    /// Human-readable description of the expected input.
    pub expected: &'static str,
}

/// Result alias for cursor-based parsers.
pub type ParseResult<T> = Result<T, ParseFailure>;

/// Forward-only cursor over a byte slice.
///
/// Reads advance the position; a failed read leaves the position untouched.
/// There is no destructive backtracking: rewinding is only possible to an
/// explicitly saved [`Cursor::checkpoint`].
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// The unread tail of the input.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Saves the current position for a later [`Cursor::restore`].
    #[must_use]
    pub fn checkpoint(&self) -> usize {
        self.pos
    }

    /// Rewinds to a previously saved checkpoint.
    pub fn restore(&mut self, checkpoint: usize) {
        debug_assert!(checkpoint <= self.buf.len());
        self.pos = checkpoint;
    }

    /// Builds a failure at the current position.
    #[must_use]
    pub fn fail(&self, expected: &'static str) -> ParseFailure {
        ParseFailure { position: self.pos, expected }
    }

    /// Consumes `n` bytes.
    pub fn take_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(self.fail("more bytes"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consumes one byte.
    pub fn u8(&mut self) -> ParseResult<u8> {
        match self.peek() {
            Some(byte) => {
                self.pos += 1;
                Ok(byte)
            },
            None => Err(self.fail("a byte")),
        }
    }

    /// Consumes one byte and checks it against an expected value.
    pub fn expect_u8(&mut self, expected: u8, what: &'static str) -> ParseResult<u8> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(expected)
        } else {
            Err(self.fail(what))
        }
    }

    /// Little-endian u16.
    pub fn u16_le(&mut self) -> ParseResult<u16> {
        let bytes = self.take_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Little-endian u32.
    pub fn u32_le(&mut self) -> ParseResult<u32> {
        let bytes = self.take_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Little-endian u64.
    pub fn u64_le(&mut self) -> ParseResult<u64> {
        let bytes = self.take_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(arr))
    }

    /// Big-endian u16.
    pub fn u16_be(&mut self) -> ParseResult<u16> {
        let bytes = self.take_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Big-endian u32.
    pub fn u32_be(&mut self) -> ParseResult<u32> {
        let bytes = self.take_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
