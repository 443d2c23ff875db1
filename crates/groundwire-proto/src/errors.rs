//! Error types for the radio frame codec and dispatcher.
//!
//! Parser errors are values: everything here is returned, never thrown
//! across a thread, and nothing in this crate panics on malformed input.

use bytes::Bytes;
use groundwire_codec::ParseFailure;
use thiserror::Error;

/// Errors produced while encoding, decoding or dispatching radio frames.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// Too few bytes to parse a downlink header.
    #[error("frame too short: need at least {expected} bytes, got {actual}")]
    ShortFrame {
        /// Minimum size for a header.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// Downlink APID outside the 6-bit range.
    #[error("apid out of range: {0} (downlink apids are 6-bit)")]
    ApidOutOfRange(u8),

    /// Downlink sequence number outside the 18-bit range.
    #[error("sequence number out of range: {0} (sequence numbers are 18-bit)")]
    SequenceOutOfRange(u32),

    /// Payload or content longer than the frame layout allows.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual length.
        size: usize,
        /// Layout maximum.
        max: usize,
    },

    /// No response-frame variant claimed the frame.
    #[error("no frame variant matches apid {apid:#04x} ({} payload bytes)", payload.len())]
    UnknownFrame {
        /// APID of the offending frame.
        apid: u8,
        /// Snapshot of the offending payload.
        payload: Bytes,
    },

    /// More than one response-frame variant claimed the frame.
    #[error("multiple frame variants match apid {apid:#04x} ({} payload bytes)", payload.len())]
    AmbiguousFrame {
        /// APID of the offending frame.
        apid: u8,
        /// Snapshot of the offending payload.
        payload: Bytes,
    },

    /// Strict experiment-file parse hit a record id it does not know.
    #[error("unknown experiment record id {pid:#04x} at byte {offset}")]
    UnknownPid {
        /// The unrecognized record id.
        pid: u8,
        /// Byte offset of the record id in the file.
        offset: usize,
    },

    /// The caller-supplied parse hook rejected the frame.
    #[error("frame rejected by parse hook (apid {apid:#04x})")]
    HookRejected {
        /// APID of the rejected frame.
        apid: u8,
    },

    /// A variant's payload decode failed part-way through.
    #[error(transparent)]
    Payload(#[from] ParseFailure),
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
