//! Error types for the tunnel and the device registry.
//!
//! Parser and framing errors are values handed back to the reader loop;
//! transport errors terminate the owning bus thread; registry errors are
//! raised eagerly at construction time.

use thiserror::Error;

/// Failure of the underlying byte channel.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No byte arrived within the transport's read timeout.
    #[error("transport read timed out")]
    TimedOut,

    /// The peer end of the channel is gone.
    #[error("transport closed by peer")]
    Closed,
}

/// Errors produced by tunnel framing and the device registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The underlying byte channel failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Expected a frame preamble, read something else.
    #[error("tunnel desync: expected preamble 0x53, got {got:#04x}")]
    Desync {
        /// The byte actually read.
        got: u8,
    },

    /// The frame's command byte is not in the command table.
    #[error("unknown tunnel command {command:#04x}")]
    UnknownCommand {
        /// The offending command byte.
        command: u8,
    },

    /// A frame payload longer than the single-byte length field allows.
    #[error("frame payload too large: {len} bytes exceeds 255")]
    FrameTooLarge {
        /// Attempted payload length.
        len: usize,
    },

    /// Bus addresses are 7-bit.
    #[error("bus address out of range: {address:#04x}")]
    AddressOutOfRange {
        /// The offending address.
        address: u8,
    },

    /// A device is already registered at this address.
    #[error("address {address:#04x} already registered")]
    RegistryConflict {
        /// The contested address.
        address: u8,
    },
}

/// Result alias for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
