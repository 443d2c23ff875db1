//! Transport abstraction under the tunnel framing.
//!
//! The core speaks to its peer over any duplex byte channel: a serial port
//! on real hardware, an in-memory pipe in tests. The channel is split once
//! at startup; the reader half lives on the bus thread, the writer half is
//! shared behind a lock so responses stay atomic after escape expansion.

use crate::error::TransportError;

/// Blocking byte source. Reads carry the transport's own timeout.
pub trait TunnelReader: Send {
    /// Reads one byte, blocking up to the transport's read timeout.
    ///
    /// # Errors
    ///
    /// [`TransportError::TimedOut`] when no byte arrived in time,
    /// [`TransportError::Closed`] when the peer is gone.
    fn read_byte(&mut self) -> Result<u8, TransportError>;
}

/// Blocking byte sink.
pub trait TunnelWriter: Send {
    /// Writes the whole buffer.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] when the peer is gone.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// A duplex byte channel that can be split into its two directions.
pub trait TunnelTransport {
    /// Reading half, moved onto the bus thread.
    type Reader: TunnelReader + 'static;
    /// Writing half, shared behind a per-bus lock.
    type Writer: TunnelWriter + 'static;

    /// Consumes the transport, yielding both halves.
    fn split(self) -> (Self::Reader, Self::Writer);
}
