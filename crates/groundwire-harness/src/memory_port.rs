//! In-memory duplex byte channel.
//!
//! Stands in for the serial port between harness and peer. Both ends
//! implement [`TunnelTransport`], so a test wires a [`TunnelCore`] to a
//! scripted peer without any I/O. Reads carry the timeout given at
//! construction, which is what drives the core's shutdown polling.
//!
//! [`TunnelCore`]: groundwire_bus::TunnelCore

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::Duration;

use groundwire_bus::{TransportError, TunnelReader, TunnelTransport, TunnelWriter};

/// One end of an in-memory duplex channel.
#[derive(Debug)]
pub struct MemoryPort {
    tx: Sender<u8>,
    rx: Receiver<u8>,
    read_timeout: Duration,
}

/// Creates a connected pair of ports with the given read timeout.
#[must_use]
pub fn duplex_pair(read_timeout: Duration) -> (MemoryPort, MemoryPort) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();
    (
        MemoryPort { tx: a_tx, rx: a_rx, read_timeout },
        MemoryPort { tx: b_tx, rx: b_rx, read_timeout },
    )
}

/// Reading half of a [`MemoryPort`].
#[derive(Debug)]
pub struct PortReader {
    rx: Receiver<u8>,
    read_timeout: Duration,
}

/// Writing half of a [`MemoryPort`].
#[derive(Debug)]
pub struct PortWriter {
    tx: Sender<u8>,
}

impl TunnelTransport for MemoryPort {
    type Reader = PortReader;
    type Writer = PortWriter;

    fn split(self) -> (PortReader, PortWriter) {
        (PortReader { rx: self.rx, read_timeout: self.read_timeout }, PortWriter { tx: self.tx })
    }
}

impl TunnelReader for PortReader {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.rx.recv_timeout(self.read_timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TransportError::TimedOut,
            RecvTimeoutError::Disconnected => TransportError::Closed,
        })
    }
}

impl TunnelWriter for PortWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for &byte in bytes {
            self.tx.send(byte).map_err(|_| TransportError::Closed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_cross_in_both_directions() {
        let (near, far) = duplex_pair(Duration::from_millis(100));
        let (mut near_rx, mut near_tx) = near.split();
        let (mut far_rx, mut far_tx) = far.split();

        near_tx.write_all(&[1, 2]).unwrap();
        assert_eq!(far_rx.read_byte(), Ok(1));
        assert_eq!(far_rx.read_byte(), Ok(2));

        far_tx.write_all(&[3]).unwrap();
        assert_eq!(near_rx.read_byte(), Ok(3));
    }

    #[test]
    fn empty_channel_times_out() {
        let (near, _far) = duplex_pair(Duration::from_millis(10));
        let (mut rx, _tx) = near.split();
        assert_eq!(rx.read_byte(), Err(TransportError::TimedOut));
    }

    #[test]
    fn dropped_peer_reads_closed() {
        let (near, far) = duplex_pair(Duration::from_millis(10));
        let (mut rx, _tx) = near.split();
        drop(far);
        assert_eq!(rx.read_byte(), Err(TransportError::Closed));
    }
}
