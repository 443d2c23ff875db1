//! Tunnel command framing.
//!
//! Every message between harness and peer is one frame:
//!
//! ```text
//! 'S' cmd:u8 len:u8 payload
//! ```
//!
//! `len` counts payload bytes before escape expansion; on the wire, `cmd`,
//! `len` and every payload byte have the preamble escaped by duplication
//! (see [`crate::escape`]). The single-byte length field caps payloads at
//! 255 bytes.

use crate::error::{BusError, Result};
use crate::escape::{self, PREAMBLE};
use crate::transport::{TunnelReader, TunnelWriter};

/// The tunnel command set. Values are the on-wire `cmd` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    /// Peer announces its protocol version; enables dispatch.
    Version = 0x01,
    /// Peer writes to a bus address: `addr_dir:u8, data…`.
    I2cWrite = 0x02,
    /// Harness returns a device's response bytes.
    I2cResponse = 0x03,
    /// Harness disables the peer's bus driver.
    I2cDisable = 0x04,
    /// Harness enables the peer's bus driver.
    I2cEnable = 0x05,
    /// Harness asks the peer to restart; peer answers with `Version`.
    Restart = 0x06,
    /// Harness notifies the peer a latched response was released.
    Unlatch = 0x07,
    /// Harness asks the peer to shut down.
    Stop = 0x08,
    /// Peer acknowledges shutdown; the bus thread exits.
    Stopped = 0x09,
}

impl CommandCode {
    /// Decodes a `cmd` byte.
    #[must_use]
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Version),
            0x02 => Some(Self::I2cWrite),
            0x03 => Some(Self::I2cResponse),
            0x04 => Some(Self::I2cDisable),
            0x05 => Some(Self::I2cEnable),
            0x06 => Some(Self::Restart),
            0x07 => Some(Self::Unlatch),
            0x08 => Some(Self::Stop),
            0x09 => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// A decoded tunnel frame: command plus unescaped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelFrame {
    /// The frame's command.
    pub command: CommandCode,
    /// Unescaped payload bytes.
    pub payload: Vec<u8>,
}

/// Encodes one frame, escape-expanding everything after the preamble.
///
/// # Errors
///
/// [`BusError::FrameTooLarge`] when the payload exceeds 255 bytes.
pub fn encode_frame(command: CommandCode, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > u8::MAX as usize {
        return Err(BusError::FrameTooLarge { len: payload.len() });
    }
    let mut wire = Vec::with_capacity(3 + escape::escaped_len(payload));
    wire.push(PREAMBLE);
    escape::escape_byte_into(&mut wire, command as u8);
    escape::escape_byte_into(&mut wire, payload.len() as u8);
    escape::escape_into(&mut wire, payload);
    Ok(wire)
}

/// Streaming frame reader over a transport's read half.
///
/// Keeps no buffer of its own: each frame is pulled byte by byte, so a
/// timeout surfaces between frames and the reader can be polled again.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
}

impl<R: TunnelReader> FrameReader<R> {
    /// Wraps a transport read half.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads one complete frame.
    ///
    /// # Errors
    ///
    /// [`BusError::Desync`] when the stream is not at a frame boundary,
    /// [`BusError::UnknownCommand`] for a `cmd` byte outside the table, and
    /// transport errors from the underlying channel.
    pub fn read_frame(&mut self) -> Result<TunnelFrame> {
        let preamble = self.inner.read_byte()?;
        if preamble != PREAMBLE {
            return Err(BusError::Desync { got: preamble });
        }
        let cmd = self.read_unescaped()?;
        let command = CommandCode::from_wire(cmd).ok_or(BusError::UnknownCommand { command: cmd })?;
        let len = self.read_unescaped()? as usize;
        let mut payload = Vec::with_capacity(len);
        for _ in 0..len {
            payload.push(self.read_unescaped()?);
        }
        Ok(TunnelFrame { command, payload })
    }

    /// Reads one logical byte, collapsing a doubled preamble.
    ///
    /// A lone preamble inside a frame means the peer started a new frame
    /// mid-way; that is a desync, not a literal.
    fn read_unescaped(&mut self) -> Result<u8> {
        let byte = self.inner.read_byte()?;
        if byte != PREAMBLE {
            return Ok(byte);
        }
        let second = self.inner.read_byte()?;
        if second == PREAMBLE {
            Ok(PREAMBLE)
        } else {
            Err(BusError::Desync { got: second })
        }
    }
}

/// Writes one frame through the shared writer half.
///
/// Callers hold the per-bus writer lock across the call so the escaped
/// frame hits the wire contiguously.
pub fn write_frame<W: TunnelWriter>(
    writer: &mut W,
    command: CommandCode,
    payload: &[u8],
) -> Result<()> {
    let wire = encode_frame(command, payload)?;
    writer.write_all(&wire)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    /// Feeds a fixed byte script, then times out.
    struct Script {
        bytes: std::vec::IntoIter<u8>,
    }

    impl Script {
        fn new(bytes: impl Into<Vec<u8>>) -> FrameReader<Self> {
            FrameReader::new(Self { bytes: bytes.into().into_iter() })
        }
    }

    impl TunnelReader for Script {
        fn read_byte(&mut self) -> std::result::Result<u8, TransportError> {
            self.bytes.next().ok_or(TransportError::TimedOut)
        }
    }

    #[test]
    fn frame_round_trip() {
        let wire = encode_frame(CommandCode::I2cWrite, &[0xC0, 0xAA, 0x01]).unwrap();
        assert_eq!(wire, [b'S', 0x02, 0x03, 0xC0, 0xAA, 0x01]);

        let frame = Script::new(wire).read_frame().unwrap();
        assert_eq!(frame.command, CommandCode::I2cWrite);
        assert_eq!(frame.payload, [0xC0, 0xAA, 0x01]);
    }

    #[test]
    fn preamble_in_payload_and_len_is_escaped() {
        // 'S' == 0x53 == 83: a payload of 83 bytes forces the len byte to be
        // escaped too.
        let payload = vec![b'S'; 83];
        let wire = encode_frame(CommandCode::I2cResponse, &payload).unwrap();
        assert_eq!(&wire[..4], [b'S', 0x03, b'S', b'S']);
        assert_eq!(wire.len(), 4 + 83 * 2);

        let frame = Script::new(wire).read_frame().unwrap();
        assert_eq!(frame.payload, payload);
    }

    #[test]
    fn oversize_payload_is_rejected() {
        assert_eq!(
            encode_frame(CommandCode::I2cResponse, &[0u8; 256]),
            Err(BusError::FrameTooLarge { len: 256 })
        );
    }

    #[test]
    fn lone_preamble_mid_frame_is_desync() {
        // Payload claims 2 bytes but a new frame starts after the first.
        let frame = Script::new(vec![b'S', 0x03, 0x02, 0xAA, b'S', 0x03]).read_frame();
        assert_eq!(frame, Err(BusError::Desync { got: 0x03 }));
    }

    #[test]
    fn garbage_before_preamble_is_desync() {
        assert_eq!(Script::new(vec![0x00]).read_frame(), Err(BusError::Desync { got: 0x00 }));
        assert_eq!(
            Script::new(vec![b'S', 0x7F, 0x00]).read_frame(),
            Err(BusError::UnknownCommand { command: 0x7F })
        );
    }

    #[test]
    fn timeout_surfaces_between_frames() {
        let mut reader = Script::new(encode_frame(CommandCode::Stop, &[]).unwrap());
        assert!(reader.read_frame().is_ok());
        assert_eq!(reader.read_frame(), Err(BusError::Transport(TransportError::TimedOut)));
    }
}
