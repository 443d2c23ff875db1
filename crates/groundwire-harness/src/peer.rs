//! A scripted stand-in for the device-under-test.
//!
//! Drives the peer side of the tunnel from a test: answers the harness's
//! `RESTART` with `VERSION`, issues bus writes and collects the responses.
//! Where the real flight software runs the protocol state machine, tests
//! call these methods in the order the scenario needs.

use groundwire_bus::{
    BusError, CommandCode, FrameReader, Result, TunnelFrame, TunnelTransport, write_frame,
};

/// The peer end of one bus tunnel.
pub struct PeerTunnel<T: TunnelTransport> {
    frames: FrameReader<T::Reader>,
    writer: T::Writer,
}

impl<T: TunnelTransport> PeerTunnel<T> {
    /// Wraps the peer end of a transport.
    pub fn new(transport: T) -> Self {
        let (reader, writer) = transport.split();
        Self { frames: FrameReader::new(reader), writer }
    }

    /// Reads one frame from the harness.
    ///
    /// # Errors
    ///
    /// Framing and transport errors from the underlying reader.
    pub fn read_frame(&mut self) -> Result<TunnelFrame> {
        self.frames.read_frame()
    }

    /// Reads one frame and checks its command.
    ///
    /// # Errors
    ///
    /// [`BusError::UnknownCommand`] carrying the actual command byte when
    /// the frame is not the expected one.
    pub fn expect(&mut self, command: CommandCode) -> Result<TunnelFrame> {
        let frame = self.read_frame()?;
        if frame.command == command {
            Ok(frame)
        } else {
            tracing::warn!(expected = ?command, got = ?frame.command, "unexpected frame");
            Err(BusError::UnknownCommand { command: frame.command as u8 })
        }
    }

    /// Consumes the `RESTART` the harness sends at startup.
    ///
    /// # Errors
    ///
    /// As [`PeerTunnel::expect`].
    pub fn expect_restart(&mut self) -> Result<()> {
        self.expect(CommandCode::Restart).map(|_| ())
    }

    /// Completes the handshake, enabling dispatch on the harness side.
    ///
    /// # Errors
    ///
    /// Transport errors from the write.
    pub fn send_version(&mut self, version: u8) -> Result<()> {
        write_frame(&mut self.writer, CommandCode::Version, &[version])
    }

    /// Issues a bus write to `address` with the given data bytes.
    ///
    /// # Errors
    ///
    /// Transport errors from the write.
    pub fn i2c_write(&mut self, address: u8, data: &[u8]) -> Result<()> {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(address << 1);
        payload.extend_from_slice(data);
        write_frame(&mut self.writer, CommandCode::I2cWrite, &payload)
    }

    /// Reads frames until the next `I2C_RESPONSE` and returns its payload.
    ///
    /// Notification frames (`UNLATCH`) are skipped; the response to a
    /// latched write arrives only after the harness releases the latch.
    ///
    /// # Errors
    ///
    /// Framing and transport errors, including the read timeout while a
    /// latch is held.
    pub fn read_response(&mut self) -> Result<Vec<u8>> {
        loop {
            let frame = self.read_frame()?;
            match frame.command {
                CommandCode::I2cResponse => return Ok(frame.payload),
                other => {
                    tracing::debug!(command = ?other, "skipping notification frame");
                },
            }
        }
    }

    /// Acknowledges shutdown; the harness's bus thread exits on receipt.
    ///
    /// # Errors
    ///
    /// Transport errors from the write.
    pub fn send_stopped(&mut self) -> Result<()> {
        write_frame(&mut self.writer, CommandCode::Stopped, &[])
    }
}

impl<T: TunnelTransport> std::fmt::Debug for PeerTunnel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerTunnel").finish_non_exhaustive()
    }
}
