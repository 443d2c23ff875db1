//! Experiment payload mock.
//!
//! Two commands: a who-am-i register read and a measurement trigger. The
//! measurement response is latched, modeling hardware that raises a ready
//! line later; `unlatch()` stands in for that line.

use crate::device::{MockDevice, Response};
use crate::error::Result;

/// Bus address of the experiment payload.
pub const PAYLOAD_ADDRESS: u8 = 0x30;

/// Reads the who-am-i register.
const CMD_WHOAMI: u8 = 0x00;
/// Starts a measurement; the (empty) response is latched.
const CMD_MEASURE: u8 = 0x01;

/// Factory for the payload mock.
#[derive(Debug)]
pub struct PayloadMock;

impl PayloadMock {
    /// Builds the device with the given who-am-i value.
    ///
    /// # Errors
    ///
    /// Never fails for the fixed [`PAYLOAD_ADDRESS`]; the `Result` is the
    /// device constructor's.
    pub fn new(whoami: u8) -> Result<MockDevice> {
        let mut device = MockDevice::new(PAYLOAD_ADDRESS)?;
        device.register(vec![CMD_WHOAMI], Box::new(move |_| Response::bytes([whoami])));
        device.register(vec![CMD_MEASURE], Box::new(|_| Response::latched([])));
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whoami_and_measure() {
        let mut device = PayloadMock::new(0x53).unwrap();
        assert_eq!(device.handle_write(&[CMD_WHOAMI]).bytes, [0x53]);

        let response = device.handle_write(&[CMD_MEASURE]);
        assert!(response.latch);
        assert!(response.bytes.is_empty());
    }
}
