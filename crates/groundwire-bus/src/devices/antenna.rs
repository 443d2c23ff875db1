//! Antenna controller mock.
//!
//! Two controllers, one per bus address. Each arms, deploys four antennas
//! and reports a per-antenna activation count. Deploy commands are counted
//! only while armed, which is what the deployment procedure under test is
//! supposed to guarantee.

use std::sync::{Arc, Mutex, PoisonError};

use crate::device::{MockDevice, Response};
use crate::error::Result;

/// Primary antenna controller address.
pub const ANTENNA_PRIMARY_ADDRESS: u8 = 0x31;
/// Secondary (redundant) antenna controller address.
pub const ANTENNA_SECONDARY_ADDRESS: u8 = 0x32;

/// Disarms the controller.
const CMD_DISARM: u8 = 0xAC;
/// Arms the controller.
const CMD_ARM: u8 = 0xAD;
/// Deploys antenna 1..=4 at `CMD_DEPLOY_BASE + index`; one burn-time
/// argument byte.
const CMD_DEPLOY_BASE: u8 = 0xA1;
/// Reads antenna 1..=4 activation count at `CMD_ACTIVATION_BASE + index`.
const CMD_ACTIVATION_BASE: u8 = 0xB0;

#[derive(Debug, Default)]
struct AntennaState {
    armed: bool,
    activations: [u8; 4],
}

/// Test-side handle to one controller's state.
#[derive(Debug, Clone, Default)]
pub struct AntennaHandle {
    state: Arc<Mutex<AntennaState>>,
}

impl AntennaHandle {
    /// Whether the controller is armed.
    #[must_use]
    pub fn armed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).armed
    }

    /// Activation count of antenna `index` (0-based).
    #[must_use]
    pub fn activation_count(&self, index: usize) -> u8 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).activations[index]
    }
}

/// Factory for the antenna controller mock.
#[derive(Debug)]
pub struct AntennaMock;

impl AntennaMock {
    /// Builds a controller at `address` and the handle sharing its state.
    ///
    /// # Errors
    ///
    /// [`crate::BusError::AddressOutOfRange`] for a non-7-bit address.
    pub fn new(address: u8) -> Result<(MockDevice, AntennaHandle)> {
        let handle = AntennaHandle::default();
        let mut device = MockDevice::new(address)?;

        let state = Arc::clone(&handle.state);
        device.register(vec![CMD_ARM], Box::new(move |_| {
            state.lock().unwrap_or_else(PoisonError::into_inner).armed = true;
            Response::empty()
        }));

        let state = Arc::clone(&handle.state);
        device.register(vec![CMD_DISARM], Box::new(move |_| {
            state.lock().unwrap_or_else(PoisonError::into_inner).armed = false;
            Response::empty()
        }));

        for index in 0..4u8 {
            let state = Arc::clone(&handle.state);
            device.register(vec![CMD_DEPLOY_BASE + index], Box::new(move |_burn_time| {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                if state.armed {
                    let slot = &mut state.activations[index as usize];
                    *slot = slot.saturating_add(1);
                }
                Response::empty()
            }));

            let state = Arc::clone(&handle.state);
            device.register(vec![CMD_ACTIVATION_BASE + index], Box::new(move |_| {
                let state = state.lock().unwrap_or_else(PoisonError::into_inner);
                Response::bytes([state.activations[index as usize]])
            }));
        }

        Ok((device, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_counts_only_while_armed() {
        let (mut device, handle) = AntennaMock::new(ANTENNA_PRIMARY_ADDRESS).unwrap();

        // Not armed: deploy is ignored.
        device.handle_write(&[CMD_DEPLOY_BASE, 0x1E]);
        assert_eq!(handle.activation_count(0), 0);

        device.handle_write(&[CMD_ARM]);
        assert!(handle.armed());
        device.handle_write(&[CMD_DEPLOY_BASE, 0x1E]);
        device.handle_write(&[CMD_DEPLOY_BASE + 2, 0x1E]);

        assert_eq!(device.handle_write(&[CMD_ACTIVATION_BASE]).bytes, [1]);
        assert_eq!(device.handle_write(&[CMD_ACTIVATION_BASE + 1]).bytes, [0]);
        assert_eq!(device.handle_write(&[CMD_ACTIVATION_BASE + 2]).bytes, [1]);

        device.handle_write(&[CMD_DISARM]);
        device.handle_write(&[CMD_DEPLOY_BASE, 0x1E]);
        assert_eq!(handle.activation_count(0), 1);
    }
}
