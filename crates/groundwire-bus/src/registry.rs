//! The address → device registry.
//!
//! Read-mostly: dispatch takes the shared lock, while `add` and
//! `enable` take the exclusive one. Enablement is a 128-bit set, one bit
//! per 7-bit address, so enable/disable of a whole address list is a single
//! atomic mask update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::device::{DeviceEvent, MockDevice};
use crate::error::{BusError, Result};
use crate::latch::LatchGate;

/// Sentinel answered for writes to an absent or disabled address.
pub const MISSING_DEVICE_RESPONSE: u8 = 0xCC;

/// Shared handle to a registered device.
pub type DeviceHandle = Arc<Mutex<MockDevice>>;

#[derive(Debug, Default)]
struct RegistryInner {
    devices: HashMap<u8, DeviceHandle>,
    enabled: u128,
    gate: Weak<LatchGate>,
}

/// Owns the mocked devices of one bus.
#[derive(Debug, Default)]
pub struct BusRegistry {
    inner: RwLock<RegistryInner>,
}

impl BusRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device at its address, initially enabled.
    ///
    /// Returns a shared handle so callers can keep mutating the device
    /// (adding handlers, watchers) after registration.
    ///
    /// # Errors
    ///
    /// [`BusError::RegistryConflict`] when the address is already taken.
    pub fn add(&self, mut device: MockDevice) -> Result<DeviceHandle> {
        let address = device.address();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.devices.contains_key(&address) {
            return Err(BusError::RegistryConflict { address });
        }
        if let Some(gate) = inner.gate.upgrade() {
            device.attach_gate(&gate);
        }
        let handle = Arc::new(Mutex::new(device));
        inner.devices.insert(address, Arc::clone(&handle));
        inner.enabled |= 1u128 << address;
        Ok(handle)
    }

    /// Enables or disables a set of addresses as one atomic mask update.
    ///
    /// Registered devices at the affected addresses observe an
    /// [`DeviceEvent::Enabled`] event.
    pub fn enable(&self, addresses: &[u8], on: bool) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut mask = 0u128;
        for &address in addresses {
            mask |= 1u128 << (address & 0x7F);
        }
        if on {
            inner.enabled |= mask;
        } else {
            inner.enabled &= !mask;
        }
        for &address in addresses {
            if let Some(handle) = inner.devices.get(&(address & 0x7F)) {
                let device = handle.lock().unwrap_or_else(PoisonError::into_inner);
                device.notify(&DeviceEvent::Enabled(on));
            }
        }
    }

    /// Whether the address is currently enabled.
    #[must_use]
    pub fn is_enabled(&self, address: u8) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.enabled & (1u128 << (address & 0x7F)) != 0
    }

    /// The device registered at `address`, enabled or not.
    #[must_use]
    pub fn lookup(&self, address: u8) -> Option<DeviceHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.devices.get(&address).cloned()
    }

    /// The dispatch target for `address`: present and enabled, or `None`
    /// for the missing-device sink.
    #[must_use]
    pub fn route(&self, address: u8) -> Option<DeviceHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.enabled & (1u128 << (address & 0x7F)) == 0 {
            return None;
        }
        inner.devices.get(&address).cloned()
    }

    /// Attaches the core's latch gate to current and future devices.
    pub(crate) fn attach_gate(&self, gate: &Arc<LatchGate>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.gate = Arc::downgrade(gate);
        for handle in inner.devices.values() {
            let mut device = handle.lock().unwrap_or_else(PoisonError::into_inner);
            device.attach_gate(gate);
        }
    }
}
