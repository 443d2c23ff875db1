//! Mocked bus devices.
//!
//! A device is an address plus an ordered table of `prefix → handler`
//! mappings. An incoming write is routed to the handler with the longest
//! registered prefix the write starts with; the bytes after the prefix are
//! the handler's arguments. The empty prefix is the catch-all.
//!
//! Registering the same prefix twice keeps the last registration. Real
//! device models accumulate their command tables across constructors, and
//! the last declaration is the effective one.

use std::sync::{Arc, Weak};

use crate::error::{BusError, Result};
use crate::latch::LatchGate;

/// Largest response a device may produce; the tunnel length field is one
/// byte.
pub const MAX_RESPONSE: usize = 255;

/// What a handler hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response bytes, at most [`MAX_RESPONSE`].
    pub bytes: Vec<u8>,
    /// Defer this response until the latch gate is released.
    pub latch: bool,
}

impl Response {
    /// An empty, immediate response.
    #[must_use]
    pub fn empty() -> Self {
        Self { bytes: Vec::new(), latch: false }
    }

    /// An immediate response with the given bytes.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), latch: false }
    }

    /// A latched response: the bytes are held until `unlatch()`.
    pub fn latched(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), latch: true }
    }
}

/// A command handler: receives the bytes after its prefix.
pub type Handler = Box<dyn FnMut(&[u8]) -> Response + Send>;

/// Observation callback; runs on the bus thread and must not block.
pub type Watcher = Box<dyn Fn(&DeviceEvent) + Send>;

/// Events observable on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A write was dispatched to this device.
    Write {
        /// The full write, prefix included.
        data: Vec<u8>,
        /// The handler's response bytes.
        response: Vec<u8>,
        /// Whether the response was latched.
        latched: bool,
    },
    /// The device was enabled or disabled in the registry.
    Enabled(bool),
}

/// A mocked bus device.
pub struct MockDevice {
    address: u8,
    handlers: Vec<(Vec<u8>, Handler)>,
    watchers: Vec<Watcher>,
    latch: Weak<LatchGate>,
}

impl MockDevice {
    /// Creates a device with an empty handler table.
    ///
    /// # Errors
    ///
    /// [`BusError::AddressOutOfRange`] for addresses above the 7-bit range.
    pub fn new(address: u8) -> Result<Self> {
        if address > 0x7F {
            return Err(BusError::AddressOutOfRange { address });
        }
        Ok(Self { address, handlers: Vec::new(), watchers: Vec::new(), latch: Weak::new() })
    }

    /// The device's 7-bit bus address.
    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Registers a handler for a command prefix. Re-registering a prefix
    /// replaces the previous handler.
    pub fn register(&mut self, prefix: impl Into<Vec<u8>>, handler: Handler) {
        let prefix = prefix.into();
        if let Some(slot) = self.handlers.iter_mut().find(|(p, _)| *p == prefix) {
            slot.1 = handler;
        } else {
            self.handlers.push((prefix, handler));
        }
    }

    /// Registers an observation callback.
    pub fn watch(&mut self, watcher: Watcher) {
        self.watchers.push(watcher);
    }

    /// Releases the shared latch gate, if the device is attached to one.
    ///
    /// Convenience for handlers that model hardware finishing a deferred
    /// operation on their own.
    pub fn release_latch(&self) {
        if let Some(gate) = self.latch.upgrade() {
            gate.release();
        }
    }

    pub(crate) fn attach_gate(&mut self, gate: &Arc<LatchGate>) {
        self.latch = Arc::downgrade(gate);
    }

    pub(crate) fn notify(&self, event: &DeviceEvent) {
        for watcher in &self.watchers {
            watcher(event);
        }
    }

    /// Routes a write to the matching handler and returns its response.
    ///
    /// Longest registered prefix wins; on no match the device answers with
    /// an empty response. A response over [`MAX_RESPONSE`] bytes cannot be
    /// framed and is replaced by an empty one.
    pub fn handle_write(&mut self, data: &[u8]) -> Response {
        let best = self
            .handlers
            .iter_mut()
            .filter(|(prefix, _)| data.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len());

        let mut response = match best {
            Some((prefix, handler)) => handler(&data[prefix.len()..]),
            None => {
                tracing::warn!(address = self.address, ?data, "no handler matches write");
                Response::empty()
            },
        };
        if response.bytes.len() > MAX_RESPONSE {
            tracing::error!(
                address = self.address,
                len = response.bytes.len(),
                "response exceeds frame capacity, dropping"
            );
            response.bytes.clear();
        }

        self.notify(&DeviceEvent::Write {
            data: data.to_vec(),
            response: response.bytes.clone(),
            latched: response.latch,
        });
        response
    }
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("address", &self.address)
            .field("handlers", &self.handlers.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .field("watchers", &self.watchers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let mut device = MockDevice::new(0x10).unwrap();
        device.register(vec![], Box::new(|_| Response::bytes([0x00])));
        device.register(vec![0xAA], Box::new(|_| Response::bytes([0x01])));
        device.register(vec![0xAA, 0x01], Box::new(|args| {
            let mut out = vec![0x02];
            out.extend_from_slice(args);
            Response::bytes(out)
        }));

        assert_eq!(device.handle_write(&[0xAA]).bytes, [0x01]);
        assert_eq!(device.handle_write(&[0xAA, 0x01, 0x07]).bytes, [0x02, 0x07]);
        assert_eq!(device.handle_write(&[0xBB]).bytes, [0x00]);
    }

    #[test]
    fn last_registration_wins() {
        let mut device = MockDevice::new(0x10).unwrap();
        device.register(vec![0xB0], Box::new(|_| Response::bytes([0x01])));
        device.register(vec![0xB0], Box::new(|_| Response::bytes([0x02])));
        assert_eq!(device.handle_write(&[0xB0]).bytes, [0x02]);
    }

    #[test]
    fn unmatched_write_answers_empty() {
        let mut device = MockDevice::new(0x10).unwrap();
        device.register(vec![0xAA], Box::new(|_| Response::bytes([0x01])));
        let response = device.handle_write(&[0xBB]);
        assert!(response.bytes.is_empty());
        assert!(!response.latch);
    }

    #[test]
    fn oversize_response_is_dropped() {
        let mut device = MockDevice::new(0x10).unwrap();
        device.register(vec![0x01], Box::new(|_| Response::bytes(vec![0u8; 256])));
        assert!(device.handle_write(&[0x01]).bytes.is_empty());
    }

    #[test]
    fn watchers_observe_writes_in_order() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let mut device = MockDevice::new(0x10).unwrap();
        device.register(vec![0xAA], Box::new(|_| Response::bytes([0x01])));
        {
            let seen = std::sync::Arc::clone(&seen);
            device.watch(Box::new(move |event| {
                seen.lock().unwrap().push(event.clone());
            }));
        }

        device.handle_write(&[0xAA, 0x05]);
        device.handle_write(&[0xBB]);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                DeviceEvent::Write { data: vec![0xAA, 0x05], response: vec![0x01], latched: false },
                DeviceEvent::Write { data: vec![0xBB], response: vec![], latched: false },
            ]
        );
    }

    #[test]
    fn address_range_is_checked() {
        assert!(matches!(MockDevice::new(0x80), Err(BusError::AddressOutOfRange { address: 0x80 })));
        assert!(MockDevice::new(0x7F).is_ok());
    }
}
