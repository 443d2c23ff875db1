//! Comm receiver mock.
//!
//! Models the uplink receiver's frame buffer: tests push
//! [`ReceivedFrame`]s in, the device-under-test polls the count, reads the
//! oldest frame and removes it.
//!
//! The tunnel response cap is 255 bytes, so frames queued here must keep
//! `content` short enough for the 6-byte receiver header to fit under it;
//! an oversized frame is dropped at the device layer with an error log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use groundwire_proto::ReceivedFrame;

use crate::device::{MockDevice, Response};
use crate::error::Result;

/// Bus address of the comm receiver.
pub const RECEIVER_ADDRESS: u8 = 0x60;

/// Clears the frame buffer.
const CMD_RESET: u8 = 0xAA;
/// Returns the queued frame count as le16.
const CMD_FRAME_COUNT: u8 = 0x21;
/// Returns the oldest queued frame in receiver layout.
const CMD_GET_FRAME: u8 = 0x22;
/// Drops the oldest queued frame.
const CMD_REMOVE_FRAME: u8 = 0x24;

/// Test-side handle to the receiver's frame buffer.
#[derive(Debug, Clone, Default)]
pub struct ReceiverHandle {
    queue: Arc<Mutex<VecDeque<ReceivedFrame>>>,
}

impl ReceiverHandle {
    /// Queues a frame for the device-under-test to pick up.
    pub fn push_frame(&self, frame: ReceivedFrame) {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).push_back(frame);
    }

    /// Frames still queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Factory for the receiver mock.
#[derive(Debug)]
pub struct ReceiverMock;

impl ReceiverMock {
    /// Builds the device and the handle sharing its frame buffer.
    ///
    /// # Errors
    ///
    /// Never fails for the fixed [`RECEIVER_ADDRESS`]; the `Result` is the
    /// device constructor's.
    pub fn new() -> Result<(MockDevice, ReceiverHandle)> {
        let handle = ReceiverHandle::default();
        let mut device = MockDevice::new(RECEIVER_ADDRESS)?;

        let queue = Arc::clone(&handle.queue);
        device.register(vec![CMD_RESET], Box::new(move |_| {
            queue.lock().unwrap_or_else(PoisonError::into_inner).clear();
            Response::empty()
        }));

        let queue = Arc::clone(&handle.queue);
        device.register(vec![CMD_FRAME_COUNT], Box::new(move |_| {
            let count = queue.lock().unwrap_or_else(PoisonError::into_inner).len();
            let count = u16::try_from(count).unwrap_or(u16::MAX);
            Response::bytes(count.to_le_bytes())
        }));

        let queue = Arc::clone(&handle.queue);
        device.register(vec![CMD_GET_FRAME], Box::new(move |_| {
            let queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
            match queue.front() {
                Some(frame) => Response::bytes(frame.encode()),
                None => Response::empty(),
            }
        }));

        let queue = Arc::clone(&handle.queue);
        device.register(vec![CMD_REMOVE_FRAME], Box::new(move |_| {
            queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
            Response::empty()
        }));

        Ok((device, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_read_remove_cycle() {
        let (mut device, handle) = ReceiverMock::new().unwrap();
        handle.push_frame(ReceivedFrame::new(412, 374, &b"ABC"[..]));

        assert_eq!(device.handle_write(&[CMD_FRAME_COUNT]).bytes, [0x01, 0x00]);

        let wire = device.handle_write(&[CMD_GET_FRAME]).bytes;
        let frame = ReceivedFrame::parse(&wire).unwrap();
        assert_eq!(frame.doppler, 412);
        assert_eq!(frame.rssi, 374);
        assert_eq!(frame.content.as_ref(), b"ABC");

        device.handle_write(&[CMD_REMOVE_FRAME]);
        assert_eq!(device.handle_write(&[CMD_FRAME_COUNT]).bytes, [0x00, 0x00]);
        assert!(handle.is_empty());
    }

    #[test]
    fn empty_buffer_reads_empty() {
        let (mut device, _handle) = ReceiverMock::new().unwrap();
        assert!(device.handle_write(&[CMD_GET_FRAME]).bytes.is_empty());
        // Removing from an empty buffer is a no-op.
        device.handle_write(&[CMD_REMOVE_FRAME]);
    }

    #[test]
    fn reset_clears_the_buffer() {
        let (mut device, handle) = ReceiverMock::new().unwrap();
        handle.push_frame(ReceivedFrame::new(0, 0, &b"X"[..]));
        handle.push_frame(ReceivedFrame::new(0, 0, &b"Y"[..]));
        device.handle_write(&[CMD_RESET]);
        assert!(handle.is_empty());
    }
}
