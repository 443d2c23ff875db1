//! Bus-tunnel mock core.
//!
//! Sits on the harness side of the tunnel: two framed byte channels (the
//! system bus and the payload bus) connect to the device-under-test, and
//! every bus write the peer sends is routed to a mocked device whose
//! handler produces the response. The framing, dispatch and latch rules
//! mirror the hardware test bench this replaces, so unmodified flight
//! software cannot tell the difference.
//!
//! Layering, bottom to top:
//!
//! - [`escape`] / [`command`]: the `'S'`-framed command protocol.
//! - [`transport`]: the byte channel the framing runs over.
//! - [`device`] / [`registry`]: mocked devices and the address map.
//! - [`latch`]: the deferred-response release signal.
//! - [`core`]: the per-bus reader threads tying it all together.
//! - [`devices`]: stock mocks for the standard bench.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod core;
pub mod device;
pub mod devices;
pub mod error;
pub mod escape;
pub mod latch;
pub mod registry;
pub mod transport;

pub use command::{CommandCode, FrameReader, TunnelFrame, encode_frame, write_frame};
pub use self::core::{BusKind, TunnelCore};
pub use device::{DeviceEvent, Handler, MAX_RESPONSE, MockDevice, Response, Watcher};
pub use error::{BusError, Result, TransportError};
pub use latch::LatchGate;
pub use registry::{BusRegistry, DeviceHandle, MISSING_DEVICE_RESPONSE};
pub use transport::{TunnelReader, TunnelTransport, TunnelWriter};
