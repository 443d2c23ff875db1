//! Stock device mocks for the standard test bench.
//!
//! Each mock is a [`crate::MockDevice`] factory plus a thread-safe handle
//! that tests use to feed state in or assert on what the device-under-test
//! did. Anything not covered here is a few [`crate::MockDevice::register`]
//! calls away.

pub mod antenna;
pub mod comm;
pub mod payload;

pub use antenna::{ANTENNA_PRIMARY_ADDRESS, ANTENNA_SECONDARY_ADDRESS, AntennaHandle, AntennaMock};
pub use comm::{RECEIVER_ADDRESS, ReceiverHandle, ReceiverMock};
pub use payload::{PAYLOAD_ADDRESS, PayloadMock};
