//! Wire formats spoken by the satellite's radio link and experiment files.
//!
//! Downlink frames carry a 3-byte bit-packed header (6-bit APID, 18-bit
//! sequence number) in front of an opaque payload; uplink frames are a 32-bit
//! security code, an 8-bit APID and the content. Both layouts are contractual
//! down to the bit: an unmodified flight computer must not be able to tell
//! this implementation from real hardware, so re-serializing a parsed frame
//! is byte-identical and every width below is load-bearing.
//!
//! On top of the frame codec sit:
//!
//! - [`dispatch`]: picks the concrete response-frame variant by
//!   (APID, payload predicate), with the `0xCD` beacon marker routed ahead
//!   of APID dispatch.
//! - [`experiment`]: the self-describing PID-record stream the experiments
//!   persist on board.
//! - [`beacon`]: the bit-packed telemetry block carried by beacon downlinks
//!   and by experiment record `0x36`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod beacon;
pub mod dispatch;
pub mod downlink;
pub mod errors;
pub mod experiment;
pub mod uplink;

pub use beacon::BeaconTelemetry;
pub use dispatch::{BEACON_MARKER, DecodedFrame, FrameDispatcher, FrameVariant};
pub use downlink::DownlinkFrame;
pub use errors::{ProtocolError, Result};
pub use experiment::{ExperimentFile, Record};
pub use uplink::{ReceivedFrame, UplinkFrame};
