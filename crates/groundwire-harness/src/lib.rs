//! Test harness for the bus-tunnel core.
//!
//! Provides what a scenario test needs around [`groundwire_bus`]: an
//! in-memory duplex transport, a scripted peer that plays the
//! device-under-test, and a pre-wired bench that starts a core and runs
//! the handshake. Integration tests for the tunnel live in this crate's
//! `tests/` directory.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bench;
pub mod memory_port;
pub mod peer;

pub use bench::{Bench, PEER_VERSION};
pub use memory_port::{MemoryPort, PortReader, PortWriter, duplex_pair};
pub use peer::PeerTunnel;
