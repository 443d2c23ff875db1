//! Pre-wired test bench.
//!
//! Builds a [`TunnelCore`] over in-memory ports, hands back the two peer
//! ends, and runs the startup handshake so tests begin with dispatch
//! enabled on both buses.

use std::sync::Arc;
use std::time::Duration;

use groundwire_bus::{BusKind, BusRegistry, Result, TunnelCore};

use crate::memory_port::{MemoryPort, duplex_pair};
use crate::peer::PeerTunnel;

/// Protocol version the scripted peer reports.
pub const PEER_VERSION: u8 = 1;

/// A running core plus the scripted peer end of each bus.
#[derive(Debug)]
pub struct Bench {
    /// The core under test.
    pub core: TunnelCore<MemoryPort>,
    /// Peer end of the system bus.
    pub system: PeerTunnel<MemoryPort>,
    /// Peer end of the payload bus.
    pub payload: PeerTunnel<MemoryPort>,
}

impl Bench {
    /// Starts a core over fresh in-memory ports and completes the
    /// `RESTART`/`VERSION` handshake on both buses.
    ///
    /// # Errors
    ///
    /// Startup and handshake failures from the core or the ports.
    pub fn start(
        system_registry: Arc<BusRegistry>,
        payload_registry: Arc<BusRegistry>,
        read_timeout: Duration,
    ) -> Result<Self> {
        let (system_near, system_far) = duplex_pair(read_timeout);
        let (payload_near, payload_far) = duplex_pair(read_timeout);

        let core = TunnelCore::start(system_near, payload_near, system_registry, payload_registry)?;
        let mut system = PeerTunnel::new(system_far);
        let mut payload = PeerTunnel::new(payload_far);
        for peer in [&mut system, &mut payload] {
            peer.expect_restart()?;
            peer.send_version(PEER_VERSION)?;
        }
        Ok(Self { core, system, payload })
    }

    /// Peer end of the given bus.
    pub fn peer(&mut self, kind: BusKind) -> &mut PeerTunnel<MemoryPort> {
        match kind {
            BusKind::System => &mut self.system,
            BusKind::Payload => &mut self.payload,
        }
    }
}
