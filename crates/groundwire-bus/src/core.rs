//! The tunnel core: two framed buses, one registry each.
//!
//! Each bus gets a dedicated reader thread that also runs dispatch, so
//! writes on one bus are handled strictly in arrival order and their
//! responses leave in that same order. The writer half of each bus sits
//! behind a lock; a frame is escaped and written while the lock is held so
//! it reaches the wire contiguously.
//!
//! Lifecycle: [`TunnelCore::start`] sends `RESTART` on both buses and
//! spawns the reader threads. Dispatch on a bus stays off until the peer
//! answers with `VERSION`. [`TunnelCore::stop`] sends `I2C_DISABLE` then
//! `STOP`, opens the latch gate so no in-flight handler can wedge
//! shutdown, and joins both threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::command::{self, CommandCode, FrameReader};
use crate::device::Response;
use crate::error::{BusError, Result, TransportError};
use crate::latch::LatchGate;
use crate::registry::{BusRegistry, MISSING_DEVICE_RESPONSE};
use crate::transport::{TunnelTransport, TunnelWriter};

/// The two independent buses the core owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    /// The system bus: platform devices.
    System,
    /// The payload bus: experiment devices.
    Payload,
}

impl std::fmt::Display for BusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Payload => f.write_str("payload"),
        }
    }
}

struct BusLink<W> {
    kind: BusKind,
    writer: Arc<Mutex<W>>,
    registry: Arc<BusRegistry>,
    thread: Option<JoinHandle<()>>,
}

/// The running mock core. Owns both bus threads.
///
/// Threads run until [`TunnelCore::stop`]; dropping a core without
/// stopping it leaves the threads parked on their transports.
pub struct TunnelCore<T: TunnelTransport> {
    buses: [BusLink<T::Writer>; 2],
    gate: Arc<LatchGate>,
    shutdown: Arc<AtomicBool>,
}

impl<T: TunnelTransport> TunnelCore<T> {
    /// Starts the core: attaches the latch gate to both registries, sends
    /// `RESTART` on each bus and spawns the reader threads.
    ///
    /// # Errors
    ///
    /// Transport errors from the initial `RESTART` writes.
    pub fn start(
        system: T,
        payload: T,
        system_registry: Arc<BusRegistry>,
        payload_registry: Arc<BusRegistry>,
    ) -> Result<Self> {
        let gate = Arc::new(LatchGate::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let buses = [
            Self::start_bus(BusKind::System, system, system_registry, &gate, &shutdown)?,
            Self::start_bus(BusKind::Payload, payload, payload_registry, &gate, &shutdown)?,
        ];
        Ok(Self { buses, gate, shutdown })
    }

    fn start_bus(
        kind: BusKind,
        transport: T,
        registry: Arc<BusRegistry>,
        gate: &Arc<LatchGate>,
        shutdown: &Arc<AtomicBool>,
    ) -> Result<BusLink<T::Writer>> {
        registry.attach_gate(gate);
        let (reader, writer) = transport.split();
        let writer = Arc::new(Mutex::new(writer));
        send(&writer, CommandCode::Restart, &[])?;

        let thread = {
            let writer = Arc::clone(&writer);
            let registry = Arc::clone(&registry);
            let gate = Arc::clone(gate);
            let shutdown = Arc::clone(shutdown);
            std::thread::spawn(move || {
                reader_loop(kind, FrameReader::new(reader), &writer, &registry, &gate, &shutdown);
            })
        };
        Ok(BusLink { kind, writer, registry, thread: Some(thread) })
    }

    /// The registry backing one bus.
    #[must_use]
    pub fn registry(&self, kind: BusKind) -> &Arc<BusRegistry> {
        &self.bus(kind).registry
    }

    /// Releases the pending latched response on `kind`, notifying the peer.
    /// Idempotent: with nothing latched this only arms the next wait.
    ///
    /// # Errors
    ///
    /// Transport errors from the `UNLATCH` notification.
    pub fn unlatch(&self, kind: BusKind) -> Result<()> {
        send(&self.bus(kind).writer, CommandCode::Unlatch, &[])?;
        self.gate.release();
        Ok(())
    }

    /// Enables or disables addresses in one bus's registry.
    ///
    /// Registry-only: nothing goes over the wire, the peer keeps driving
    /// the bus, and writes to a disabled address are answered with the
    /// missing-device sentinel. The bus-wide `I2C_DISABLE` is part of
    /// [`TunnelCore::stop`].
    pub fn enable_devices(&self, kind: BusKind, addresses: &[u8], on: bool) {
        self.bus(kind).registry.enable(addresses, on);
    }

    /// Stops the core: `I2C_DISABLE` then `STOP` on each bus, opens the
    /// latch gate, joins the reader threads.
    ///
    /// A bus whose peer is already gone is logged and skipped; the join
    /// still happens.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for bus in &self.buses {
            for command in [CommandCode::I2cDisable, CommandCode::Stop] {
                if let Err(err) = send(&bus.writer, command, &[]) {
                    tracing::debug!(bus = %bus.kind, %err, "peer gone during shutdown");
                    break;
                }
            }
        }
        self.gate.open();
        for bus in &mut self.buses {
            if let Some(thread) = bus.thread.take()
                && thread.join().is_err()
            {
                tracing::error!(bus = %bus.kind, "bus thread panicked");
            }
        }
    }

    fn bus(&self, kind: BusKind) -> &BusLink<T::Writer> {
        // Construction order is [System, Payload].
        match kind {
            BusKind::System => &self.buses[0],
            BusKind::Payload => &self.buses[1],
        }
    }
}

impl<T: TunnelTransport> std::fmt::Debug for TunnelCore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelCore")
            .field("shutdown", &self.shutdown.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn send<W: TunnelWriter>(writer: &Mutex<W>, command: CommandCode, payload: &[u8]) -> Result<()> {
    let mut guard = writer.lock().unwrap_or_else(PoisonError::into_inner);
    command::write_frame(&mut *guard, command, payload)
}

fn reader_loop<R: crate::transport::TunnelReader, W: TunnelWriter>(
    kind: BusKind,
    mut frames: FrameReader<R>,
    writer: &Mutex<W>,
    registry: &BusRegistry,
    gate: &LatchGate,
    shutdown: &AtomicBool,
) {
    // Dispatch stays off until the peer completes the RESTART/VERSION
    // handshake.
    let mut dispatch_enabled = false;
    loop {
        let frame = match frames.read_frame() {
            Ok(frame) => frame,
            Err(BusError::Transport(TransportError::TimedOut)) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                continue;
            },
            Err(BusError::Transport(TransportError::Closed)) => {
                tracing::debug!(bus = %kind, "transport closed");
                break;
            },
            Err(err) => {
                tracing::warn!(bus = %kind, %err, "discarding malformed frame");
                continue;
            },
        };

        match frame.command {
            CommandCode::Version => {
                let version = frame.payload.first().copied().unwrap_or(0);
                tracing::info!(bus = %kind, version, "peer handshake complete");
                dispatch_enabled = true;
            },
            CommandCode::I2cWrite => {
                let Some((&addr_dir, data)) = frame.payload.split_first() else {
                    tracing::warn!(bus = %kind, "I2C write without address byte");
                    continue;
                };
                let address = addr_dir >> 1;
                let response = if dispatch_enabled {
                    dispatch_write(kind, registry, address, data)
                } else {
                    tracing::warn!(bus = %kind, address, "write before handshake");
                    Response::bytes([MISSING_DEVICE_RESPONSE])
                };
                if response.latch {
                    gate.wait();
                }
                if let Err(err) = send(writer, CommandCode::I2cResponse, &response.bytes) {
                    tracing::error!(bus = %kind, %err, "failed to write response");
                    break;
                }
            },
            CommandCode::Stopped => {
                tracing::debug!(bus = %kind, "peer stopped");
                break;
            },
            other => {
                tracing::warn!(bus = %kind, command = ?other, "unexpected command from peer");
            },
        }
    }
    tracing::debug!(bus = %kind, "bus thread exiting");
}

fn dispatch_write(kind: BusKind, registry: &BusRegistry, address: u8, data: &[u8]) -> Response {
    let response = match registry.route(address) {
        Some(handle) => {
            let mut device = handle.lock().unwrap_or_else(PoisonError::into_inner);
            device.handle_write(data)
        },
        None => {
            tracing::warn!(bus = %kind, address, "write to missing or disabled device");
            Response::bytes([MISSING_DEVICE_RESPONSE])
        },
    };
    tracing::debug!(
        bus = %kind,
        address,
        bytes_in = data.len(),
        bytes_out = response.bytes.len(),
        "bus write dispatched"
    );
    response
}
