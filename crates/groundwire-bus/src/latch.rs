//! The shared latch release signal.
//!
//! A device handler may declare its response latched; the bus thread then
//! parks on this gate before writing the response back. External code calls
//! [`LatchGate::release`] to let exactly the pending response through, or
//! [`LatchGate::open`] at shutdown to let every current and future wait
//! fall through immediately.

use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
struct GateState {
    /// One pending release, consumed by the next waiter.
    released: bool,
    /// Permanently open; set once at shutdown.
    open: bool,
}

/// Shared release signal for latched responses.
///
/// Owned by the tunnel core; devices hold only a [`std::sync::Weak`]
/// reference to it.
#[derive(Debug, Default)]
pub struct LatchGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl LatchGate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until [`LatchGate::release`] or [`LatchGate::open`] is called.
    ///
    /// A release wakes exactly one pending wait; an open gate never blocks.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while !state.open && !state.released {
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.released = false;
    }

    /// Releases one pending (or the next) latched response. Idempotent: a
    /// release with no waiter is absorbed by the next wait, and repeated
    /// releases collapse into one.
    pub fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.released = true;
        drop(state);
        self.cond.notify_all();
    }

    /// Opens the gate permanently so shutdown never deadlocks on a latch.
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open = true;
        drop(state);
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn release_before_wait_is_absorbed() {
        let gate = LatchGate::new();
        gate.release();
        gate.release();
        // Exactly one pending release: this must return immediately.
        gate.wait();
    }

    #[test]
    fn release_wakes_parked_waiter() {
        let gate = Arc::new(LatchGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.wait())
        };
        std::thread::sleep(Duration::from_millis(20));
        gate.release();
        waiter.join().unwrap();
    }

    #[test]
    fn open_gate_never_blocks_again() {
        let gate = LatchGate::new();
        gate.open();
        gate.wait();
        gate.wait();
    }
}
