//! Downlink frame dispatch.
//!
//! A parsed [`DownlinkFrame`] says nothing about what its payload means; that
//! is decided here. Each [`FrameVariant`] claims frames by
//! (APID, payload predicate) and owns the decode of its payload shape. The
//! dispatcher requires the claims to partition the space: zero matches is
//! [`ProtocolError::UnknownFrame`], two or more is
//! [`ProtocolError::AmbiguousFrame`].
//!
//! Beacons sidestep APID routing entirely. A payload whose first byte is the
//! [`BEACON_MARKER`] carries the bit-packed telemetry block and is decoded
//! before any variant is consulted.

use crate::beacon::BeaconTelemetry;
use crate::downlink::DownlinkFrame;
use crate::errors::{ProtocolError, Result};

/// Literal byte prefixed to telemetry-carrying downlink payloads.
pub const BEACON_MARKER: u8 = 0xCD;

/// A fully decoded downlink frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// Reply to a ground PING.
    Pong {
        /// Sequence number echoed from the downlink header.
        seq: u32,
    },
    /// Periodic telemetry beacon.
    Beacon(BeaconTelemetry),
    /// Single-byte acknowledgement of an uplinked command.
    CommandAck {
        /// Correlation id assigned by the ground station.
        correlation_id: u8,
    },
    /// Command rejection with an error code.
    CommandError {
        /// Correlation id assigned by the ground station.
        correlation_id: u8,
        /// Flight-software error code.
        error_code: u16,
    },
}

/// One response-frame shape: the APID it answers on, a payload predicate,
/// and the decode invoked once the predicate has claimed the frame.
///
/// Plain function pointers keep the variant table `'static` and copyable;
/// none of the flight shapes need captured state to classify a payload.
#[derive(Clone, Copy)]
pub struct FrameVariant {
    /// Variant name, for logs and duplicate-match reports.
    pub name: &'static str,
    /// Downlink APID this variant answers on.
    pub received_apid: u8,
    /// Payload predicate; must be disjoint from every other variant on the
    /// same APID.
    pub matches: fn(payload: &[u8]) -> bool,
    /// Field extraction, run only on payloads the predicate accepted.
    pub decode: fn(frame: &DownlinkFrame) -> Result<DecodedFrame>,
}

impl std::fmt::Debug for FrameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameVariant")
            .field("name", &self.name)
            .field("received_apid", &self.received_apid)
            .finish_non_exhaustive()
    }
}

/// Routes parsed downlink frames to the matching [`FrameVariant`].
pub struct FrameDispatcher {
    variants: Vec<FrameVariant>,
    parse_hook: Option<Box<dyn Fn(&DownlinkFrame) -> bool + Send + Sync>>,
}

impl FrameDispatcher {
    /// Creates a dispatcher over the given variant set.
    #[must_use]
    pub fn new(variants: Vec<FrameVariant>) -> Self {
        Self { variants, parse_hook: None }
    }

    /// The variant set spoken by unmodified flight software.
    #[must_use]
    pub fn flight_defaults() -> Self {
        Self::new(vec![PONG, COMMAND_ACK, COMMAND_ERROR])
    }

    /// Installs a frame-level acceptance hook, run after header parse and
    /// before any routing.
    ///
    /// The wire carries no checksum at this layer; a caller that wants CRC
    /// or signature screening supplies it here. Frames the hook returns
    /// `false` for fail with [`ProtocolError::HookRejected`]. Without a hook
    /// every frame is accepted.
    #[must_use]
    pub fn with_parse_hook(
        mut self,
        hook: impl Fn(&DownlinkFrame) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.parse_hook = Some(Box::new(hook));
        self
    }

    /// Parses wire bytes and routes the result.
    ///
    /// # Errors
    ///
    /// Header errors from [`DownlinkFrame::parse`], [`ProtocolError::HookRejected`]
    /// if the installed hook declines the frame, and
    /// [`ProtocolError::UnknownFrame`] / [`ProtocolError::AmbiguousFrame`]
    /// when the variant predicates fail to claim the payload exactly once.
    pub fn dispatch(&self, bytes: &[u8]) -> Result<DecodedFrame> {
        let frame = DownlinkFrame::parse(bytes)?;
        if let Some(hook) = &self.parse_hook
            && !hook(&frame)
        {
            return Err(ProtocolError::HookRejected { apid: frame.apid() });
        }

        // Beacon payloads are discriminated by marker byte, ahead of APID
        // routing.
        if frame.payload().first() == Some(&BEACON_MARKER) {
            return Ok(DecodedFrame::Beacon(BeaconTelemetry::parse(&frame.payload()[1..])));
        }

        let mut claimed = self
            .variants
            .iter()
            .filter(|v| v.received_apid == frame.apid() && (v.matches)(frame.payload()));
        match (claimed.next(), claimed.next()) {
            (Some(variant), None) => (variant.decode)(&frame),
            (None, _) => Err(ProtocolError::UnknownFrame {
                apid: frame.apid(),
                payload: frame.payload().clone(),
            }),
            (Some(_), Some(_)) => Err(ProtocolError::AmbiguousFrame {
                apid: frame.apid(),
                payload: frame.payload().clone(),
            }),
        }
    }
}

impl std::fmt::Debug for FrameDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDispatcher")
            .field("variants", &self.variants)
            .field("has_parse_hook", &self.parse_hook.is_some())
            .finish()
    }
}

/// PING reply: APID 0x01, payload is the literal ASCII bytes `PONG`.
pub const PONG: FrameVariant = FrameVariant {
    name: "pong",
    received_apid: 0x01,
    matches: |payload| payload == b"PONG",
    decode: |frame| Ok(DecodedFrame::Pong { seq: frame.seq() }),
};

/// Command acknowledgement: APID 0x02, one payload byte (the correlation id).
pub const COMMAND_ACK: FrameVariant = FrameVariant {
    name: "command_ack",
    received_apid: 0x02,
    matches: |payload| payload.len() == 1,
    decode: |frame| Ok(DecodedFrame::CommandAck { correlation_id: frame.payload()[0] }),
};

/// Command rejection: APID 0x02, correlation id plus a little-endian error
/// code.
pub const COMMAND_ERROR: FrameVariant = FrameVariant {
    name: "command_error",
    received_apid: 0x02,
    matches: |payload| payload.len() == 3,
    decode: |frame| {
        let payload = frame.payload();
        Ok(DecodedFrame::CommandError {
            correlation_id: payload[0],
            error_code: u16::from_le_bytes([payload[1], payload[2]]),
        })
    },
};

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn beacon_marker_routes_ahead_of_apid() {
        // Header claims APID 0x01, but the marker byte wins.
        let mut wire = vec![0x04, 0x00, 0x00, BEACON_MARKER];
        wire.extend_from_slice(&[0xAB; 32]);

        let dispatcher = FrameDispatcher::flight_defaults();
        match dispatcher.dispatch(&wire).unwrap() {
            DecodedFrame::Beacon(telemetry) => assert!(telemetry.is_truncated()),
            other => panic!("expected beacon, got {other:?}"),
        }
    }

    #[test]
    fn pong_decodes_with_header_seq() {
        let wire = [0x04, 0x00, 0x00, b'P', b'O', b'N', b'G'];
        let dispatcher = FrameDispatcher::flight_defaults();
        assert_eq!(dispatcher.dispatch(&wire).unwrap(), DecodedFrame::Pong { seq: 0 });
    }

    #[test]
    fn command_frames_split_on_payload_length() {
        let dispatcher = FrameDispatcher::flight_defaults();

        // APID 0x02 == header byte 0x08.
        assert_eq!(
            dispatcher.dispatch(&[0x08, 0x00, 0x07, 0x2A]).unwrap(),
            DecodedFrame::CommandAck { correlation_id: 0x2A }
        );
        assert_eq!(
            dispatcher.dispatch(&[0x08, 0x00, 0x07, 0x2A, 0x01, 0x02]).unwrap(),
            DecodedFrame::CommandError { correlation_id: 0x2A, error_code: 0x0201 }
        );
    }

    #[test]
    fn unclaimed_frame_reports_unknown() {
        let dispatcher = FrameDispatcher::flight_defaults();
        // APID 0x01 but payload is not PONG.
        let err = dispatcher.dispatch(&[0x04, 0x00, 0x00, b'N', b'O']).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownFrame { apid: 0x01, .. }));
    }

    #[test]
    fn overlapping_predicates_report_ambiguous() {
        let eager: FrameVariant = FrameVariant {
            name: "eager",
            received_apid: 0x01,
            matches: |_| true,
            decode: |frame| Ok(DecodedFrame::Pong { seq: frame.seq() }),
        };
        let dispatcher = FrameDispatcher::new(vec![PONG, eager]);
        let err = dispatcher.dispatch(&[0x04, 0x00, 0x00, b'P', b'O', b'N', b'G']).unwrap_err();
        assert!(matches!(err, ProtocolError::AmbiguousFrame { apid: 0x01, .. }));
    }

    #[test]
    fn parse_hook_can_reject() {
        let dispatcher = FrameDispatcher::flight_defaults().with_parse_hook(|frame| frame.seq() != 0);
        let err = dispatcher.dispatch(&[0x04, 0x00, 0x00, b'P', b'O', b'N', b'G']).unwrap_err();
        assert_eq!(err, ProtocolError::HookRejected { apid: 0x01 });

        // seq 1 passes the hook.
        let ok = dispatcher.dispatch(&[0x04, 0x00, 0x01, b'P', b'O', b'N', b'G']).unwrap();
        assert_eq!(ok, DecodedFrame::Pong { seq: 1 });
    }

    proptest! {
        /// Over the flight variant set, every syntactically valid frame
        /// dispatches to exactly one outcome: a decode, UnknownFrame, or the
        /// beacon branch. AmbiguousFrame never occurs.
        #[test]
        fn flight_variants_partition_payload_space(
            apid in 0u8..=DownlinkFrame::MAX_APID,
            seq in 0u32..=DownlinkFrame::MAX_SEQ,
            payload in prop::collection::vec(any::<u8>(), 0..=64),
        ) {
            let wire = DownlinkFrame::new(apid, seq, payload.clone()).unwrap().encode();
            let dispatcher = FrameDispatcher::flight_defaults();
            match dispatcher.dispatch(&wire) {
                Ok(_) | Err(ProtocolError::UnknownFrame { .. }) => {},
                Err(other) => return Err(TestCaseError::fail(format!("unexpected: {other}"))),
            }
        }
    }
}
