//! Framing properties over the real in-memory transport.

use std::time::Duration;

use groundwire_bus::{CommandCode, FrameReader, TunnelTransport, write_frame};
use groundwire_harness::duplex_pair;
use proptest::prelude::*;

proptest! {
    /// Any sequence of payloads survives the escape layer and a real port:
    /// frames arrive whole, in order, byte-for-byte.
    #[test]
    fn frames_cross_the_port_intact(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=255), 1..=8),
    ) {
        let (near, far) = duplex_pair(Duration::from_millis(100));
        let (_near_rx, mut near_tx) = near.split();
        let (far_rx, _far_tx) = far.split();
        let mut frames = FrameReader::new(far_rx);

        for payload in &payloads {
            write_frame(&mut near_tx, CommandCode::I2cResponse, payload).unwrap();
        }
        for payload in &payloads {
            let frame = frames.read_frame().unwrap();
            prop_assert_eq!(frame.command, CommandCode::I2cResponse);
            prop_assert_eq!(&frame.payload, payload);
        }
    }
}
