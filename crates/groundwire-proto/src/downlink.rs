//! Downlink radio frames (satellite → ground).
//!
//! Wire layout, most significant bits first within each byte:
//!
//! ```text
//! byte 0: aaaaaass   a = 6-bit APID, s = top 2 bits of sequence number
//! byte 1: ssssssss   sequence number bits 15..8
//! byte 2: ssssssss   sequence number bits 7..0
//! byte 3..: payload  up to 235 bytes, opaque at this layer
//! ```
//!
//! No checksum is carried at this layer. The transport delineates frames.

use bytes::Bytes;

use crate::errors::{ProtocolError, Result};

/// A parsed or constructed downlink frame. Immutable after construction.
///
/// Re-serializing a parsed frame yields byte-identical output; the range
/// invariants (`apid` 6-bit, `seq` 18-bit, payload ≤ 235 bytes) are enforced
/// eagerly by [`DownlinkFrame::new`] and hold for every constructed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownlinkFrame {
    apid: u8,
    seq: u32,
    payload: Bytes,
}

impl DownlinkFrame {
    /// Header length in bytes.
    pub const HEADER_LEN: usize = 3;

    /// Largest APID a downlink header can carry.
    pub const MAX_APID: u8 = 0x3F;

    /// Largest sequence number a downlink header can carry.
    pub const MAX_SEQ: u32 = 0x3_FFFF;

    /// Largest payload a downlink frame can carry.
    pub const MAX_PAYLOAD: usize = 235;

    /// Builds a frame, validating every field range.
    pub fn new(apid: u8, seq: u32, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if apid > Self::MAX_APID {
            return Err(ProtocolError::ApidOutOfRange(apid));
        }
        if seq > Self::MAX_SEQ {
            return Err(ProtocolError::SequenceOutOfRange(seq));
        }
        if payload.len() > Self::MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: Self::MAX_PAYLOAD,
            });
        }
        Ok(Self { apid, seq, payload })
    }

    /// Parses a frame from wire bytes.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ShortFrame`] iff fewer than 3 bytes are present; this
    /// is the only way a downlink parse can fail, since every 3-byte header
    /// is structurally valid.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(ProtocolError::ShortFrame {
                expected: Self::HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let apid = (bytes[0] >> 2) & 0x3F;
        let seq = (u32::from(bytes[0] & 0x03) << 16)
            | (u32::from(bytes[1]) << 8)
            | u32::from(bytes[2]);
        let payload = Bytes::copy_from_slice(&bytes[Self::HEADER_LEN..]);
        Self::new(apid, seq, payload)
    }

    /// Serializes the frame; parsing the result yields an equal frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(Self::HEADER_LEN + self.payload.len());
        wire.push((self.apid << 2) | ((self.seq >> 16) as u8 & 0x03));
        wire.push((self.seq >> 8) as u8);
        wire.push(self.seq as u8);
        wire.extend_from_slice(&self.payload);
        wire
    }

    /// Application process identifier (6-bit).
    #[must_use]
    pub fn apid(&self) -> u8 {
        self.apid
    }

    /// Sequence number (18-bit).
    #[must_use]
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Frame payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn header_bit_extraction() {
        // 0x04 0x00 0x00 -> apid 1, seq 0 (the Pong header from flight logs).
        let frame = DownlinkFrame::parse(&[0x04, 0x00, 0x00, b'P', b'O', b'N', b'G']).unwrap();
        assert_eq!(frame.apid(), 0x01);
        assert_eq!(frame.seq(), 0);
        assert_eq!(frame.payload().as_ref(), b"PONG");
    }

    #[test]
    fn seq_straddles_all_three_header_bytes() {
        let frame = DownlinkFrame::new(0x3F, 0x3_FFFF, Bytes::new()).unwrap();
        assert_eq!(frame.encode(), vec![0xFF, 0xFF, 0xFF]);

        let frame = DownlinkFrame::new(0x00, 0x2_0301, Bytes::new()).unwrap();
        assert_eq!(frame.encode(), vec![0x02, 0x03, 0x01]);
    }

    #[test]
    fn short_frame_is_the_only_parse_failure() {
        assert_eq!(
            DownlinkFrame::parse(&[0x04, 0x00]),
            Err(ProtocolError::ShortFrame { expected: 3, actual: 2 })
        );
        assert!(DownlinkFrame::parse(&[0xFF, 0xFF, 0xFF]).is_ok());
    }

    #[test]
    fn construction_validates_ranges() {
        assert!(matches!(
            DownlinkFrame::new(0x40, 0, Bytes::new()),
            Err(ProtocolError::ApidOutOfRange(0x40))
        ));
        assert!(matches!(
            DownlinkFrame::new(0, 0x4_0000, Bytes::new()),
            Err(ProtocolError::SequenceOutOfRange(_))
        ));
        assert!(matches!(
            DownlinkFrame::new(0, 0, vec![0u8; 236]),
            Err(ProtocolError::PayloadTooLarge { size: 236, max: 235 })
        ));
    }

    proptest! {
        /// parse(build(apid, seq, payload)) == (apid, seq, payload), and
        /// re-serializing a parsed frame is byte-identical.
        #[test]
        fn round_trip(
            apid in 0u8..=DownlinkFrame::MAX_APID,
            seq in 0u32..=DownlinkFrame::MAX_SEQ,
            payload in prop::collection::vec(any::<u8>(), 0..=DownlinkFrame::MAX_PAYLOAD),
        ) {
            let frame = DownlinkFrame::new(apid, seq, payload.clone()).unwrap();
            let wire = frame.encode();
            let parsed = DownlinkFrame::parse(&wire).unwrap();
            prop_assert_eq!(parsed.apid(), apid);
            prop_assert_eq!(parsed.seq(), seq);
            prop_assert_eq!(parsed.payload().as_ref(), payload.as_slice());
            prop_assert_eq!(parsed.encode(), wire);
        }
    }
}
