//! Uplink radio frames (ground → satellite) and the receiver's framing of
//! them back to the on-board computer.
//!
//! Built uplink form: `be32(security_code) ‖ [apid] ‖ content`. There is no
//! length prefix; the transport delineates frames. The security code is a
//! shared 32-bit value the flight computer checks verbatim — there is no
//! further authentication on this link by design.

use bytes::Bytes;
use groundwire_codec::Cursor;

use crate::errors::{ProtocolError, Result};

/// An uplink frame as transmitted by the ground station. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplinkFrame {
    security_code: u32,
    apid: u8,
    content: Bytes,
}

impl UplinkFrame {
    /// Largest content an uplink frame can carry.
    pub const MAX_CONTENT: usize = 230;

    /// Bytes in front of the content: 4-byte security code + 1-byte APID.
    pub const HEADER_LEN: usize = 5;

    /// Builds a frame, validating the content length eagerly.
    pub fn new(security_code: u32, apid: u8, content: impl Into<Bytes>) -> Result<Self> {
        let content = content.into();
        if content.len() > Self::MAX_CONTENT {
            return Err(ProtocolError::PayloadTooLarge {
                size: content.len(),
                max: Self::MAX_CONTENT,
            });
        }
        Ok(Self { security_code, apid, content })
    }

    /// Serializes to the built form `be32(code) ‖ [apid] ‖ content`.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(Self::HEADER_LEN + self.content.len());
        wire.extend_from_slice(&self.security_code.to_be_bytes());
        wire.push(self.apid);
        wire.extend_from_slice(&self.content);
        wire
    }

    /// Parses a built frame back into its fields.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(ProtocolError::ShortFrame {
                expected: Self::HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let mut cursor = Cursor::new(bytes);
        let security_code = cursor.u32_be()?;
        let apid = cursor.u8()?;
        Self::new(security_code, apid, Bytes::copy_from_slice(cursor.rest()))
    }

    /// The shared 32-bit security code (transmitted big-endian).
    #[must_use]
    pub fn security_code(&self) -> u32 {
        self.security_code
    }

    /// Application process identifier (full 8-bit range on uplink).
    #[must_use]
    pub fn apid(&self) -> u8 {
        self.apid
    }

    /// Frame content.
    #[must_use]
    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

/// A received uplink as the comm receiver hands it to the on-board computer:
/// content length, measured doppler and RSSI, then the raw content.
///
/// Wire layout (all little-endian):
///
/// ```text
/// le16 content_length ‖ le16 doppler ‖ le16 rssi ‖ content
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// Doppler offset measured at reception.
    pub doppler: u16,
    /// Received signal strength indicator.
    pub rssi: u16,
    /// Raw frame content.
    pub content: Bytes,
}

impl ReceivedFrame {
    /// Fixed bytes in front of the content.
    pub const HEADER_LEN: usize = 6;

    /// Creates a received frame.
    pub fn new(doppler: u16, rssi: u16, content: impl Into<Bytes>) -> Self {
        Self { doppler, rssi, content: content.into() }
    }

    /// Serializes the receiver's response layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(Self::HEADER_LEN + self.content.len());
        wire.extend_from_slice(&(self.content.len() as u16).to_le_bytes());
        wire.extend_from_slice(&self.doppler.to_le_bytes());
        wire.extend_from_slice(&self.rssi.to_le_bytes());
        wire.extend_from_slice(&self.content);
        wire
    }

    /// Parses the receiver's response layout.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let length = cursor.u16_le()? as usize;
        let doppler = cursor.u16_le()?;
        let rssi = cursor.u16_le()?;
        let content = cursor.take_bytes(length).map_err(ProtocolError::Payload)?;
        Ok(Self::new(doppler, rssi, Bytes::copy_from_slice(content)))
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn build_layout_vector() {
        let frame = UplinkFrame::new(0xAABB_CCDD, 12, &b"ABC"[..]).unwrap();
        assert_eq!(frame.build(), hex!("AABBCCDD 0C 414243"));
    }

    #[test]
    fn content_limit() {
        assert!(UplinkFrame::new(0, 0, vec![0u8; 230]).is_ok());
        assert!(matches!(
            UplinkFrame::new(0, 0, vec![0u8; 231]),
            Err(ProtocolError::PayloadTooLarge { size: 231, max: 230 })
        ));
    }

    #[test]
    fn receiver_layout_vector() {
        // 300 content bytes, doppler 412, rssi 374.
        let content = vec![0x55u8; 300];
        let wire = ReceivedFrame::new(412, 374, content.clone()).encode();
        assert_eq!(&wire[..6], [0x2C, 0x01, 0x9C, 0x01, 0x76, 0x01]);
        assert_eq!(&wire[6..], content.as_slice());

        let parsed = ReceivedFrame::parse(&wire).unwrap();
        assert_eq!(parsed.doppler, 412);
        assert_eq!(parsed.rssi, 374);
        assert_eq!(parsed.content.len(), 300);
    }

    proptest! {
        /// build()[0..4] is the big-endian code, build()[4] the apid, and
        /// the rest equals the content.
        #[test]
        fn bit_layout(
            code in any::<u32>(),
            apid in any::<u8>(),
            content in prop::collection::vec(any::<u8>(), 0..=UplinkFrame::MAX_CONTENT),
        ) {
            let wire = UplinkFrame::new(code, apid, content.clone()).unwrap().build();
            prop_assert_eq!(&wire[0..4], code.to_be_bytes());
            prop_assert_eq!(wire[4], apid);
            prop_assert_eq!(&wire[5..], content.as_slice());

            let parsed = UplinkFrame::parse(&wire).unwrap();
            prop_assert_eq!(parsed.security_code(), code);
            prop_assert_eq!(parsed.apid(), apid);
        }
    }
}
