//! Little-endian bit stream reader and writer.
//!
//! The on-board computer packs its telemetry as one concatenated bit stream:
//! the first field occupies the low bits of the first byte, and a field that
//! crosses a byte boundary continues into the low bits of the next byte.
//! [`BitReader`] consumes such a stream field by field; [`BitWriter`] is the
//! exact inverse and exists mainly so tests and emulators can fabricate
//! streams the flight software would produce.

/// Widest field a single read can produce.
pub const MAX_FIELD_BITS: u32 = 64;

/// Lazy cursor over a little-endian bit array.
///
/// Reads are LSB-first within the stream: the first bit read is bit 0 of the
/// first byte of the input.
///
/// # Underflow
///
/// When fewer bits remain than a read requests, the read returns `None` (the
/// empty-field sentinel), the cursor does not advance, and the reader latches
/// as ended: every subsequent read also returns `None`, even if it would have
/// fit in the leftover bits. This models a truncated downlink, where nothing
/// after the first incomplete field can be trusted.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    bit_len: usize,
    pos: usize,
    ended: bool,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over the full bit length of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_len: buf.len() * 8, pos: 0, ended: false }
    }

    /// Creates a reader over the first `bit_len` bits of `buf`.
    ///
    /// `bit_len` is capped at `8 * buf.len()`.
    #[must_use]
    pub fn with_len(buf: &'a [u8], bit_len: usize) -> Self {
        Self { buf, bit_len: bit_len.min(buf.len() * 8), pos: 0, ended: false }
    }

    /// Number of unread bits left in the stream.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bit_len - self.pos
    }

    /// Whether a previous read ran off the end of the stream.
    #[must_use]
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Reads the next `width` bits as an unsigned integer, LSB-first.
    ///
    /// Returns `None` without advancing if the stream has ended, if fewer
    /// than `width` bits remain, or if `width` is outside `1..=64`.
    pub fn take(&mut self, width: u32) -> Option<u64> {
        if width == 0 || width > MAX_FIELD_BITS {
            return None;
        }
        if self.ended || self.remaining() < width as usize {
            self.ended = true;
            return None;
        }

        let mut value = 0u64;
        for i in 0..width {
            let byte = self.buf[self.pos / 8];
            let bit = u64::from((byte >> (self.pos % 8)) & 1);
            value |= bit << i;
            self.pos += 1;
        }
        Some(value)
    }

    /// Reads the next `width` bits as a two's-complement signed integer,
    /// sign-extended to 64 bits.
    ///
    /// Underflow behaves exactly as in [`BitReader::take`].
    pub fn take_signed(&mut self, width: u32) -> Option<i64> {
        let raw = self.take(width)?;
        if width == MAX_FIELD_BITS {
            return Some(raw as i64);
        }
        let sign = 1u64 << (width - 1);
        if raw & sign != 0 {
            Some((raw | (u64::MAX << width)) as i64)
        } else {
            Some(raw as i64)
        }
    }
}

/// Inverse of [`BitReader`]: packs values LSB-first into a growing byte
/// buffer.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Appends the low `width` bits of `value`, LSB-first.
    ///
    /// Bits of `value` above `width` are ignored. Widths outside `1..=64`
    /// write nothing.
    pub fn write(&mut self, value: u64, width: u32) {
        if width == 0 || width > MAX_FIELD_BITS {
            return;
        }
        for i in 0..width {
            if self.bit_len % 8 == 0 {
                self.buf.push(0);
            }
            let bit = ((value >> i) & 1) as u8;
            let last = self.buf.len() - 1;
            self.buf[last] |= bit << (self.bit_len % 8);
            self.bit_len += 1;
        }
    }

    /// Appends the low `width` bits of a signed value in two's complement.
    pub fn write_signed(&mut self, value: i64, width: u32) {
        self.write(value as u64, width);
    }

    /// Final packed bytes; the last byte is zero-padded in its high bits.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn first_bit_is_bit_zero_of_first_byte() {
        let mut reader = BitReader::new(&[0b0000_0001]);
        assert_eq!(reader.take(1), Some(1));
        assert_eq!(reader.take(7), Some(0));
    }

    #[test]
    fn field_crossing_byte_boundary() {
        // 12-bit field 0xABC: low 8 bits in byte 0, high 4 bits in byte 1.
        let mut reader = BitReader::new(&[0xBC, 0x0A]);
        assert_eq!(reader.take(12), Some(0xABC));
        assert_eq!(reader.remaining(), 4);
    }

    #[test]
    fn underflow_returns_none_and_does_not_advance() {
        // 10-bit stream read with widths 6, 6: the second read underflows.
        let mut reader = BitReader::with_len(&[0b0011_1111, 0b0000_0011], 10);
        assert_eq!(reader.take(6), Some(0x3F));
        assert_eq!(reader.take(6), None);
        assert_eq!(reader.remaining(), 4);
        // Latched: 4 bits remain but the stream behaves as ended.
        assert_eq!(reader.take(1), None);
        assert!(reader.ended());
    }

    #[test]
    fn sign_extension() {
        let mut writer = BitWriter::new();
        writer.write_signed(-3, 6);
        writer.write_signed(17, 6);
        writer.write_signed(-1, 1);
        let bytes = writer.into_bytes();

        let mut reader = BitReader::with_len(&bytes, 13);
        assert_eq!(reader.take_signed(6), Some(-3));
        assert_eq!(reader.take_signed(6), Some(17));
        assert_eq!(reader.take_signed(1), Some(-1));
    }

    #[test]
    fn full_width_read() {
        let mut writer = BitWriter::new();
        writer.write(u64::MAX, 64);
        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.take_signed(64), Some(-1));
    }

    #[test]
    fn zero_and_oversized_widths_are_rejected() {
        let mut reader = BitReader::new(&[0xFF; 16]);
        assert_eq!(reader.take(0), None);
        let mut reader = BitReader::new(&[0xFF; 16]);
        assert_eq!(reader.take(65), None);
    }

    proptest! {
        /// Packing values then unpacking with the same widths yields the
        /// original values.
        #[test]
        fn pack_unpack_identity(fields in prop::collection::vec((1u32..=64, any::<u64>()), 0..32)) {
            let mut writer = BitWriter::new();
            for &(width, value) in &fields {
                writer.write(value, width);
            }
            let bit_len = writer.bit_len();
            let bytes = writer.into_bytes();

            let mut reader = BitReader::with_len(&bytes, bit_len);
            for &(width, value) in &fields {
                let masked = if width == 64 { value } else { value & ((1u64 << width) - 1) };
                prop_assert_eq!(reader.take(width), Some(masked));
            }
            prop_assert_eq!(reader.remaining(), 0);
        }

        /// Signed round-trip through two's complement.
        #[test]
        fn signed_round_trip(width in 1u32..=64, value in any::<i64>()) {
            let min = if width == 64 { i64::MIN } else { -(1i64 << (width - 1)) };
            let max = if width == 64 { i64::MAX } else { (1i64 << (width - 1)) - 1 };
            let clamped = value.clamp(min, max);

            let mut writer = BitWriter::new();
            writer.write_signed(clamped, width);
            let bytes = writer.into_bytes();
            let mut reader = BitReader::with_len(&bytes, width as usize);
            prop_assert_eq!(reader.take_signed(width), Some(clamped));
        }
    }
}
