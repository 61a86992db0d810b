use crate::primitive::{BitSink, write_signed_refsubexpfin};

#[derive(Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    current_byte: u8,
    bits_in_current: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.current_byte = (self.current_byte << 1) | (bit as u8);
        self.bits_in_current += 1;
        if self.bits_in_current == 8 {
            self.buf.push(self.current_byte);
            self.current_byte = 0;
            self.bits_in_current = 0;
        }
    }

    pub fn write_bits(&mut self, value: u64, n: u8) {
        debug_assert!(n <= 64);
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Two's complement value in `bits + 1` bits, as used by delta-q fields.
    pub fn write_inv_signed_literal(&mut self, value: i32, bits: u8) {
        let n = bits + 1;
        let mask = (1u64 << n) - 1;
        self.write_bits(value as i64 as u64 & mask, n);
    }

    /// Writes `delta_coded` followed by the signed delta when it is nonzero.
    pub fn write_delta_q(&mut self, delta: i8) {
        self.write_bit(delta != 0);
        if delta != 0 {
            self.write_inv_signed_literal(delta as i32, 6);
        }
    }

    pub fn write_signed_refsubexpfin(&mut self, n: u32, k: u32, reference: i32, v: i32) {
        write_signed_refsubexpfin(self, n, k, reference, v);
    }

    pub fn byte_align(&mut self) {
        if self.bits_in_current > 0 {
            self.current_byte <<= 8 - self.bits_in_current;
            self.buf.push(self.current_byte);
            self.current_byte = 0;
            self.bits_in_current = 0;
        }
    }

    pub fn add_trailing_bits(&mut self) {
        self.write_bit(true);
        self.byte_align();
    }

    pub fn finalize(mut self) -> Vec<u8> {
        self.byte_align();
        self.buf
    }

    pub fn trailing_bits(mut self) -> Vec<u8> {
        self.add_trailing_bits();
        self.buf
    }
}

impl BitSink for BitWriter {
    fn put_bit(&mut self, bit: bool) {
        self.write_bit(bit);
    }

    fn put_literal(&mut self, value: u32, bits: u32) {
        self.write_bits(value as u64, bits as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_true() {
        let mut w = BitWriter::new();
        w.write_bit(true);
        assert_eq!(w.finalize(), vec![0x80]);
    }

    #[test]
    fn write_3_bits() {
        let mut w = BitWriter::new();
        w.write_bits(0b101, 3);
        assert_eq!(w.finalize(), vec![0xA0]);
    }

    #[test]
    fn write_across_byte_boundary() {
        let mut w = BitWriter::new();
        w.write_bits(0b11111, 5);
        w.write_bits(0b11111, 5);
        assert_eq!(w.finalize(), vec![0xFF, 0xC0]);
    }

    #[test]
    fn byte_align_no_op_when_aligned() {
        let mut w = BitWriter::new();
        w.write_bits(0xFF, 8);
        w.byte_align();
        assert_eq!(w.finalize(), vec![0xFF]);
    }

    #[test]
    fn empty_writer() {
        let w = BitWriter::new();
        assert_eq!(w.finalize(), Vec::<u8>::new());
    }

    #[test]
    fn trailing_bits_on_aligned_writer_adds_full_byte() {
        let mut w = BitWriter::new();
        w.write_bits(0xCA, 8);
        assert_eq!(w.trailing_bits(), vec![0xCA, 0x80]);
    }

    #[test]
    fn trailing_bits_fill_partial_byte() {
        let mut w = BitWriter::new();
        w.write_bits(0b01, 2);
        assert_eq!(w.trailing_bits(), vec![0x60]);
    }

    #[test]
    fn inv_signed_literal_is_twos_complement() {
        let mut w = BitWriter::new();
        w.write_inv_signed_literal(-1, 6);
        w.write_bit(false);
        assert_eq!(w.finalize(), vec![0xFE]);

        let mut w = BitWriter::new();
        w.write_inv_signed_literal(5, 6);
        w.write_bit(false);
        assert_eq!(w.finalize(), vec![0x0A]);
    }

    #[test]
    fn delta_q_zero_is_one_bit() {
        let mut w = BitWriter::new();
        w.write_delta_q(0);
        w.write_delta_q(-3);
        // 0, then 1 and -3 in seven bits
        assert_eq!(w.finalize(), vec![0b0111_1110, 0b1000_0000]);
    }
}
