//! Reference readers used to check that coded output decodes back to the
//! values that produced it.

use crate::cdf::Cdf;
use crate::msac::{EC_MIN_PROB, EC_PROB_SHIFT};

pub struct MsacDecoder {
    dif: u64,
    rng: u32,
    cnt: i32,
    buf: Vec<u8>,
    pos: usize,
    allow_update_cdf: bool,
}

impl MsacDecoder {
    pub fn new(data: &[u8], allow_update_cdf: bool) -> Self {
        let mut dec = Self {
            dif: 0,
            rng: 0x8000,
            cnt: -15,
            buf: data.to_vec(),
            pos: 0,
            allow_update_cdf,
        };
        dec.refill();
        dec
    }

    fn refill(&mut self) {
        let mut c = 48 - self.cnt - 24;
        let mut dif = self.dif;
        while c >= 0 {
            let byte = if self.pos < self.buf.len() {
                let b = self.buf[self.pos];
                self.pos += 1;
                b ^ 0xFF
            } else {
                0xFF
            };
            dif |= (byte as u64) << c;
            c -= 8;
        }
        self.dif = dif;
        self.cnt = 48 - c - 24;
    }

    fn norm(&mut self, dif: u64, rng: u32) {
        let d = rng.leading_zeros() as i32 - 16;
        let cnt = self.cnt;
        self.dif = dif << d;
        self.rng = rng << d;
        self.cnt = cnt - d;
        if (cnt as u32) < (d as u32) {
            self.refill();
        }
    }

    pub fn decode_symbol_fixed(&mut self, cdf: &Cdf) -> usize {
        let n_minus_one = cdf.symbols() as u32 - 1;
        let c = (self.dif >> 32) as u32;
        let r = self.rng >> 8;
        let mut u;
        let mut v = self.rng;
        let mut val: u32 = u32::MAX;

        loop {
            val = val.wrapping_add(1);
            u = v;
            v = r * ((cdf.icdf[val as usize] >> EC_PROB_SHIFT) as u32);
            v >>= 7 - EC_PROB_SHIFT;
            v += EC_MIN_PROB * (n_minus_one - val);
            if c >= v {
                break;
            }
        }

        self.norm(self.dif - ((v as u64) << 32), u - v);
        val as usize
    }

    pub fn decode_symbol(&mut self, cdf: &mut Cdf) -> usize {
        let val = self.decode_symbol_fixed(cdf);
        if self.allow_update_cdf {
            cdf.adapt(val);
        }
        val
    }

    pub fn decode_bool(&mut self, cdf: &mut Cdf) -> bool {
        self.decode_symbol(cdf) == 1
    }

    pub fn decode_bool_prob(&mut self, f: u16) -> bool {
        let f = f as u32;
        let r = self.rng;
        let dif = self.dif;
        let mut v = (((r >> 8) * (f >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT)) + EC_MIN_PROB;
        let vw = (v as u64) << 32;
        let ret = dif >= vw;
        let new_dif = if ret { dif - vw } else { dif };
        if ret {
            v = v.wrapping_add(r.wrapping_sub(2u32.wrapping_mul(v)));
        }
        self.norm(new_dif, v);
        !ret
    }

    pub fn decode_bool_equi(&mut self) -> bool {
        self.decode_bool_prob(16384)
    }

    pub fn decode_literal(&mut self, bits: u32) -> u32 {
        let mut v = 0;
        for _ in 0..bits {
            v = (v << 1) | self.decode_bool_equi() as u32;
        }
        v
    }

    pub fn decode_golomb(&mut self) -> u32 {
        let mut len = 0u32;
        while len < 32 && !self.decode_bool_equi() {
            len += 1;
        }
        let mut val = 1u32 << len;
        for i in (0..len).rev() {
            if self.decode_bool_equi() {
                val += 1 << i;
            }
        }
        val - 1
    }
}

/// MSB-first reader over raw header bytes.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_bits(&mut self, n: u32) -> u64 {
        let mut v = 0u64;
        for _ in 0..n {
            let byte = self.data.get(self.pos / 8).copied().unwrap_or(0);
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            v = (v << 1) | bit as u64;
            self.pos += 1;
        }
        v
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_bits(1) == 1
    }
}

pub trait BitSource {
    fn get_bit(&mut self) -> bool;

    fn get_literal(&mut self, bits: u32) -> u32 {
        let mut v = 0;
        for _ in 0..bits {
            v = (v << 1) | self.get_bit() as u32;
        }
        v
    }
}

impl BitSource for MsacDecoder {
    fn get_bit(&mut self) -> bool {
        self.decode_bool_equi()
    }
}

impl BitSource for BitReader<'_> {
    fn get_bit(&mut self) -> bool {
        self.read_bool()
    }
}

pub fn read_quniform<R: BitSource>(r: &mut R, n: u32) -> u32 {
    if n <= 1 {
        return 0;
    }
    let l = 32 - n.leading_zeros();
    let m = (1 << l) - n;
    let v = r.get_literal(l - 1);
    if v < m {
        v
    } else {
        (v << 1) - m + r.get_bit() as u32
    }
}

pub fn read_subexpfin<R: BitSource>(r: &mut R, n: u32, k: u32) -> u32 {
    let mut i = 0;
    let mut mk = 0;
    loop {
        let b = if i > 0 { k + i - 1 } else { k };
        let a = 1 << b;
        if n <= mk + 3 * a {
            return read_quniform(r, n - mk) + mk;
        }
        if r.get_bit() {
            i += 1;
            mk += a;
        } else {
            return r.get_literal(b) + mk;
        }
    }
}

fn inverse_recenter(r: u32, v: u32) -> u32 {
    if v > 2 * r {
        v
    } else if v & 1 == 1 {
        r - ((v + 1) >> 1)
    } else {
        r + (v >> 1)
    }
}

pub fn read_refsubexpfin<R: BitSource>(r: &mut R, n: u32, k: u32, reference: u32) -> u32 {
    let v = read_subexpfin(r, n, k);
    if (reference << 1) <= n {
        inverse_recenter(reference, v)
    } else {
        n - 1 - inverse_recenter(n - 1 - reference, v)
    }
}

pub fn read_signed_refsubexpfin<R: BitSource>(r: &mut R, n: u32, k: u32, reference: i32) -> i32 {
    let offset = n as i32 - 1;
    read_refsubexpfin(r, (n << 1) - 1, k, (reference + offset) as u32) as i32 - offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwriter::BitWriter;
    use crate::msac::MsacEncoder;
    use crate::primitive::{write_quniform, write_refsubexpfin, write_signed_refsubexpfin};

    #[test]
    fn quniform_round_trip_on_raw_bits() {
        let mut w = BitWriter::new();
        for n in 1..20 {
            for v in 0..n {
                write_quniform(&mut w, n, v);
            }
        }
        let bytes = w.finalize();
        let mut r = BitReader::new(&bytes);
        for n in 1..20 {
            for v in 0..n {
                assert_eq!(read_quniform(&mut r, n), v);
            }
        }
    }

    #[test]
    fn refsubexpfin_round_trip_through_range_coder() {
        let cases = [(16u32, 1u32, 3u32, 12u32), (3, 0, 0, 2), (128, 4, 64, 0), (66, 2, 65, 1)];
        let mut enc = MsacEncoder::new();
        for &(n, k, r, v) in &cases {
            write_refsubexpfin(&mut enc, n, k, r, v);
        }
        let bytes = enc.finalize();
        let mut dec = MsacDecoder::new(&bytes, true);
        for &(n, k, r, v) in &cases {
            assert_eq!(read_refsubexpfin(&mut dec, n, k, r), v);
        }
    }

    #[test]
    fn signed_refsubexpfin_round_trip() {
        let mut w = BitWriter::new();
        for v in -15..=15 {
            write_signed_refsubexpfin(&mut w, 16, 3, -4, v);
        }
        let bytes = w.finalize();
        let mut r = BitReader::new(&bytes);
        for v in -15..=15 {
            assert_eq!(read_signed_refsubexpfin(&mut r, 16, 3, -4), v);
        }
    }
}
