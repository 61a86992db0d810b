use crate::cdf::{CDF_PROB_TOP, Cdf};
use crate::primitive::BitSink;

pub const EC_PROB_SHIFT: u32 = 6;
pub const EC_MIN_PROB: u32 = 4;

type EcWindow = u32;

/// Multi-symbol range encoder.
pub struct MsacEncoder {
    low: EcWindow,
    rng: u16,
    cnt: i16,
    precarry: Vec<u16>,
    pub allow_update_cdf: bool,
}

impl MsacEncoder {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            low: 0,
            rng: 0x8000,
            cnt: -9,
            precarry: Vec::with_capacity(bytes),
            allow_update_cdf: true,
        }
    }

    fn compute_bounds(&self, fl: u16, fh: u16, nms: u16) -> (EcWindow, u16) {
        let r = self.rng as u32;
        let mut u = (((r >> 8) * ((fl as u32) >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT))
            + EC_MIN_PROB * nms as u32;
        if fl >= CDF_PROB_TOP {
            u = r;
        }
        let v = (((r >> 8) * ((fh as u32) >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT))
            + EC_MIN_PROB * (nms as u32 - 1);
        ((r - u) as EcWindow, (u - v) as u16)
    }

    fn store(&mut self, fl: u16, fh: u16, nms: u16) {
        let (l, r) = self.compute_bounds(fl, fh, nms);
        let mut low = l + self.low;
        let mut c = self.cnt;
        let d = r.leading_zeros() as i16;
        let mut s = c + d;

        if s >= 0 {
            c += 16;
            let mut m = ((1u32 << c) - 1) as EcWindow;
            if s >= 8 {
                self.precarry.push((low >> c) as u16);
                low &= m;
                c -= 8;
                m >>= 8;
            }
            self.precarry.push((low >> c) as u16);
            s = c + d - 24;
            low &= m;
        }
        self.low = low << d;
        self.rng = r << d;
        self.cnt = s;
    }

    /// Codes `symbol` with `cdf`, adapting it unless updates are disabled.
    pub fn encode_symbol(&mut self, symbol: usize, cdf: &mut Cdf) {
        self.encode_symbol_fixed(symbol, cdf);
        if self.allow_update_cdf {
            cdf.adapt(symbol);
        }
    }

    /// Codes `symbol` without touching the table.
    pub fn encode_symbol_fixed(&mut self, symbol: usize, cdf: &Cdf) {
        let n = cdf.symbols();
        debug_assert!(symbol < n);
        let nms = (n - symbol) as u16;
        self.store(cdf.upper(symbol), cdf.icdf[symbol], nms);
    }

    pub fn encode_bool(&mut self, val: bool, cdf: &mut Cdf) {
        self.encode_symbol(val as usize, cdf);
    }

    /// Codes a bit with `prob` in the role of `icdf[0]`: a zero takes
    /// `(32768 - prob) / 32768` of the range.
    pub fn encode_bool_prob(&mut self, val: bool, prob: u16) {
        let nms = if val { 1u16 } else { 2u16 };
        let fl = if val { prob } else { CDF_PROB_TOP };
        let fh = if val { 0 } else { prob };
        self.store(fl, fh, nms);
    }

    pub fn encode_bool_equi(&mut self, val: bool) {
        self.encode_bool_prob(val, CDF_PROB_TOP >> 1);
    }

    pub fn encode_literal(&mut self, value: u32, bits: u32) {
        for i in (0..bits).rev() {
            self.encode_bool_equi((value >> i) & 1 == 1);
        }
    }

    pub fn encode_golomb(&mut self, val: u32) {
        let x = val + 1;
        let num_bits = 31 - x.leading_zeros();

        for _ in 0..num_bits {
            self.encode_bool_equi(false);
        }
        self.encode_bool_equi(true);

        for i in (0..num_bits).rev() {
            self.encode_bool_equi((x >> i) & 1 == 1);
        }
    }

    /// Bits consumed so far, including the pending window.
    pub fn tell(&self) -> usize {
        (self.cnt as isize + 10) as usize + self.precarry.len() * 8
    }

    pub fn finalize(mut self) -> Vec<u8> {
        let l = self.low;
        let mut c = self.cnt;
        let mut s: i16 = 10;
        let m: EcWindow = 0x3FFF;
        let mut e = ((l + m) & !m) | (m + 1);

        s += c;

        if s > 0 {
            let mut n = ((1u32 << (c + 16)) - 1) as EcWindow;

            loop {
                self.precarry.push((e >> (c + 16)) as u16);
                e &= n;
                s -= 8;
                c -= 8;
                n >>= 8;

                if s <= 0 {
                    break;
                }
            }
        }

        let mut carry: u32 = 0;
        let mut offs = self.precarry.len();
        let mut out = vec![0u8; offs];
        while offs > 0 {
            offs -= 1;
            carry += self.precarry[offs] as u32;
            out[offs] = carry as u8;
            carry >>= 8;
        }

        out
    }
}

impl Default for MsacEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BitSink for MsacEncoder {
    fn put_bit(&mut self, bit: bool) {
        self.encode_bool_equi(bit);
    }
}
