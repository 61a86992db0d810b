//! Bounded integer codes shared by the raw bit writer and the range coder.
//!
//! Everything here is written against [`BitSink`], so the same code serves
//! header fields (plain bits) and tile payload fields (equiprobable range
//! coder bits).

pub trait BitSink {
    fn put_bit(&mut self, bit: bool);

    /// Writes `bits` bits of `value`, most significant first.
    fn put_literal(&mut self, value: u32, bits: u32) {
        debug_assert!(bits <= 32);
        for i in (0..bits).rev() {
            self.put_bit((value >> i) & 1 == 1);
        }
    }
}

fn msb(n: u32) -> u32 {
    debug_assert!(n > 0);
    31 - n.leading_zeros()
}

/// Quasi-uniform code for `v` in `0..n`.
pub fn write_quniform<W: BitSink + ?Sized>(w: &mut W, n: u32, v: u32) {
    debug_assert!(v < n.max(1));
    if n <= 1 {
        return;
    }
    let l = msb(n) + 1;
    let m = (1 << l) - n;
    if v < m {
        w.put_literal(v, l - 1);
    } else {
        w.put_literal(m + ((v - m) >> 1), l - 1);
        w.put_bit((v - m) & 1 == 1);
    }
}

/// Finite subexponential code for `v` in `0..n` with parameter `k`.
pub fn write_subexpfin<W: BitSink + ?Sized>(w: &mut W, n: u32, k: u32, v: u32) {
    let mut i = 0;
    let mut mk = 0;
    loop {
        let b = if i > 0 { k + i - 1 } else { k };
        let a = 1 << b;
        if n <= mk + 3 * a {
            write_quniform(w, n - mk, v - mk);
            break;
        }
        let more = v >= mk + a;
        w.put_bit(more);
        if more {
            i += 1;
            mk += a;
        } else {
            w.put_literal(v - mk, b);
            break;
        }
    }
}

pub fn recenter_nonneg(r: u32, v: u32) -> u32 {
    if v > (r << 1) {
        v
    } else if v >= r {
        (v - r) << 1
    } else {
        ((r - v) << 1) - 1
    }
}

pub fn recenter_finite_nonneg(n: u32, r: u32, v: u32) -> u32 {
    if (r << 1) <= n {
        recenter_nonneg(r, v)
    } else {
        recenter_nonneg(n - 1 - r, n - 1 - v)
    }
}

/// Subexponential code of `v` recentred around `reference`, both in `0..n`.
pub fn write_refsubexpfin<W: BitSink + ?Sized>(w: &mut W, n: u32, k: u32, reference: u32, v: u32) {
    write_subexpfin(w, n, k, recenter_finite_nonneg(n, reference, v));
}

/// Signed variant for values in `-(n-1)..=(n-1)`.
pub fn write_signed_refsubexpfin<W: BitSink + ?Sized>(
    w: &mut W,
    n: u32,
    k: u32,
    reference: i32,
    v: i32,
) {
    let offset = n as i32 - 1;
    let scaled_n = (n << 1) - 1;
    write_refsubexpfin(
        w,
        scaled_n,
        k,
        (reference + offset) as u32,
        (v + offset) as u32,
    );
}

/// Maps a segment id onto a small index around its spatial prediction.
pub fn neg_interleave(x: i32, r: i32, max: i32) -> i32 {
    if r == 0 {
        return x;
    }
    if r >= max - 1 {
        return -x + max - 1;
    }
    let diff = x - r;
    let interleave = |d: i32| if d > 0 { (d << 1) - 1 } else { (-d) << 1 };
    if 2 * r < max {
        if diff.abs() <= r {
            return interleave(diff);
        }
        x
    } else {
        if diff.abs() < max - r {
            return interleave(diff);
        }
        (max - x) - 1
    }
}
