use crate::cdf::{MvCdfs, MvComponentCdfs};
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::mode::{Mv, MvJoint, MvPrecision};
use crate::msac::MsacEncoder;

/// Largest coded difference magnitude per component, in 1/8 pel.
pub const MV_DIFF_MAX: u32 = 1 << 14;

const CLASS0_SIZE: u32 = 2;
const MV_CLASS_10: usize = 10;

/// Splits `|diff| - 1` into class and in-class offset.
fn mv_class(z: u32) -> (usize, u32) {
    let class = if z >= CLASS0_SIZE * 4096 {
        MV_CLASS_10
    } else {
        (z >> 3).checked_ilog2().unwrap_or(0) as usize
    };
    let base = if class == 0 { 0 } else { CLASS0_SIZE << (class + 2) };
    (class, z - base)
}

fn write_component(enc: &mut MsacEncoder, cdfs: &mut MvComponentCdfs, diff: i32, precision: MvPrecision) {
    let (class, offset) = mv_class(diff.unsigned_abs() - 1);
    let d = offset >> 3;
    let fr = ((offset >> 1) & 3) as usize;
    let hp = offset & 1 == 1;

    enc.encode_bool(diff < 0, &mut cdfs.sign);
    enc.encode_symbol(class, &mut cdfs.classes);
    if class == 0 {
        enc.encode_bool(d == 1, &mut cdfs.class0);
    } else {
        for i in 0..class {
            enc.encode_bool((d >> i) & 1 == 1, &mut cdfs.bits[i]);
        }
    }

    if precision > MvPrecision::Integer {
        let fp = if class == 0 { &mut cdfs.class0_fp[d as usize] } else { &mut cdfs.fp };
        enc.encode_symbol(fr, fp);
        if precision == MvPrecision::High {
            let hp_cdf = if class == 0 { &mut cdfs.class0_hp } else { &mut cdfs.hp };
            enc.encode_bool(hp, hp_cdf);
        }
    }
}

fn check_component(diff: i32, precision: MvPrecision, location: BlockLocation) -> Result<()> {
    let reason = if diff.unsigned_abs() > MV_DIFF_MAX {
        Some(format!("difference {diff} exceeds {MV_DIFF_MAX}"))
    } else {
        match precision {
            MvPrecision::Integer if diff % 8 != 0 => Some(format!("difference {diff} is not whole-pel")),
            MvPrecision::Low if diff % 2 != 0 => Some(format!("difference {diff} needs high precision")),
            _ => None,
        }
    };
    match reason {
        Some(reason) => Err(EntropyError::invariant(SyntaxElement::MotionVector, location, reason)),
        None => Ok(()),
    }
}

/// Codes `mv - ref_mv` with the given precision.
pub fn write_mv(
    enc: &mut MsacEncoder,
    cdfs: &mut MvCdfs,
    mv: Mv,
    ref_mv: Mv,
    precision: MvPrecision,
    location: BlockLocation,
) -> Result<()> {
    let dr = mv.row as i32 - ref_mv.row as i32;
    let dc = mv.col as i32 - ref_mv.col as i32;
    check_component(dr, precision, location)?;
    check_component(dc, precision, location)?;

    let joint = MvJoint::of(dr, dc);
    enc.encode_symbol(joint as usize, &mut cdfs.joints);
    if joint.has_row() {
        write_component(enc, &mut cdfs.comps[0], dr, precision);
    }
    if joint.has_col() {
        write_component(enc, &mut cdfs.comps[1], dc, precision);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MsacDecoder;

    fn read_component(dec: &mut MsacDecoder, cdfs: &mut MvComponentCdfs, precision: MvPrecision) -> i32 {
        let sign = dec.decode_bool(&mut cdfs.sign);
        let class = dec.decode_symbol(&mut cdfs.classes);
        let d = if class == 0 {
            dec.decode_bool(&mut cdfs.class0) as u32
        } else {
            (0..class).fold(0, |acc, i| acc | ((dec.decode_bool(&mut cdfs.bits[i]) as u32) << i))
        };
        let (fr, hp) = if precision > MvPrecision::Integer {
            let fp = if class == 0 { &mut cdfs.class0_fp[d as usize] } else { &mut cdfs.fp };
            let fr = dec.decode_symbol(fp) as u32;
            let hp = if precision == MvPrecision::High {
                let cdf = if class == 0 { &mut cdfs.class0_hp } else { &mut cdfs.hp };
                dec.decode_bool(cdf) as u32
            } else {
                1
            };
            (fr, hp)
        } else {
            (3, 1)
        };
        let base = if class == 0 { 0 } else { CLASS0_SIZE << (class + 2) };
        let mag = base + ((d << 3) | (fr << 1) | hp) + 1;
        if sign { -(mag as i32) } else { mag as i32 }
    }

    fn read_mv(dec: &mut MsacDecoder, cdfs: &mut MvCdfs, precision: MvPrecision) -> (i32, i32) {
        let joint = dec.decode_symbol(&mut cdfs.joints);
        let row = if joint >= 2 { read_component(dec, &mut cdfs.comps[0], precision) } else { 0 };
        let col = if joint & 1 == 1 { read_component(dec, &mut cdfs.comps[1], precision) } else { 0 };
        (row, col)
    }

    #[test]
    fn class_boundaries() {
        assert_eq!(mv_class(0), (0, 0));
        assert_eq!(mv_class(15), (0, 15));
        assert_eq!(mv_class(16), (1, 0));
        assert_eq!(mv_class(8191), (9, 8191 - 4096));
        assert_eq!(mv_class(8192), (10, 0));
        assert_eq!(mv_class(16383), (10, 8191));
    }

    #[test]
    fn differences_decode_back() {
        let cases = [
            (MvPrecision::High, Mv::new(5, -3), Mv::ZERO),
            (MvPrecision::High, Mv::new(-1200, 77), Mv::new(30, 30)),
            (MvPrecision::Low, Mv::new(64, -2), Mv::new(0, 0)),
            (MvPrecision::Integer, Mv::new(-16, 8192), Mv::new(8, 0)),
            (MvPrecision::High, Mv::new(12, 12), Mv::new(12, 12)),
        ];
        let mut enc = MsacEncoder::new();
        let mut cdfs = MvCdfs::default();
        for &(p, mv, r) in &cases {
            write_mv(&mut enc, &mut cdfs, mv, r, p, BlockLocation::frame()).unwrap();
        }
        let data = enc.finalize();
        let mut dec = MsacDecoder::new(&data, true);
        let mut cdfs = MvCdfs::default();
        for &(p, mv, r) in &cases {
            let (dr, dc) = read_mv(&mut dec, &mut cdfs, p);
            assert_eq!((dr, dc), (mv.row as i32 - r.row as i32, mv.col as i32 - r.col as i32));
        }
    }

    #[test]
    fn precision_is_enforced() {
        let mut enc = MsacEncoder::new();
        let mut cdfs = MvCdfs::default();
        let loc = BlockLocation::frame();
        assert!(write_mv(&mut enc, &mut cdfs, Mv::new(3, 0), Mv::ZERO, MvPrecision::Low, loc).is_err());
        assert!(write_mv(&mut enc, &mut cdfs, Mv::new(0, 4), Mv::ZERO, MvPrecision::Integer, loc).is_err());
        let far = Mv::new(i16::MAX, 0);
        let err = write_mv(&mut enc, &mut cdfs, far, Mv::new(-8, 0), MvPrecision::High, loc).unwrap_err();
        assert!(matches!(
            err,
            EntropyError::InvariantViolation { element: SyntaxElement::MotionVector, .. }
        ));
    }
}
