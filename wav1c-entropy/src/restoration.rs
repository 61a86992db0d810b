//! Loop-restoration unit coefficients, coded at the start of each
//! superblock for the units whose top-left corner it contains.

use std::ops::Range;

use crate::block::RestorationUnit;
use crate::cdf::CdfContext;
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::frame::FrameHeader;
use crate::mode::RestorationType;
use crate::msac::MsacEncoder;
use crate::primitive::write_refsubexpfin;
use crate::sequence::SequenceHeader;
use crate::size::{BlockSize, MI_SIZE};

const WIENER_TAPS_MIN: [i8; 3] = [-5, -23, -17];
const WIENER_TAPS_MAX: [i8; 3] = [10, 8, 46];
const WIENER_TAPS_K: [u32; 3] = [1, 2, 3];
const WIENER_TAPS_MID: [i8; 3] = [3, -7, 15];

const SGRPROJ_PARAMS_BITS: u32 = 4;
const SGRPROJ_PRJ_SUBEXP_K: u32 = 4;
const SGRPROJ_PRJ_BITS: u32 = 7;
const SGRPROJ_XQD_MIN: [i8; 2] = [-96, -32];
const SGRPROJ_XQD_MAX: [i8; 2] = [31, 95];
const SGRPROJ_XQD_MID: [i8; 2] = [-32, 31];

/// Which of the two self-guided passes a parameter set runs.
fn sgrproj_passes(set: u8) -> [bool; 2] {
    match set {
        10..=13 => [false, true],
        14..=15 => [true, false],
        _ => [true, true],
    }
}

/// Unit grid of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorationPlane {
    pub frame_type: RestorationType,
    pub unit_size: u32,
    pub rows: u32,
    pub cols: u32,
    ssx: u32,
    ssy: u32,
}

fn count_units(unit_size: u32, frame_size: u32) -> u32 {
    ((frame_size + (unit_size >> 1)) / unit_size).max(1)
}

impl RestorationPlane {
    pub fn unit_count(&self) -> usize {
        if self.frame_type == RestorationType::None {
            0
        } else {
            (self.rows * self.cols) as usize
        }
    }

    /// Unit rows and columns whose top-left corner falls inside the
    /// superblock at (`mi_row`, `mi_col`).
    pub fn units_in_sb(&self, mi_row: u32, mi_col: u32, sb_size: BlockSize) -> (Range<u32>, Range<u32>) {
        let span = |pos: u32, len: u32, ss: u32, count: u32| {
            let step = MI_SIZE >> ss;
            let start = (pos * step + self.unit_size - 1) / self.unit_size;
            let end = (((pos + len) * step + self.unit_size - 1) / self.unit_size).min(count);
            start..end.max(start)
        };
        (
            span(mi_row, sb_size.height_mi(), self.ssy, self.rows),
            span(mi_col, sb_size.width_mi(), self.ssx, self.cols),
        )
    }
}

/// Restoration unit grids of all planes for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorationLayout {
    pub planes: [RestorationPlane; 3],
    /// Units are not coded on intra-block-copy frames.
    pub coded: bool,
}

impl RestorationLayout {
    pub fn new(seq: &SequenceHeader, fh: &FrameHeader) -> Self {
        let lr = fh.effective_restoration(seq);
        let (w, h) = (seq.max_frame_width, seq.max_frame_height);
        let planes = std::array::from_fn(|plane| {
            let (ssx, ssy) = if plane == 0 { (0, 0) } else { (seq.ssx(), seq.ssy()) };
            let unit_size = lr.unit_size(plane);
            RestorationPlane {
                frame_type: lr.types[plane],
                unit_size,
                rows: count_units(unit_size, (h + ssy) >> ssy),
                cols: count_units(unit_size, (w + ssx) >> ssx),
                ssx,
                ssy,
            }
        });
        Self {
            planes,
            coded: lr.uses_lr() && !fh.allow_intrabc,
        }
    }

    pub fn unit_count(&self, plane: usize) -> usize {
        self.planes[plane].unit_count()
    }
}

/// Reference coefficients the next unit is coded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorationRefs {
    wiener: [[[i8; 3]; 2]; 3],
    sgrproj: [[i8; 2]; 3],
}

impl Default for RestorationRefs {
    fn default() -> Self {
        Self {
            wiener: [[WIENER_TAPS_MID; 2]; 3],
            sgrproj: [SGRPROJ_XQD_MID; 3],
        }
    }
}

impl RestorationRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called at the start of every tile.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn lr_error(location: BlockLocation, reason: String) -> EntropyError {
    EntropyError::invariant(SyntaxElement::Restoration, location, reason)
}

fn write_wiener(
    enc: &mut MsacEncoder,
    refs: &mut [[i8; 3]; 2],
    plane: usize,
    coeffs: &[[i8; 3]; 2],
    location: BlockLocation,
) -> Result<()> {
    let first = if plane > 0 { 1 } else { 0 };
    for (pass, taps) in coeffs.iter().enumerate() {
        if plane > 0 && taps[0] != 0 {
            return Err(lr_error(location, format!("chroma Wiener tap 0 is {}", taps[0])));
        }
        for i in first..3 {
            let (min, max) = (WIENER_TAPS_MIN[i], WIENER_TAPS_MAX[i]);
            if !(min..=max).contains(&taps[i]) {
                return Err(lr_error(location, format!("Wiener tap {i} = {} out of range", taps[i])));
            }
            let n = (max as i32 - min as i32 + 1) as u32;
            let reference = (refs[pass][i] as i32 - min as i32) as u32;
            let v = (taps[i] as i32 - min as i32) as u32;
            write_refsubexpfin(enc, n, WIENER_TAPS_K[i], reference, v);
        }
    }
    *refs = *coeffs;
    Ok(())
}

fn write_sgrproj(
    enc: &mut MsacEncoder,
    refs: &mut [i8; 2],
    set: u8,
    xqd: [i8; 2],
    location: BlockLocation,
) -> Result<()> {
    if set >= 1 << SGRPROJ_PARAMS_BITS {
        return Err(lr_error(location, format!("self-guided set {set} out of range")));
    }
    let passes = sgrproj_passes(set);
    if !passes[0] && xqd[0] != 0 {
        return Err(lr_error(location, format!("set {set} needs xqd[0] = 0")));
    }
    let implied = (((1i32 << SGRPROJ_PRJ_BITS) - xqd[0] as i32)
        .clamp(SGRPROJ_XQD_MIN[1] as i32, SGRPROJ_XQD_MAX[1] as i32)) as i8;
    if !passes[1] && xqd[1] != implied {
        return Err(lr_error(location, format!("set {set} needs xqd[1] = {implied}")));
    }

    enc.encode_literal(set as u32, SGRPROJ_PARAMS_BITS);
    for i in 0..2 {
        if !passes[i] {
            continue;
        }
        let (min, max) = (SGRPROJ_XQD_MIN[i], SGRPROJ_XQD_MAX[i]);
        if !(min..=max).contains(&xqd[i]) {
            return Err(lr_error(location, format!("xqd[{i}] = {} out of range", xqd[i])));
        }
        let n = (max as i32 - min as i32 + 1) as u32;
        let reference = (refs[i] as i32 - min as i32) as u32;
        write_refsubexpfin(enc, n, SGRPROJ_PRJ_SUBEXP_K, reference, (xqd[i] as i32 - min as i32) as u32);
    }
    *refs = xqd;
    Ok(())
}

/// Codes one restoration unit of `plane` under the frame's restoration type.
pub fn write_restoration_unit(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    refs: &mut RestorationRefs,
    plane: usize,
    frame_type: RestorationType,
    unit: &RestorationUnit,
    location: BlockLocation,
) -> Result<()> {
    let coded = match (frame_type, unit) {
        (RestorationType::None, _) => return Ok(()),
        (RestorationType::Switchable, u) => {
            let symbol = match u {
                RestorationUnit::None => RestorationType::None,
                RestorationUnit::Wiener { .. } => RestorationType::Wiener,
                RestorationUnit::Sgrproj { .. } => RestorationType::Sgrproj,
            };
            enc.encode_symbol(symbol as usize, &mut cdfs.switchable_restore);
            true
        }
        (RestorationType::Wiener, RestorationUnit::Sgrproj { .. })
        | (RestorationType::Sgrproj, RestorationUnit::Wiener { .. }) => {
            return Err(lr_error(location, format!("{unit:?} on a {frame_type:?} plane")));
        }
        (RestorationType::Wiener, u) => {
            let on = !matches!(u, RestorationUnit::None);
            enc.encode_bool(on, &mut cdfs.wiener_restore);
            on
        }
        (RestorationType::Sgrproj, u) => {
            let on = !matches!(u, RestorationUnit::None);
            enc.encode_bool(on, &mut cdfs.sgrproj_restore);
            on
        }
    };
    if !coded {
        return Ok(());
    }
    match *unit {
        RestorationUnit::None => Ok(()),
        RestorationUnit::Wiener { coeffs } => write_wiener(enc, &mut refs.wiener[plane], plane, &coeffs, location),
        RestorationUnit::Sgrproj { set, xqd } => write_sgrproj(enc, &mut refs.sgrproj[plane], set, xqd, location),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RestorationParams;
    use crate::testutil::{MsacDecoder, read_refsubexpfin};

    #[test]
    fn unit_counts_round_to_nearest() {
        assert_eq!(count_units(64, 100), 2);
        assert_eq!(count_units(64, 95), 1);
        assert_eq!(count_units(256, 16), 1);
    }

    #[test]
    fn superblock_claims_units_by_top_left_corner() {
        let mut seq = SequenceHeader::new(200, 130);
        seq.enable_restoration = true;
        let mut fh = FrameHeader::key_frame(100);
        fh.restoration = RestorationParams {
            types: [RestorationType::Wiener, RestorationType::Sgrproj, RestorationType::None],
            unit_shift: 0,
            uv_shift: 1,
        };
        let layout = RestorationLayout::new(&seq, &fh);
        assert!(layout.coded);
        let y = layout.planes[0];
        assert_eq!((y.rows, y.cols), (2, 3));
        assert_eq!(y.units_in_sb(0, 0, BlockSize::Block64x64), (0..1, 0..1));
        assert_eq!(y.units_in_sb(16, 32, BlockSize::Block64x64), (1..2, 2..3));
        assert_eq!(y.units_in_sb(32, 48, BlockSize::Block64x64), (2..2, 3..3));
        let u = layout.planes[1];
        assert_eq!(u.unit_size, 32);
        assert_eq!(u.units_in_sb(16, 16, BlockSize::Block64x64), (1..2, 1..2));
        assert_eq!(layout.unit_count(2), 0);
    }

    #[test]
    fn wiener_taps_decode_against_references() {
        let unit = RestorationUnit::Wiener { coeffs: [[1, -10, 20], [-5, 8, 46]] };
        let mut refs = RestorationRefs::new();
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 0, RestorationType::Wiener, &unit, BlockLocation::frame())
            .unwrap();
        write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 0, RestorationType::Wiener, &unit, BlockLocation::frame())
            .unwrap();
        let data = enc.finalize();

        let mut dec = MsacDecoder::new(&data, true);
        let mut cdfs = CdfContext::new();
        let mut reference = [[3i8, -7, 15]; 2];
        for _ in 0..2 {
            assert!(dec.decode_bool(&mut cdfs.wiener_restore));
            let mut got = [[0i8; 3]; 2];
            for pass in 0..2 {
                for i in 0..3 {
                    let n = (WIENER_TAPS_MAX[i] - WIENER_TAPS_MIN[i] + 1) as u32;
                    let r = (reference[pass][i] - WIENER_TAPS_MIN[i]) as u32;
                    got[pass][i] = read_refsubexpfin(&mut dec, n, WIENER_TAPS_K[i], r) as i8 + WIENER_TAPS_MIN[i];
                }
            }
            assert_eq!(got, [[1, -10, 20], [-5, 8, 46]]);
            reference = got;
        }
    }

    #[test]
    fn switchable_units_carry_their_type() {
        let units = [
            RestorationUnit::None,
            RestorationUnit::Sgrproj { set: 3, xqd: [-40, 50] },
            RestorationUnit::Wiener { coeffs: [[0, -7, 15], [0, 0, 0]] },
        ];
        let mut refs = RestorationRefs::new();
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        for unit in &units {
            write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 1, RestorationType::Switchable, unit, BlockLocation::frame())
                .unwrap();
        }
        let data = enc.finalize();
        let mut dec = MsacDecoder::new(&data, true);
        let mut cdfs = CdfContext::new();
        assert_eq!(dec.decode_symbol(&mut cdfs.switchable_restore), 0);
        assert_eq!(dec.decode_symbol(&mut cdfs.switchable_restore), 2);
        assert_eq!(dec.decode_literal(4), 3);
    }

    #[test]
    fn sgrproj_single_pass_constraints() {
        let mut refs = RestorationRefs::new();
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let loc = BlockLocation::frame();
        let ok = RestorationUnit::Sgrproj { set: 14, xqd: [-20, 95] };
        assert!(write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 0, RestorationType::Sgrproj, &ok, loc).is_ok());
        let bad = RestorationUnit::Sgrproj { set: 14, xqd: [-20, 0] };
        assert!(write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 0, RestorationType::Sgrproj, &bad, loc).is_err());
        let bad0 = RestorationUnit::Sgrproj { set: 10, xqd: [5, 0] };
        assert!(write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 0, RestorationType::Sgrproj, &bad0, loc).is_err());
    }

    #[test]
    fn chroma_wiener_keeps_outer_tap_zero() {
        let mut refs = RestorationRefs::new();
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let unit = RestorationUnit::Wiener { coeffs: [[1, 0, 0], [0, 0, 0]] };
        assert!(
            write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 2, RestorationType::Wiener, &unit, BlockLocation::frame())
                .is_err()
        );
        let sgr = RestorationUnit::Sgrproj { set: 0, xqd: [0, 0] };
        assert!(
            write_restoration_unit(&mut enc, &mut cdfs, &mut refs, 2, RestorationType::Wiener, &sgr, BlockLocation::frame())
                .is_err()
        );
    }
}
