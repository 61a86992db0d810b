//! Block-level segment ids, CDEF strength indices and quantizer deltas.

use crate::cdf::CdfContext;
use crate::context::SegmentPrediction;
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::frame::SegmentationParams;
use crate::msac::MsacEncoder;
use crate::primitive::neg_interleave;

/// Codes the segment id of a block coded after its skip flag and returns
/// the id later blocks predict from. Skipped blocks inherit the prediction.
pub fn write_segment_id(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    seg: &SegmentationParams,
    pred: SegmentPrediction,
    segment_id: u8,
    skip: bool,
    location: BlockLocation,
) -> Result<u8> {
    if !seg.enabled {
        if segment_id != 0 {
            return Err(EntropyError::invariant(
                SyntaxElement::SegmentId,
                location,
                format!("segment {segment_id} with segmentation disabled"),
            ));
        }
        return Ok(0);
    }
    let last_active = seg.last_active_segment_id();
    if segment_id > last_active {
        return Err(EntropyError::invariant(
            SyntaxElement::SegmentId,
            location,
            format!("segment {segment_id} above last active {last_active}"),
        ));
    }
    if !seg.update_map {
        return Ok(segment_id);
    }
    if skip {
        return Ok(pred.pred);
    }
    let symbol = neg_interleave(segment_id as i32, pred.pred as i32, last_active as i32 + 1);
    enc.encode_symbol(symbol as usize, &mut cdfs.spatial_pred_seg[pred.cdf_index]);
    Ok(segment_id)
}

/// Tracks which 64x64 units of the current superblock have sent their
/// CDEF index.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdefTracker {
    coded: [bool; 4],
}

impl CdefTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called at the top-left block of each superblock.
    pub fn reset(&mut self) {
        self.coded = [false; 4];
    }

    /// Codes `cdef_idx` for the first non-skipped block of its 64x64 unit.
    pub fn write(
        &mut self,
        enc: &mut MsacEncoder,
        cdef_bits: u8,
        sb128: bool,
        skip: bool,
        cdef_idx: u8,
        location: BlockLocation,
    ) -> Result<()> {
        const UNIT_MI: u32 = 16;
        let index = if sb128 {
            (location.mi_col & UNIT_MI != 0) as usize + 2 * (location.mi_row & UNIT_MI != 0) as usize
        } else {
            0
        };
        if skip || self.coded[index] {
            return Ok(());
        }
        if cdef_idx as u32 >= 1 << cdef_bits {
            return Err(EntropyError::invariant(
                SyntaxElement::Cdef,
                location,
                format!("index {cdef_idx} needs more than {cdef_bits} bits"),
            ));
        }
        enc.encode_literal(cdef_idx as u32, cdef_bits as u32);
        self.coded[index] = true;
        Ok(())
    }
}

const DELTA_Q_SMALL: u32 = 3;
/// Largest superblock delta magnitude in `delta_q_res` steps.
pub const DELTA_Q_MAX: u32 = 255;

/// Codes a superblock quantizer delta, already divided by the resolution.
pub fn write_delta_qindex(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    delta: i32,
    location: BlockLocation,
) -> Result<()> {
    let abs = delta.unsigned_abs();
    if abs > DELTA_Q_MAX {
        return Err(EntropyError::invariant(
            SyntaxElement::DeltaQ,
            location,
            format!("delta {delta} out of range"),
        ));
    }
    enc.encode_symbol(abs.min(DELTA_Q_SMALL) as usize, &mut cdfs.delta_q);
    if abs >= DELTA_Q_SMALL {
        let rem_bits = (abs - 1).ilog2();
        enc.encode_literal(rem_bits - 1, 3);
        enc.encode_literal(abs - (1 << rem_bits) - 1, rem_bits);
    }
    if abs > 0 {
        enc.encode_bool_equi(delta < 0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::spatial_segment_pred;
    use crate::testutil::MsacDecoder;

    fn seg_with_active(last: usize) -> SegmentationParams {
        let mut seg = SegmentationParams {
            enabled: true,
            update_map: true,
            ..Default::default()
        };
        seg.features[last][0] = Some(-4);
        seg
    }

    fn read_delta(dec: &mut MsacDecoder, cdfs: &mut CdfContext) -> i32 {
        let mut abs = dec.decode_symbol(&mut cdfs.delta_q) as u32;
        if abs == DELTA_Q_SMALL {
            let rem_bits = dec.decode_literal(3) + 1;
            abs = dec.decode_literal(rem_bits) + (1 << rem_bits) + 1;
        }
        if abs > 0 && dec.decode_bool_equi() { -(abs as i32) } else { abs as i32 }
    }

    #[test]
    fn delta_q_values_decode_back() {
        let values = [0, 1, -2, 3, -4, 17, -100, 255];
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        for &v in &values {
            write_delta_qindex(&mut enc, &mut cdfs, v, BlockLocation::frame()).unwrap();
        }
        let data = enc.finalize();
        let mut dec = MsacDecoder::new(&data, true);
        let mut cdfs = CdfContext::new();
        for &v in &values {
            assert_eq!(read_delta(&mut dec, &mut cdfs), v);
        }
    }

    #[test]
    fn delta_q_rejects_large_steps() {
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        assert!(write_delta_qindex(&mut enc, &mut cdfs, 256, BlockLocation::frame()).is_err());
    }

    #[test]
    fn skipped_blocks_take_the_prediction() {
        let seg = seg_with_active(5);
        let pred = spatial_segment_pred(Some(3), Some(3), Some(3));
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let id = write_segment_id(&mut enc, &mut cdfs, &seg, pred, 1, true, BlockLocation::frame()).unwrap();
        assert_eq!(id, 3);
        assert_eq!(enc.tell(), MsacEncoder::new().tell());
    }

    #[test]
    fn segment_ids_decode_through_interleave() {
        let seg = seg_with_active(5);
        let pred = spatial_segment_pred(Some(2), Some(2), Some(4));
        let ids = [0u8, 2, 4, 5, 1];
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        for &id in &ids {
            write_segment_id(&mut enc, &mut cdfs, &seg, pred, id, false, BlockLocation::frame()).unwrap();
        }
        let data = enc.finalize();
        let mut dec = MsacDecoder::new(&data, true);
        let mut cdfs = CdfContext::new();
        for &id in &ids {
            let sym = dec.decode_symbol(&mut cdfs.spatial_pred_seg[pred.cdf_index]) as i32;
            assert_eq!(sym, neg_interleave(id as i32, pred.pred as i32, 6));
        }
    }

    #[test]
    fn segment_above_last_active_is_rejected() {
        let seg = seg_with_active(2);
        let pred = spatial_segment_pred(None, None, None);
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let err = write_segment_id(&mut enc, &mut cdfs, &seg, pred, 3, false, BlockLocation::frame());
        assert!(err.is_err());
    }

    #[test]
    fn cdef_index_goes_once_per_unit() {
        let mut tracker = CdefTracker::new();
        let mut enc = MsacEncoder::new();
        tracker.write(&mut enc, 2, true, true, 1, BlockLocation::frame()).unwrap();
        tracker.write(&mut enc, 2, true, false, 1, BlockLocation::frame()).unwrap();
        tracker.write(&mut enc, 2, true, false, 3, BlockLocation::frame()).unwrap();
        let mut right = BlockLocation::frame();
        right.mi_col = 16;
        tracker.write(&mut enc, 2, true, false, 2, right).unwrap();
        let data = enc.finalize();
        let mut dec = MsacDecoder::new(&data, true);
        assert_eq!(dec.decode_literal(2), 1);
        assert_eq!(dec.decode_literal(2), 2);
    }

    #[test]
    fn cdef_index_must_fit_bits() {
        let mut tracker = CdefTracker::new();
        let mut enc = MsacEncoder::new();
        assert!(tracker.write(&mut enc, 1, false, false, 2, BlockLocation::frame()).is_err());
    }
}
