//! Uncompressed frame header serialization.

use crate::bitwriter::BitWriter;
use crate::error::{EntropyError, Result};
use crate::frame::{
    FilmGrainParams, FrameHeader, FrameType, GlobalMotion, PRIMARY_REF_NONE, REFS_PER_FRAME,
    SEGMENTATION_FEATURE_BITS, SEGMENTATION_FEATURE_SIGNED, ScalingPoint, TileLayout,
    WARPEDMODEL_PREC_BITS,
};
use crate::mode::{GlobalMotionType, InterpFilter, RestorationType};
use crate::sequence::{SequenceHeader, SequenceToggle};

const GM_ABS_ALPHA_BITS: u32 = 12;
const GM_ALPHA_PREC_BITS: u32 = 15;
const GM_ABS_TRANS_ONLY_BITS: u32 = 9;
const GM_TRANS_ONLY_PREC_BITS: u32 = 3;
const GM_ABS_TRANS_BITS: u32 = 12;
const GM_TRANS_PREC_BITS: u32 = 6;
const SUBEXPFIN_K: u32 = 3;

/// Size field width for every tile but the last.
pub const TILE_SIZE_BYTES: usize = 4;

fn lr_type_code(t: RestorationType) -> u64 {
    match t {
        RestorationType::None => 0,
        RestorationType::Switchable => 1,
        RestorationType::Wiener => 2,
        RestorationType::Sgrproj => 3,
    }
}

/// Serializes a standalone frame header OBU payload, trailing bits included.
pub fn encode_frame_header(
    seq: &SequenceHeader,
    fh: &FrameHeader,
    tiles: &TileLayout,
) -> Result<Vec<u8>> {
    let mut w = BitWriter::new();
    write_frame_header(&mut w, seq, fh, tiles)?;
    Ok(w.trailing_bits())
}

/// Writes `uncompressed_header()` for `fh`. The caller byte-aligns before
/// appending tile data.
pub fn write_frame_header(
    w: &mut BitWriter,
    seq: &SequenceHeader,
    fh: &FrameHeader,
    tiles: &TileLayout,
) -> Result<()> {
    fh.validate(seq)?;
    let order_bits = seq.order_hint_bits_used();

    w.write_bit(fh.show_existing_frame);
    if fh.show_existing_frame {
        w.write_bits(fh.frame_to_show_map_idx as u64, 3);
        return Ok(());
    }

    w.write_bits(fh.frame_type as u64, 2);
    w.write_bit(fh.show_frame);
    if !fh.show_frame {
        w.write_bit(fh.showable_frame);
    }
    let key_shown = fh.frame_type == FrameType::Key && fh.show_frame;
    if !key_shown {
        w.write_bit(fh.error_resilient_mode);
    }
    w.write_bit(fh.disable_cdf_update);
    if seq.force_screen_content_tools == SequenceToggle::PerFrame {
        w.write_bit(fh.allow_screen_content_tools);
    }
    if fh.allow_screen_content_tools && seq.force_integer_mv == SequenceToggle::PerFrame {
        w.write_bit(fh.force_integer_mv);
    }
    w.write_bit(false); // frame_size_override_flag
    w.write_bits(fh.order_hint as u64, order_bits);
    if !(fh.is_intra() || fh.error_resilient_mode) {
        w.write_bits(fh.primary_ref_frame as u64, 3);
    }

    if !key_shown {
        w.write_bits(fh.refresh_frame_flags as u64, 8);
        if (!fh.is_intra() || fh.refresh_frame_flags != 0xFF)
            && fh.error_resilient_mode
            && order_bits > 0
        {
            for &hint in &fh.ref_order_hint {
                w.write_bits(hint as u64, order_bits);
            }
        }
    }

    if fh.is_intra() {
        w.write_bit(false); // render_and_frame_size_different
        if fh.allow_screen_content_tools {
            w.write_bit(fh.allow_intrabc);
        }
    } else {
        if order_bits > 0 {
            w.write_bit(false); // frame_refs_short_signaling
        }
        for &idx in &fh.ref_frame_idx {
            w.write_bits(idx as u64, 3);
        }
        w.write_bit(false); // render_and_frame_size_different
        if !fh.force_integer_mv {
            w.write_bit(fh.allow_high_precision_mv);
        }
        let switchable = fh.interpolation_filter == InterpFilter::Switchable;
        w.write_bit(switchable);
        if !switchable {
            w.write_bits(fh.interpolation_filter as u64, 2);
        }
        w.write_bit(fh.is_motion_mode_switchable);
        if !fh.error_resilient_mode && seq.enable_ref_frame_mvs {
            w.write_bit(fh.use_ref_frame_mvs);
        }
    }

    if !fh.disable_cdf_update {
        w.write_bit(fh.disable_frame_end_update_cdf);
    }

    write_tile_info(w, fh, tiles)?;
    write_quant_params(w, seq, fh);
    write_segmentation_params(w, fh);

    if fh.quant.base_q_idx > 0 {
        w.write_bit(fh.delta_q_present);
        if fh.delta_q_present {
            w.write_bits(fh.delta_q_res_log2 as u64, 2);
            if !fh.allow_intrabc {
                w.write_bit(false); // delta_lf_present
            }
        }
    }

    if !fh.allow_intrabc {
        write_loop_filter_params(w, seq, fh);
    }
    if fh.cdef_enabled(seq) {
        write_cdef_params(w, seq, fh);
    }
    if fh.restoration_enabled(seq) {
        write_lr_params(w, seq, fh);
    }

    w.write_bit(fh.tx_mode_select);
    if !fh.is_intra() {
        w.write_bit(fh.reference_select);
    }
    if fh.skip_mode_allowed {
        w.write_bit(fh.skip_mode_present);
    }
    if !fh.is_intra() && !fh.error_resilient_mode && seq.enable_warped_motion {
        w.write_bit(fh.allow_warped_motion);
    }
    w.write_bit(fh.reduced_tx_set);

    if !fh.is_intra() {
        write_global_motion_params(w, fh)?;
    }
    if seq.film_grain_params_present && (fh.show_frame || fh.showable_frame) {
        write_film_grain_params(w, seq, fh);
    }
    Ok(())
}

fn write_tile_info(w: &mut BitWriter, fh: &FrameHeader, tiles: &TileLayout) -> Result<()> {
    w.write_bit(true); // uniform_tile_spacing_flag
    for log2 in tiles.min_log2_cols..tiles.max_log2_cols {
        w.write_bit(log2 < tiles.cols_log2); // increment_tile_cols_log2
        if log2 >= tiles.cols_log2 {
            break;
        }
    }
    for log2 in tiles.min_log2_rows..tiles.max_log2_rows {
        w.write_bit(log2 < tiles.rows_log2); // increment_tile_rows_log2
        if log2 >= tiles.rows_log2 {
            break;
        }
    }

    let bits = tiles.cols_log2 + tiles.rows_log2;
    if bits > 0 {
        if fh.context_update_tile_id as usize >= tiles.num_tiles() {
            return Err(EntropyError::InvalidConfig(format!(
                "context_update_tile_id {} with {} tiles",
                fh.context_update_tile_id,
                tiles.num_tiles()
            )));
        }
        w.write_bits(fh.context_update_tile_id as u64, bits as u8);
        w.write_bits(TILE_SIZE_BYTES as u64 - 1, 2);
    }
    Ok(())
}

fn write_quant_params(w: &mut BitWriter, seq: &SequenceHeader, fh: &FrameHeader) {
    let q = &fh.quant;
    w.write_bits(q.base_q_idx as u64, 8);
    w.write_delta_q(q.delta_q_y_dc);
    if seq.num_planes() > 1 {
        let diff_uv = q.delta_q_u_dc != q.delta_q_v_dc || q.delta_q_u_ac != q.delta_q_v_ac;
        if seq.color.separate_uv_delta_q {
            w.write_bit(diff_uv);
        }
        w.write_delta_q(q.delta_q_u_dc);
        w.write_delta_q(q.delta_q_u_ac);
        if diff_uv {
            w.write_delta_q(q.delta_q_v_dc);
            w.write_delta_q(q.delta_q_v_ac);
        }
    }
    w.write_bit(q.qm.is_some()); // using_qmatrix
    if let Some(qm) = q.qm {
        w.write_bits(qm.y as u64, 4);
        w.write_bits(qm.u as u64, 4);
        if seq.color.separate_uv_delta_q {
            w.write_bits(qm.v as u64, 4);
        }
    }
}

fn write_segmentation_params(w: &mut BitWriter, fh: &FrameHeader) {
    let seg = &fh.segmentation;
    w.write_bit(seg.enabled);
    if !seg.enabled {
        return;
    }
    let update_data = if fh.primary_ref_frame == PRIMARY_REF_NONE {
        true
    } else {
        w.write_bit(seg.update_map);
        if seg.update_map {
            w.write_bit(false); // segmentation_temporal_update
        }
        w.write_bit(seg.update_data);
        seg.update_data
    };
    if !update_data {
        return;
    }
    for features in &seg.features {
        for (j, value) in features.iter().enumerate() {
            w.write_bit(value.is_some()); // feature_enabled
            let Some(v) = *value else { continue };
            let bits = SEGMENTATION_FEATURE_BITS[j];
            if SEGMENTATION_FEATURE_SIGNED[j] {
                w.write_inv_signed_literal(v as i32, bits);
            } else {
                w.write_bits(v as u64, bits);
            }
        }
    }
}

fn write_loop_filter_params(w: &mut BitWriter, seq: &SequenceHeader, fh: &FrameHeader) {
    let lf = &fh.loop_filter;
    w.write_bits(lf.level[0] as u64, 6);
    w.write_bits(lf.level[1] as u64, 6);
    if seq.num_planes() > 1 && (lf.level[0] != 0 || lf.level[1] != 0) {
        w.write_bits(lf.level[2] as u64, 6);
        w.write_bits(lf.level[3] as u64, 6);
    }
    w.write_bits(lf.sharpness as u64, 3);
    w.write_bit(lf.delta_enabled);
    if !lf.delta_enabled {
        return;
    }
    w.write_bit(lf.delta_update);
    if !lf.delta_update {
        return;
    }
    for delta in lf.ref_deltas.iter().chain(&lf.mode_deltas) {
        w.write_bit(delta.is_some()); // update_*_delta
        if let Some(d) = *delta {
            w.write_inv_signed_literal(d as i32, 6);
        }
    }
}

fn write_cdef_params(w: &mut BitWriter, seq: &SequenceHeader, fh: &FrameHeader) {
    let cdef = &fh.cdef;
    w.write_bits(cdef.damping as u64 - 3, 2);
    w.write_bits(cdef.bits as u64, 2);
    for (y, uv) in cdef.y_strengths.iter().zip(&cdef.uv_strengths) {
        w.write_bits(y.primary as u64, 4);
        w.write_bits(y.secondary as u64, 2);
        if seq.num_planes() > 1 {
            w.write_bits(uv.primary as u64, 4);
            w.write_bits(uv.secondary as u64, 2);
        }
    }
}

fn write_lr_params(w: &mut BitWriter, seq: &SequenceHeader, fh: &FrameHeader) {
    let lr = &fh.restoration;
    for &t in &lr.types[..seq.num_planes()] {
        w.write_bits(lr_type_code(t), 2);
    }
    if !lr.uses_lr() {
        return;
    }
    if seq.use_128x128_superblock {
        w.write_bit(lr.unit_shift > 1);
    } else {
        w.write_bit(lr.unit_shift > 0);
        if lr.unit_shift > 0 {
            w.write_bit(lr.unit_shift > 1); // lr_unit_extra_shift
        }
    }
    if seq.color.subsampling_x && seq.color.subsampling_y && lr.uses_chroma_lr() {
        w.write_bit(lr.uv_shift > 0);
    }
}

/// Magnitude and precision bits of global motion parameter `idx`.
fn gm_param_bits(gm_type: GlobalMotionType, idx: usize, allow_hp: bool) -> (u32, u32) {
    if idx >= 2 {
        (GM_ABS_ALPHA_BITS, GM_ALPHA_PREC_BITS)
    } else if gm_type == GlobalMotionType::Translation {
        let lowp = !allow_hp as u32;
        (GM_ABS_TRANS_ONLY_BITS - lowp, GM_TRANS_ONLY_PREC_BITS - lowp)
    } else {
        (GM_ABS_TRANS_BITS, GM_TRANS_PREC_BITS)
    }
}

fn write_global_param(
    w: &mut BitWriter,
    gm: &GlobalMotion,
    prev: &GlobalMotion,
    idx: usize,
    allow_hp: bool,
) -> Result<()> {
    let (abs_bits, prec_bits) = gm_param_bits(gm.gm_type, idx, allow_hp);
    let prec_diff = WARPEDMODEL_PREC_BITS - prec_bits;
    let (round, sub) = if idx % 3 == 2 {
        (1i32 << WARPEDMODEL_PREC_BITS, 1i32 << prec_bits)
    } else {
        (0, 0)
    };
    let mx = 1i32 << abs_bits;
    let r = (prev.params[idx] >> prec_diff) - sub;
    let v = (gm.params[idx] - round) >> prec_diff;
    if (v << prec_diff) + round != gm.params[idx] || !(-mx..=mx).contains(&v) {
        return Err(EntropyError::InvalidConfig(format!(
            "global motion parameter {idx} = {} is not representable",
            gm.params[idx]
        )));
    }
    w.write_signed_refsubexpfin(mx as u32 + 1, SUBEXPFIN_K, r, v);
    Ok(())
}

fn write_global_motion_params(w: &mut BitWriter, fh: &FrameHeader) -> Result<()> {
    for i in 0..REFS_PER_FRAME {
        let gm = &fh.global_motion[i];
        let prev = if fh.primary_ref_frame == PRIMARY_REF_NONE {
            &GlobalMotion::IDENTITY
        } else {
            &fh.prev_global_motion[i]
        };
        w.write_bit(gm.gm_type != GlobalMotionType::Identity); // is_global
        if gm.gm_type == GlobalMotionType::Identity {
            continue;
        }
        w.write_bit(gm.gm_type == GlobalMotionType::RotZoom);
        if gm.gm_type != GlobalMotionType::RotZoom {
            w.write_bit(gm.gm_type == GlobalMotionType::Translation);
        }
        if gm.gm_type >= GlobalMotionType::RotZoom {
            write_global_param(w, gm, prev, 2, fh.allow_high_precision_mv)?;
            write_global_param(w, gm, prev, 3, fh.allow_high_precision_mv)?;
            if gm.gm_type == GlobalMotionType::Affine {
                write_global_param(w, gm, prev, 4, fh.allow_high_precision_mv)?;
                write_global_param(w, gm, prev, 5, fh.allow_high_precision_mv)?;
            }
        }
        write_global_param(w, gm, prev, 0, fh.allow_high_precision_mv)?;
        write_global_param(w, gm, prev, 1, fh.allow_high_precision_mv)?;
    }
    Ok(())
}

fn write_points(w: &mut BitWriter, points: &[ScalingPoint]) {
    w.write_bits(points.len() as u64, 4);
    for p in points {
        w.write_bits(p.value as u64, 8);
        w.write_bits(p.scaling as u64, 8);
    }
}

fn write_film_grain_params(w: &mut BitWriter, seq: &SequenceHeader, fh: &FrameHeader) {
    let fg: &FilmGrainParams = &fh.film_grain;
    w.write_bit(fg.apply_grain);
    if !fg.apply_grain {
        return;
    }
    w.write_bits(fg.grain_seed as u64, 16);
    if fh.frame_type == FrameType::Inter {
        w.write_bit(fg.update_grain);
    }
    if fh.frame_type == FrameType::Inter && !fg.update_grain {
        w.write_bits(fg.film_grain_params_ref_idx as u64, 3);
        return;
    }

    write_points(w, &fg.points_y);
    w.write_bit(fg.chroma_scaling_from_luma);
    if fg.codes_chroma_points(seq.color.subsampling_x, seq.color.subsampling_y) {
        write_points(w, &fg.points_cb);
        write_points(w, &fg.points_cr);
    }
    w.write_bits(fg.grain_scaling_minus_8 as u64, 2);
    w.write_bits(fg.ar_coeff_lag as u64, 2);
    for &c in fg.ar_coeffs_y.iter().chain(&fg.ar_coeffs_cb).chain(&fg.ar_coeffs_cr) {
        w.write_bits((c + 128) as u64, 8);
    }
    w.write_bits(fg.ar_coeff_shift_minus_6 as u64, 2);
    w.write_bits(fg.grain_scale_shift as u64, 2);
    if !fg.points_cb.is_empty() {
        w.write_bits(fg.cb_mult as u64, 8);
        w.write_bits(fg.cb_luma_mult as u64, 8);
        w.write_bits(fg.cb_offset as u64, 9);
    }
    if !fg.points_cr.is_empty() {
        w.write_bits(fg.cr_mult as u64, 8);
        w.write_bits(fg.cr_luma_mult as u64, 8);
        w.write_bits(fg.cr_offset as u64, 9);
    }
    w.write_bit(fg.overlap_flag);
    w.write_bit(fg.clip_to_restricted_range);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{CdefStrength, RestorationParams};
    use crate::mode::RefFrame;
    use crate::testutil::{BitReader, read_signed_refsubexpfin};

    fn read_delta_q(r: &mut BitReader) -> i32 {
        if !r.read_bool() {
            return 0;
        }
        let v = r.read_bits(7) as i32;
        if v >= 64 { v - 128 } else { v }
    }

    #[test]
    fn key_frame_header_layout() {
        let seq = SequenceHeader::new(64, 64);
        let fh = FrameHeader::key_frame(100);
        let tiles = TileLayout::new(&seq, 0, 0);
        let bytes = encode_frame_header(&seq, &fh, &tiles).unwrap();
        let mut r = BitReader::new(&bytes);

        assert!(!r.read_bool()); // show_existing_frame
        assert_eq!(r.read_bits(2), 0); // KEY_FRAME
        assert!(r.read_bool()); // show_frame
        assert!(!r.read_bool()); // disable_cdf_update
        assert!(!r.read_bool()); // allow_screen_content_tools
        assert!(!r.read_bool()); // frame_size_override_flag
        assert!(!r.read_bool()); // render_and_frame_size_different
        assert!(!r.read_bool()); // disable_frame_end_update_cdf
        assert!(r.read_bool()); // uniform_tile_spacing_flag
        assert_eq!(r.read_bits(8), 100);
        assert_eq!(read_delta_q(&mut r), 0);
        assert_eq!(read_delta_q(&mut r), 0);
        assert_eq!(read_delta_q(&mut r), 0);
        assert!(!r.read_bool()); // using_qmatrix
        assert!(!r.read_bool()); // segmentation_enabled
        assert!(!r.read_bool()); // delta_q_present
        assert_eq!(r.read_bits(12), 0); // loop filter levels
        assert_eq!(r.read_bits(3), 0); // sharpness
        assert!(r.read_bool()); // loop_filter_delta_enabled
        assert!(!r.read_bool()); // loop_filter_delta_update
        assert!(r.read_bool()); // tx_mode_select
        assert!(!r.read_bool()); // reduced_tx_set
        assert!(r.read_bool()); // trailing one bit
        assert_eq!(bytes.len(), r.position().div_ceil(8));
    }

    #[test]
    fn show_existing_frame_is_four_bits() {
        let seq = SequenceHeader::new(64, 64);
        let mut fh = FrameHeader::key_frame(100);
        fh.show_existing_frame = true;
        fh.frame_to_show_map_idx = 5;
        let tiles = TileLayout::new(&seq, 0, 0);
        let bytes = encode_frame_header(&seq, &fh, &tiles).unwrap();
        assert_eq!(bytes, vec![0b1101_1000]);
    }

    #[test]
    fn inter_frame_writes_references_and_filter() {
        let mut seq = SequenceHeader::new(64, 64);
        seq.enable_order_hint = true;
        seq.order_hint_bits = 7;
        let mut fh = FrameHeader::inter_frame(80);
        fh.order_hint = 3;
        fh.allow_high_precision_mv = true;
        fh.interpolation_filter = InterpFilter::Sharp;
        let tiles = TileLayout::new(&seq, 0, 0);
        let bytes = encode_frame_header(&seq, &fh, &tiles).unwrap();
        let mut r = BitReader::new(&bytes);

        assert!(!r.read_bool());
        assert_eq!(r.read_bits(2), 1); // INTER_FRAME
        assert!(r.read_bool()); // show_frame
        assert!(!r.read_bool()); // error_resilient_mode
        assert!(!r.read_bool()); // disable_cdf_update
        assert!(!r.read_bool()); // allow_screen_content_tools
        assert!(!r.read_bool()); // frame_size_override_flag
        assert_eq!(r.read_bits(7), 3); // order_hint
        assert_eq!(r.read_bits(3), 0); // primary_ref_frame
        assert_eq!(r.read_bits(8), 0x01); // refresh_frame_flags
        assert!(!r.read_bool()); // frame_refs_short_signaling
        for i in 0..7 {
            assert_eq!(r.read_bits(3), i);
        }
        assert!(!r.read_bool()); // render_and_frame_size_different
        assert!(r.read_bool()); // allow_high_precision_mv
        assert!(!r.read_bool()); // is_filter_switchable
        assert_eq!(r.read_bits(2), 2); // EIGHTTAP_SHARP
        assert!(r.read_bool()); // is_motion_mode_switchable
    }

    #[test]
    fn segmentation_features_use_signed_fields() {
        let mut fh = FrameHeader::key_frame(100);
        fh.segmentation.enabled = true;
        fh.segmentation.update_map = true;
        fh.segmentation.update_data = true;
        fh.segmentation.features[0][0] = Some(-20);
        let mut w = BitWriter::new();
        write_segmentation_params(&mut w, &fh);
        let bytes = w.finalize();
        let mut r = BitReader::new(&bytes);
        assert!(r.read_bool()); // segmentation_enabled
        assert!(r.read_bool()); // feature_enabled
        let v = r.read_bits(9) as i32;
        assert_eq!(v - 512, -20);
        // remaining 63 feature flags are clear
        for _ in 0..63 {
            assert!(!r.read_bool());
        }
    }

    #[test]
    fn cdef_and_restoration_parameters() {
        let mut seq = SequenceHeader::new(64, 64);
        seq.enable_cdef = true;
        seq.enable_restoration = true;
        let mut fh = FrameHeader::key_frame(100);
        fh.cdef.damping = 5;
        fh.cdef.bits = 1;
        fh.cdef.y_strengths = vec![
            CdefStrength { primary: 3, secondary: 1 },
            CdefStrength { primary: 15, secondary: 3 },
        ];
        fh.cdef.uv_strengths = vec![CdefStrength::default(); 2];
        fh.restoration = RestorationParams {
            types: [RestorationType::Switchable, RestorationType::Wiener, RestorationType::None],
            unit_shift: 2,
            uv_shift: 1,
        };
        let mut w = BitWriter::new();
        write_cdef_params(&mut w, &seq, &fh);
        write_lr_params(&mut w, &seq, &fh);
        let bytes = w.finalize();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bits(2), 2); // damping - 3
        assert_eq!(r.read_bits(2), 1);
        assert_eq!(r.read_bits(12), (3 << 8) | (1 << 6));
        assert_eq!(r.read_bits(12), (15 << 8) | (3 << 6));
        assert_eq!(r.read_bits(2), 1); // SWITCHABLE
        assert_eq!(r.read_bits(2), 2); // WIENER
        assert_eq!(r.read_bits(2), 0);
        assert!(r.read_bool()); // lr_unit_shift
        assert!(r.read_bool()); // lr_unit_extra_shift
        assert!(r.read_bool()); // lr_uv_shift
    }

    #[test]
    fn tile_info_signals_increments_and_tile_sizes() {
        let seq = SequenceHeader::new(512, 256);
        let mut fh = FrameHeader::key_frame(100);
        fh.context_update_tile_id = 2;
        let tiles = TileLayout::new(&seq, 1, 1);
        let mut w = BitWriter::new();
        write_tile_info(&mut w, &fh, &tiles).unwrap();
        let bytes = w.finalize();
        let mut r = BitReader::new(&bytes);
        assert!(r.read_bool()); // uniform
        assert!(r.read_bool()); // cols 0 -> 1
        assert!(!r.read_bool()); // stop
        assert!(r.read_bool()); // rows 0 -> 1
        assert!(!r.read_bool()); // stop
        assert_eq!(r.read_bits(2), 2); // context_update_tile_id
        assert_eq!(r.read_bits(2), 3); // tile_size_bytes_minus_1

        fh.context_update_tile_id = 4;
        let mut w = BitWriter::new();
        assert!(write_tile_info(&mut w, &fh, &tiles).is_err());
    }

    #[test]
    fn global_motion_translation_round_trips() {
        let mut fh = FrameHeader::inter_frame(80);
        fh.allow_high_precision_mv = true;
        let shift = WARPEDMODEL_PREC_BITS - GM_TRANS_ONLY_PREC_BITS;
        fh.global_motion[0] = GlobalMotion {
            gm_type: GlobalMotionType::Translation,
            params: [-5 << shift, 17 << shift, 1 << 16, 0, 0, 1 << 16],
        };
        let mut w = BitWriter::new();
        write_global_motion_params(&mut w, &fh).unwrap();
        let bytes = w.finalize();
        let mut r = BitReader::new(&bytes);
        assert!(r.read_bool()); // is_global
        assert!(!r.read_bool()); // is_rot_zoom
        assert!(r.read_bool()); // is_translation
        let mx = 1 << GM_ABS_TRANS_ONLY_BITS;
        assert_eq!(read_signed_refsubexpfin(&mut r, mx + 1, SUBEXPFIN_K, 0), -5);
        assert_eq!(read_signed_refsubexpfin(&mut r, mx + 1, SUBEXPFIN_K, 0), 17);
        for _ in 1..REFS_PER_FRAME {
            assert!(!r.read_bool());
        }
    }

    #[test]
    fn unrepresentable_global_motion_is_rejected() {
        let mut fh = FrameHeader::inter_frame(80);
        fh.global_motion[1] = GlobalMotion {
            gm_type: GlobalMotionType::Translation,
            params: [3, 0, 1 << 16, 0, 0, 1 << 16],
        };
        let mut w = BitWriter::new();
        assert!(matches!(
            write_global_motion_params(&mut w, &fh),
            Err(EntropyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn skip_mode_flag_follows_allowed() {
        let seq = SequenceHeader::new(64, 64);
        let mut fh = FrameHeader::inter_frame(80);
        fh.reference_select = true;
        fh.skip_mode_allowed = true;
        fh.skip_mode_present = true;
        fh.skip_mode_frames = [RefFrame::Last, RefFrame::Bwd];
        let tiles = TileLayout::new(&seq, 0, 0);
        let with = encode_frame_header(&seq, &fh, &tiles).unwrap();
        fh.skip_mode_allowed = false;
        fh.skip_mode_present = false;
        let without = encode_frame_header(&seq, &fh, &tiles).unwrap();
        assert_ne!(with, without);
    }
}
