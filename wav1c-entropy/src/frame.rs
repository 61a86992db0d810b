//! Frame-level coding parameters, their validation and the tile geometry
//! they imply.

use crate::error::{EntropyError, Feature, Result};
use crate::mode::{GlobalMotionType, InterpFilter, MvPrecision, RefFrame, RestorationType};
use crate::sequence::{SequenceHeader, SequenceToggle};

pub const PRIMARY_REF_NONE: u8 = 7;
pub const MAX_SEGMENTS: usize = 8;
pub const SEG_LVL_MAX: usize = 8;
pub const SEG_LVL_ALT_Q: usize = 0;
pub const SEG_LVL_REF_FRAME: usize = 5;
pub const REFS_PER_FRAME: usize = 7;
pub const WARPEDMODEL_PREC_BITS: u32 = 16;

pub const SEGMENTATION_FEATURE_BITS: [u8; SEG_LVL_MAX] = [8, 6, 6, 6, 6, 3, 0, 0];
pub const SEGMENTATION_FEATURE_SIGNED: [bool; SEG_LVL_MAX] =
    [true, true, true, true, true, false, false, false];
pub const SEGMENTATION_FEATURE_MAX: [i16; SEG_LVL_MAX] = [255, 63, 63, 63, 63, 7, 0, 0];

const MAX_TILE_COLS: u32 = 64;
const MAX_TILE_ROWS: u32 = 64;
const MAX_TILE_WIDTH: u32 = 4096;
const MAX_TILE_AREA: u32 = 4096 * 2304;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameType {
    #[default]
    Key = 0,
    Inter,
    IntraOnly,
    Switch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    Only4x4,
    Largest,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizerMatrix {
    pub y: u8,
    pub u: u8,
    pub v: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantizationParams {
    pub base_q_idx: u8,
    pub delta_q_y_dc: i8,
    pub delta_q_u_dc: i8,
    pub delta_q_u_ac: i8,
    pub delta_q_v_dc: i8,
    pub delta_q_v_ac: i8,
    pub qm: Option<QuantizerMatrix>,
}

impl QuantizationParams {
    fn deltas_zero(&self) -> bool {
        [
            self.delta_q_y_dc,
            self.delta_q_u_dc,
            self.delta_q_u_ac,
            self.delta_q_v_dc,
            self.delta_q_v_ac,
        ]
        .iter()
        .all(|&d| d == 0)
    }
}

/// Segmentation parameters. `features[segment][feature]` is `Some(value)`
/// when the feature is enabled for the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentationParams {
    pub enabled: bool,
    pub update_map: bool,
    pub temporal_update: bool,
    pub update_data: bool,
    pub features: [[Option<i16>; SEG_LVL_MAX]; MAX_SEGMENTS],
}

impl SegmentationParams {
    pub fn feature(&self, segment_id: u8, feature: usize) -> Option<i16> {
        if !self.enabled {
            return None;
        }
        self.features
            .get(segment_id as usize)
            .and_then(|f| f[feature])
    }

    /// Highest segment id with any enabled feature.
    pub fn last_active_segment_id(&self) -> u8 {
        if !self.enabled {
            return 0;
        }
        self.features
            .iter()
            .rposition(|f| f.iter().any(Option::is_some))
            .unwrap_or(0) as u8
    }

    /// Segment ids are coded before the skip flag when a reference feature is on.
    pub fn seg_id_pre_skip(&self) -> bool {
        self.enabled
            && self
                .features
                .iter()
                .any(|f| f[SEG_LVL_REF_FRAME..].iter().any(Option::is_some))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFilterParams {
    pub level: [u8; 4],
    pub sharpness: u8,
    pub delta_enabled: bool,
    pub delta_update: bool,
    pub ref_deltas: [Option<i8>; 8],
    pub mode_deltas: [Option<i8>; 2],
}

impl Default for LoopFilterParams {
    fn default() -> Self {
        Self {
            level: [0; 4],
            sharpness: 0,
            delta_enabled: true,
            delta_update: false,
            ref_deltas: [None; 8],
            mode_deltas: [None; 2],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CdefStrength {
    pub primary: u8,
    pub secondary: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdefParams {
    pub damping: u8,
    pub bits: u8,
    pub y_strengths: Vec<CdefStrength>,
    pub uv_strengths: Vec<CdefStrength>,
}

impl Default for CdefParams {
    fn default() -> Self {
        Self {
            damping: 3,
            bits: 0,
            y_strengths: vec![CdefStrength::default()],
            uv_strengths: vec![CdefStrength::default()],
        }
    }
}

/// Frame restoration types per plane and the unit size shifts.
/// Luma units are `64 << unit_shift` samples, chroma units `>> uv_shift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestorationParams {
    pub types: [RestorationType; 3],
    pub unit_shift: u8,
    pub uv_shift: u8,
}

impl RestorationParams {
    pub fn uses_lr(&self) -> bool {
        self.types.iter().any(|&t| t != RestorationType::None)
    }

    pub fn uses_chroma_lr(&self) -> bool {
        self.types[1..].iter().any(|&t| t != RestorationType::None)
    }

    pub fn unit_size(&self, plane: usize) -> u32 {
        let luma = 64u32 << self.unit_shift;
        if plane == 0 { luma } else { luma >> self.uv_shift }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalMotion {
    pub gm_type: GlobalMotionType,
    pub params: [i32; 6],
}

impl GlobalMotion {
    pub const IDENTITY: GlobalMotion = GlobalMotion {
        gm_type: GlobalMotionType::Identity,
        params: [0, 0, 1 << WARPEDMODEL_PREC_BITS, 0, 0, 1 << WARPEDMODEL_PREC_BITS],
    };
}

impl Default for GlobalMotion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScalingPoint {
    pub value: u8,
    pub scaling: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilmGrainParams {
    pub apply_grain: bool,
    pub grain_seed: u16,
    pub update_grain: bool,
    pub film_grain_params_ref_idx: u8,
    pub points_y: Vec<ScalingPoint>,
    pub chroma_scaling_from_luma: bool,
    pub points_cb: Vec<ScalingPoint>,
    pub points_cr: Vec<ScalingPoint>,
    pub grain_scaling_minus_8: u8,
    pub ar_coeff_lag: u8,
    pub ar_coeffs_y: Vec<i16>,
    pub ar_coeffs_cb: Vec<i16>,
    pub ar_coeffs_cr: Vec<i16>,
    pub ar_coeff_shift_minus_6: u8,
    pub grain_scale_shift: u8,
    pub cb_mult: u8,
    pub cb_luma_mult: u8,
    pub cb_offset: u16,
    pub cr_mult: u8,
    pub cr_luma_mult: u8,
    pub cr_offset: u16,
    pub overlap_flag: bool,
    pub clip_to_restricted_range: bool,
}

impl FilmGrainParams {
    pub(crate) fn num_pos_luma(&self) -> usize {
        let lag = self.ar_coeff_lag as usize;
        2 * lag * (lag + 1)
    }

    pub(crate) fn num_pos_chroma(&self) -> usize {
        self.num_pos_luma() + !self.points_y.is_empty() as usize
    }

    /// Whether chroma points are coded, given the sequence subsampling.
    pub(crate) fn codes_chroma_points(&self, ssx: bool, ssy: bool) -> bool {
        !(self.chroma_scaling_from_luma || (ssx && ssy && self.points_y.is_empty()))
    }

    fn validate(&self, ssx: bool, ssy: bool) -> Result<()> {
        let invalid = |msg: &str| Err(EntropyError::InvalidConfig(format!("film grain: {msg}")));
        if !self.apply_grain || !self.update_grain {
            if self.film_grain_params_ref_idx > 7 {
                return invalid("reference index out of range");
            }
            return Ok(());
        }
        let increasing = |pts: &[ScalingPoint]| pts.windows(2).all(|p| p[0].value < p[1].value);
        if self.points_y.len() > 14 || !increasing(&self.points_y) {
            return invalid("luma points");
        }
        if self.codes_chroma_points(ssx, ssy) {
            for pts in [&self.points_cb, &self.points_cr] {
                if pts.len() > 10 || !increasing(pts) {
                    return invalid("chroma points");
                }
            }
            if ssx && ssy && (self.points_cb.is_empty() != self.points_cr.is_empty()) {
                return invalid("4:2:0 needs both or neither chroma point sets");
            }
        } else if !self.points_cb.is_empty() || !self.points_cr.is_empty() {
            return invalid("chroma points are not coded for this configuration");
        }
        if self.grain_scaling_minus_8 > 3
            || self.ar_coeff_lag > 3
            || self.ar_coeff_shift_minus_6 > 3
            || self.grain_scale_shift > 3
        {
            return invalid("2-bit field out of range");
        }
        if self.cb_offset >= 512 || self.cr_offset >= 512 {
            return invalid("offset is a 9-bit field");
        }
        let coeffs_ok = |c: &[i16], n: usize| c.len() == n && c.iter().all(|&v| (-128..=127).contains(&v));
        let want_y = if self.points_y.is_empty() { 0 } else { self.num_pos_luma() };
        if !coeffs_ok(&self.ar_coeffs_y, want_y) {
            return invalid("luma AR coefficients");
        }
        let want_cb = if self.chroma_scaling_from_luma || !self.points_cb.is_empty() {
            self.num_pos_chroma()
        } else {
            0
        };
        let want_cr = if self.chroma_scaling_from_luma || !self.points_cr.is_empty() {
            self.num_pos_chroma()
        } else {
            0
        };
        if !coeffs_ok(&self.ar_coeffs_cb, want_cb) || !coeffs_ok(&self.ar_coeffs_cr, want_cr) {
            return invalid("chroma AR coefficients");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub show_existing_frame: bool,
    pub frame_to_show_map_idx: u8,
    pub frame_type: FrameType,
    pub show_frame: bool,
    pub showable_frame: bool,
    pub error_resilient_mode: bool,
    pub disable_cdf_update: bool,
    pub allow_screen_content_tools: bool,
    pub force_integer_mv: bool,
    pub frame_size_override: bool,
    pub order_hint: u32,
    pub primary_ref_frame: u8,
    pub refresh_frame_flags: u8,
    pub ref_order_hint: [u32; 8],
    pub allow_intrabc: bool,
    pub ref_frame_idx: [u8; REFS_PER_FRAME],
    pub allow_high_precision_mv: bool,
    pub interpolation_filter: InterpFilter,
    pub is_motion_mode_switchable: bool,
    pub use_ref_frame_mvs: bool,
    pub disable_frame_end_update_cdf: bool,
    pub uniform_tile_spacing: bool,
    pub context_update_tile_id: u32,
    pub quant: QuantizationParams,
    pub segmentation: SegmentationParams,
    pub delta_q_present: bool,
    pub delta_q_res_log2: u8,
    pub delta_lf_present: bool,
    pub loop_filter: LoopFilterParams,
    pub cdef: CdefParams,
    pub restoration: RestorationParams,
    pub tx_mode_select: bool,
    pub reference_select: bool,
    pub skip_mode_allowed: bool,
    pub skip_mode_present: bool,
    pub skip_mode_frames: [RefFrame; 2],
    pub allow_warped_motion: bool,
    pub reduced_tx_set: bool,
    pub global_motion: [GlobalMotion; REFS_PER_FRAME],
    pub prev_global_motion: [GlobalMotion; REFS_PER_FRAME],
    pub film_grain: FilmGrainParams,
}

impl FrameHeader {
    /// A shown key frame at `base_q_idx` with every optional tool off.
    pub fn key_frame(base_q_idx: u8) -> Self {
        Self {
            show_existing_frame: false,
            frame_to_show_map_idx: 0,
            frame_type: FrameType::Key,
            show_frame: true,
            showable_frame: false,
            error_resilient_mode: true,
            disable_cdf_update: false,
            allow_screen_content_tools: false,
            force_integer_mv: true,
            frame_size_override: false,
            order_hint: 0,
            primary_ref_frame: PRIMARY_REF_NONE,
            refresh_frame_flags: 0xFF,
            ref_order_hint: [0; 8],
            allow_intrabc: false,
            ref_frame_idx: [0; REFS_PER_FRAME],
            allow_high_precision_mv: false,
            interpolation_filter: InterpFilter::Regular,
            is_motion_mode_switchable: false,
            use_ref_frame_mvs: false,
            disable_frame_end_update_cdf: false,
            uniform_tile_spacing: true,
            context_update_tile_id: 0,
            quant: QuantizationParams {
                base_q_idx,
                ..Default::default()
            },
            segmentation: SegmentationParams::default(),
            delta_q_present: false,
            delta_q_res_log2: 0,
            delta_lf_present: false,
            loop_filter: LoopFilterParams::default(),
            cdef: CdefParams::default(),
            restoration: RestorationParams::default(),
            tx_mode_select: true,
            reference_select: false,
            skip_mode_allowed: false,
            skip_mode_present: false,
            skip_mode_frames: [RefFrame::Intra; 2],
            allow_warped_motion: false,
            reduced_tx_set: false,
            global_motion: [GlobalMotion::IDENTITY; REFS_PER_FRAME],
            prev_global_motion: [GlobalMotion::IDENTITY; REFS_PER_FRAME],
            film_grain: FilmGrainParams::default(),
        }
    }

    /// A shown inter frame predicting from slots 0..7 with the previous
    /// frame's contexts in slot 0.
    pub fn inter_frame(base_q_idx: u8) -> Self {
        Self {
            frame_type: FrameType::Inter,
            error_resilient_mode: false,
            force_integer_mv: false,
            primary_ref_frame: 0,
            refresh_frame_flags: 0x01,
            ref_frame_idx: [0, 1, 2, 3, 4, 5, 6],
            interpolation_filter: InterpFilter::Switchable,
            is_motion_mode_switchable: true,
            ..Self::key_frame(base_q_idx)
        }
    }

    pub fn is_intra(&self) -> bool {
        matches!(self.frame_type, FrameType::Key | FrameType::IntraOnly)
    }

    pub fn mv_precision(&self) -> MvPrecision {
        if self.force_integer_mv {
            MvPrecision::Integer
        } else if self.allow_high_precision_mv {
            MvPrecision::High
        } else {
            MvPrecision::Low
        }
    }

    /// Quantizer index of a segment before any block-level delta.
    pub fn segment_qindex(&self, segment_id: u8) -> u8 {
        let base = self.quant.base_q_idx as i32;
        match self.segmentation.feature(segment_id, SEG_LVL_ALT_Q) {
            Some(delta) => (base + delta as i32).clamp(0, 255) as u8,
            None => base as u8,
        }
    }

    pub fn is_lossless(&self, segment_id: u8) -> bool {
        self.segment_qindex(segment_id) == 0 && self.quant.deltas_zero()
    }

    pub fn coded_lossless(&self) -> bool {
        let segments = if self.segmentation.enabled { MAX_SEGMENTS as u8 } else { 1 };
        (0..segments).all(|s| self.is_lossless(s))
    }

    pub fn tx_mode(&self) -> TxMode {
        if self.coded_lossless() {
            TxMode::Only4x4
        } else if self.tx_mode_select {
            TxMode::Select
        } else {
            TxMode::Largest
        }
    }

    pub fn cdef_enabled(&self, seq: &SequenceHeader) -> bool {
        seq.enable_cdef && !self.coded_lossless() && !self.allow_intrabc
    }

    pub fn restoration_enabled(&self, seq: &SequenceHeader) -> bool {
        seq.enable_restoration && !self.coded_lossless() && !self.allow_intrabc
    }

    pub fn effective_restoration(&self, seq: &SequenceHeader) -> RestorationParams {
        if self.restoration_enabled(seq) {
            self.restoration
        } else {
            RestorationParams::default()
        }
    }

    pub fn gm_type(&self, r: RefFrame) -> GlobalMotionType {
        r.inter_index()
            .map(|i| self.global_motion[i].gm_type)
            .unwrap_or_default()
    }

    pub fn validate(&self, seq: &SequenceHeader) -> Result<()> {
        let invalid = |msg: String| Err(EntropyError::InvalidConfig(msg));
        if self.show_existing_frame {
            if self.frame_to_show_map_idx > 7 {
                return invalid("frame_to_show_map_idx is a 3-bit field".into());
            }
            return Ok(());
        }
        if self.frame_size_override || self.frame_type == FrameType::Switch {
            return Err(EntropyError::UnsupportedFeature(Feature::FrameSizeOverride));
        }
        if !self.uniform_tile_spacing {
            return Err(EntropyError::UnsupportedFeature(Feature::NonUniformTileSpacing));
        }
        if self.delta_lf_present {
            return Err(EntropyError::UnsupportedFeature(Feature::DeltaLoopFilter));
        }
        if self.segmentation.enabled && self.segmentation.temporal_update {
            return Err(EntropyError::UnsupportedFeature(
                Feature::TemporalSegmentationUpdate,
            ));
        }
        if self.segmentation.seg_id_pre_skip() {
            return Err(EntropyError::UnsupportedFeature(Feature::SegmentReferenceFeatures));
        }
        if self.coded_lossless() {
            return Err(EntropyError::UnsupportedFeature(Feature::AllLossless));
        }

        let key_shown = self.frame_type == FrameType::Key && self.show_frame;
        if key_shown && !self.error_resilient_mode {
            return invalid("shown key frames are error resilient".into());
        }
        if key_shown && self.refresh_frame_flags != 0xFF {
            return invalid("shown key frames refresh every slot".into());
        }
        if self.frame_type == FrameType::IntraOnly && self.refresh_frame_flags == 0xFF {
            return invalid("intra-only frames cannot refresh every slot".into());
        }
        if self.show_frame && self.showable_frame {
            return invalid("showable_frame is only coded for hidden frames".into());
        }
        let sct = match seq.force_screen_content_tools {
            SequenceToggle::PerFrame => self.allow_screen_content_tools,
            t => t == SequenceToggle::On,
        };
        if sct != self.allow_screen_content_tools {
            return invalid("allow_screen_content_tools fixed by the sequence".into());
        }
        let imv = if self.is_intra() {
            true
        } else if !sct {
            false
        } else {
            match seq.force_integer_mv {
                SequenceToggle::PerFrame => self.force_integer_mv,
                t => t == SequenceToggle::On,
            }
        };
        if imv != self.force_integer_mv {
            return invalid(format!("force_integer_mv must be {imv} for this frame"));
        }
        let order_bits = seq.order_hint_bits_used() as u32;
        if self.order_hint >= 1 << order_bits {
            return invalid(format!("order_hint {} exceeds {order_bits} bits", self.order_hint));
        }
        if (self.is_intra() || self.error_resilient_mode) && self.primary_ref_frame != PRIMARY_REF_NONE {
            return invalid("primary_ref_frame must be none".into());
        }
        if self.primary_ref_frame > PRIMARY_REF_NONE {
            return invalid("primary_ref_frame is a 3-bit field".into());
        }
        if self.allow_intrabc && !(self.is_intra() && sct) {
            return invalid("intrabc needs an intra frame with screen content tools".into());
        }
        if !self.is_intra() {
            if self.ref_frame_idx.iter().any(|&i| i > 7) {
                return invalid("ref_frame_idx is a 3-bit field".into());
            }
            if self.use_ref_frame_mvs && (self.error_resilient_mode || !seq.enable_ref_frame_mvs) {
                return invalid("use_ref_frame_mvs not available".into());
            }
        } else if self.reference_select || self.skip_mode_present || self.allow_warped_motion {
            return invalid("intra frames have no reference tools".into());
        }
        if self.allow_warped_motion && (self.error_resilient_mode || !seq.enable_warped_motion) {
            return invalid("warped motion not available".into());
        }
        if self.skip_mode_present && !self.skip_mode_allowed {
            return invalid("skip mode present without an allowed pair".into());
        }
        if self.skip_mode_present
            && !(self.skip_mode_frames[0].is_inter() && self.skip_mode_frames[1].is_inter())
        {
            return invalid("skip mode needs two inter references".into());
        }

        self.validate_quant(seq)?;
        self.validate_segmentation()?;
        if self.delta_q_present && (self.quant.base_q_idx == 0 || self.delta_q_res_log2 > 3) {
            return invalid("delta q needs base_q_idx > 0 and res <= 3".into());
        }
        self.validate_loop_filter()?;
        if self.cdef_enabled(seq) {
            let c = &self.cdef;
            let n = 1usize << c.bits.min(3);
            let strengths_ok = |s: &[CdefStrength]| {
                s.len() == n && s.iter().all(|s| s.primary < 16 && s.secondary < 4)
            };
            if !(3..=6).contains(&c.damping)
                || c.bits > 3
                || !strengths_ok(&c.y_strengths)
                || !strengths_ok(&c.uv_strengths)
            {
                return invalid("cdef parameters out of range".into());
            }
        }
        if self.restoration_enabled(seq) {
            let lr = &self.restoration;
            let min_shift = seq.use_128x128_superblock as u8;
            if lr.uses_lr() && !(min_shift..=2).contains(&lr.unit_shift) {
                return invalid("restoration unit smaller than the superblock".into());
            }
            let uv_allowed = lr.uses_lr() && lr.uses_chroma_lr() && seq.ssx() == 1 && seq.ssy() == 1;
            if lr.uv_shift > uv_allowed as u8 {
                return invalid("lr_uv_shift not coded here".into());
            }
        }
        if !self.is_intra() {
            self.validate_global_motion()?;
        }
        if seq.film_grain_params_present && (self.show_frame || self.showable_frame) {
            let fg = &self.film_grain;
            if fg.apply_grain && !fg.update_grain && self.frame_type != FrameType::Inter {
                return invalid("film grain parameters are always updated on intra frames".into());
            }
            self.film_grain
                .validate(seq.color.subsampling_x, seq.color.subsampling_y)?;
        }
        Ok(())
    }

    fn validate_quant(&self, seq: &SequenceHeader) -> Result<()> {
        let q = &self.quant;
        let in_range = |d: i8| (-64..=63).contains(&d);
        if ![q.delta_q_y_dc, q.delta_q_u_dc, q.delta_q_u_ac, q.delta_q_v_dc, q.delta_q_v_ac]
            .iter()
            .all(|&d| in_range(d))
        {
            return Err(EntropyError::InvalidConfig("quantizer delta out of range".into()));
        }
        let diff_uv = q.delta_q_u_dc != q.delta_q_v_dc || q.delta_q_u_ac != q.delta_q_v_ac;
        if diff_uv && !seq.color.separate_uv_delta_q {
            return Err(EntropyError::InvalidConfig(
                "separate U and V deltas need separate_uv_delta_q".into(),
            ));
        }
        if let Some(qm) = q.qm {
            let shared_v = !seq.color.separate_uv_delta_q && qm.v != qm.u;
            if qm.y > 15 || qm.u > 15 || qm.v > 15 || shared_v {
                return Err(EntropyError::InvalidConfig("quantizer matrix levels".into()));
            }
        }
        Ok(())
    }

    fn validate_segmentation(&self) -> Result<()> {
        let seg = &self.segmentation;
        if !seg.enabled {
            return Ok(());
        }
        if self.primary_ref_frame == PRIMARY_REF_NONE && !(seg.update_map && seg.update_data) {
            return Err(EntropyError::InvalidConfig(
                "segmentation without a primary reference must update map and data".into(),
            ));
        }
        for features in &seg.features {
            for (j, value) in features.iter().enumerate() {
                if let Some(v) = *value {
                    let max = SEGMENTATION_FEATURE_MAX[j];
                    let min = if SEGMENTATION_FEATURE_SIGNED[j] { -max } else { 0 };
                    if !(min..=max).contains(&v) {
                        return Err(EntropyError::InvalidConfig(format!(
                            "segmentation feature {j} value {v} outside {min}..={max}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_loop_filter(&self) -> Result<()> {
        let lf = &self.loop_filter;
        let delta_ok = |d: &Option<i8>| d.is_none_or(|v| (-64..=63).contains(&v));
        if lf.level.iter().any(|&l| l > 63)
            || lf.sharpness > 7
            || !lf.ref_deltas.iter().all(delta_ok)
            || !lf.mode_deltas.iter().all(delta_ok)
        {
            return Err(EntropyError::InvalidConfig("loop filter parameters out of range".into()));
        }
        Ok(())
    }

    fn validate_global_motion(&self) -> Result<()> {
        for (i, gm) in self.global_motion.iter().enumerate() {
            let p = &gm.params;
            let fail = |msg: &str| {
                Err(EntropyError::InvalidConfig(format!("global motion ref {}: {msg}", i + 1)))
            };
            if gm.gm_type == GlobalMotionType::Identity {
                if *gm != GlobalMotion::IDENTITY {
                    return fail("identity parameters expected");
                }
                continue;
            }
            if gm.gm_type == GlobalMotionType::RotZoom && (p[4] != -p[3] || p[5] != p[2]) {
                return fail("rotzoom matrix must be a similarity");
            }
            if gm.gm_type == GlobalMotionType::Translation
                && p[2..] != GlobalMotion::IDENTITY.params[2..]
            {
                return fail("translation keeps the identity matrix");
            }
        }
        Ok(())
    }
}

fn tile_log2(blk_size: u32, target: u32) -> u32 {
    let mut k = 0;
    while (blk_size << k) < target {
        k += 1;
    }
    k
}

/// Position of one tile in 4x4 units, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBounds {
    pub mi_row_start: u32,
    pub mi_row_end: u32,
    pub mi_col_start: u32,
    pub mi_col_end: u32,
}

/// Uniformly spaced tile grid for a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayout {
    pub mi_cols: u32,
    pub mi_rows: u32,
    pub sb_shift: u32,
    pub cols_log2: u32,
    pub rows_log2: u32,
    pub min_log2_cols: u32,
    pub max_log2_cols: u32,
    pub min_log2_rows: u32,
    pub max_log2_rows: u32,
    pub col_starts: Vec<u32>,
    pub row_starts: Vec<u32>,
}

impl TileLayout {
    /// Grid for `seq`'s frame size, clamping the requested log2 counts to
    /// the legal range.
    pub fn new(seq: &SequenceHeader, cols_log2: u32, rows_log2: u32) -> Self {
        let mi_cols = 2 * ((seq.max_frame_width + 7) >> 3);
        let mi_rows = 2 * ((seq.max_frame_height + 7) >> 3);
        let sb_shift = if seq.use_128x128_superblock { 5 } else { 4 };
        let sb_size_log2 = sb_shift + 2;
        let sb_cols = (mi_cols + (1 << sb_shift) - 1) >> sb_shift;
        let sb_rows = (mi_rows + (1 << sb_shift) - 1) >> sb_shift;

        let max_tile_width_sb = MAX_TILE_WIDTH >> sb_size_log2;
        let max_tile_area_sb = MAX_TILE_AREA >> (2 * sb_size_log2);
        let min_log2_cols = tile_log2(max_tile_width_sb, sb_cols);
        let max_log2_cols = tile_log2(1, sb_cols.min(MAX_TILE_COLS));
        let max_log2_rows = tile_log2(1, sb_rows.min(MAX_TILE_ROWS));
        let min_log2_tiles = min_log2_cols.max(tile_log2(max_tile_area_sb, sb_rows * sb_cols));

        let clamped_cols = cols_log2.clamp(min_log2_cols, max_log2_cols);
        if clamped_cols != cols_log2 {
            tracing::warn!(
                requested = cols_log2,
                used = clamped_cols,
                "tile column count clamped"
            );
        }
        let min_log2_rows = min_log2_tiles.saturating_sub(clamped_cols);
        let clamped_rows = rows_log2.clamp(min_log2_rows, max_log2_rows.max(min_log2_rows));
        if clamped_rows != rows_log2 {
            tracing::warn!(
                requested = rows_log2,
                used = clamped_rows,
                "tile row count clamped"
            );
        }

        let starts = |sb_count: u32, log2: u32, mi_end: u32| {
            let size_sb = (sb_count + (1 << log2) - 1) >> log2;
            let mut v: Vec<u32> = (0..sb_count)
                .step_by(size_sb.max(1) as usize)
                .map(|sb| sb << sb_shift)
                .collect();
            v.push(mi_end);
            v
        };

        Self {
            mi_cols,
            mi_rows,
            sb_shift,
            cols_log2: clamped_cols,
            rows_log2: clamped_rows,
            min_log2_cols,
            max_log2_cols,
            min_log2_rows,
            max_log2_rows,
            col_starts: starts(sb_cols, clamped_cols, mi_cols),
            row_starts: starts(sb_rows, clamped_rows, mi_rows),
        }
    }

    pub fn tile_cols(&self) -> usize {
        self.col_starts.len() - 1
    }

    pub fn tile_rows(&self) -> usize {
        self.row_starts.len() - 1
    }

    pub fn num_tiles(&self) -> usize {
        self.tile_cols() * self.tile_rows()
    }

    /// Bounds of tile `idx` in raster order.
    pub fn tile(&self, idx: usize) -> TileBounds {
        let (row, col) = (idx / self.tile_cols(), idx % self.tile_cols());
        TileBounds {
            mi_row_start: self.row_starts[row],
            mi_row_end: self.row_starts[row + 1],
            mi_col_start: self.col_starts[col],
            mi_col_end: self.col_starts[col + 1],
        }
    }

    /// Superblock rows across the whole frame.
    pub fn sb_rows(&self) -> u32 {
        (self.mi_rows + (1 << self.sb_shift) - 1) >> self.sb_shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_log2_basic() {
        assert_eq!(tile_log2(64, 1), 0);
        assert_eq!(tile_log2(64, 64), 0);
        assert_eq!(tile_log2(64, 65), 1);
        assert_eq!(tile_log2(1, 2), 1);
        assert_eq!(tile_log2(1, 64), 6);
    }

    #[test]
    fn single_tile_for_small_frames() {
        let seq = SequenceHeader::new(320, 240);
        let layout = TileLayout::new(&seq, 0, 0);
        assert_eq!(layout.num_tiles(), 1);
        assert_eq!(layout.mi_cols, 80);
        assert_eq!(layout.mi_rows, 60);
        assert_eq!(
            layout.tile(0),
            TileBounds {
                mi_row_start: 0,
                mi_row_end: 60,
                mi_col_start: 0,
                mi_col_end: 80
            }
        );
    }

    #[test]
    fn uniform_two_by_two_grid() {
        let seq = SequenceHeader::new(256, 256);
        let layout = TileLayout::new(&seq, 1, 1);
        assert_eq!(layout.tile_cols(), 2);
        assert_eq!(layout.tile_rows(), 2);
        assert_eq!(layout.col_starts, vec![0, 32, 64]);
        assert_eq!(layout.tile(3).mi_row_start, 32);
    }

    #[test]
    fn uneven_superblock_count_gives_fewer_tiles() {
        // 5 superblock columns split by 4: widths of 2 leave 3 tiles
        let seq = SequenceHeader::new(320, 64);
        let layout = TileLayout::new(&seq, 2, 0);
        assert_eq!(layout.cols_log2, 2);
        assert_eq!(layout.tile_cols(), 3);
        assert_eq!(layout.col_starts, vec![0, 32, 64, 80]);
    }

    #[test]
    fn requested_tiling_is_clamped() {
        let seq = SequenceHeader::new(64, 64);
        let layout = TileLayout::new(&seq, 3, 3);
        assert_eq!(layout.cols_log2, 0);
        assert_eq!(layout.rows_log2, 0);

        let wide = SequenceHeader::new(8192, 64);
        let layout = TileLayout::new(&wide, 0, 0);
        assert_eq!(layout.min_log2_cols, 1);
        assert_eq!(layout.cols_log2, 1);
    }

    #[test]
    fn segment_qindex_applies_alt_q() {
        let mut fh = FrameHeader::key_frame(100);
        fh.segmentation.enabled = true;
        fh.segmentation.update_map = true;
        fh.segmentation.update_data = true;
        fh.segmentation.features[1][SEG_LVL_ALT_Q] = Some(-100);
        fh.segmentation.features[2][SEG_LVL_ALT_Q] = Some(200);
        assert_eq!(fh.segment_qindex(0), 100);
        assert_eq!(fh.segment_qindex(1), 0);
        assert_eq!(fh.segment_qindex(2), 255);
        assert!(fh.is_lossless(1));
        assert!(!fh.coded_lossless());
        assert_eq!(fh.segmentation.last_active_segment_id(), 2);
    }

    #[test]
    fn key_frame_defaults_validate() {
        let seq = SequenceHeader::new(64, 64);
        assert!(FrameHeader::key_frame(60).validate(&seq).is_ok());
        assert!(FrameHeader::inter_frame(60).validate(&seq).is_ok());
    }

    #[test]
    fn rejects_unsupported_frame_tools() {
        let seq = SequenceHeader::new(64, 64);
        let mut fh = FrameHeader::key_frame(60);
        fh.delta_lf_present = true;
        assert!(matches!(
            fh.validate(&seq),
            Err(EntropyError::UnsupportedFeature(Feature::DeltaLoopFilter))
        ));

        let fh = FrameHeader::key_frame(0);
        assert!(matches!(
            fh.validate(&seq),
            Err(EntropyError::UnsupportedFeature(Feature::AllLossless))
        ));

        let mut fh = FrameHeader::key_frame(60);
        fh.segmentation.enabled = true;
        fh.segmentation.update_map = true;
        fh.segmentation.update_data = true;
        fh.segmentation.features[0][6] = Some(0);
        assert!(matches!(
            fh.validate(&seq),
            Err(EntropyError::UnsupportedFeature(Feature::SegmentReferenceFeatures))
        ));
    }

    #[test]
    fn key_frames_must_be_error_resilient() {
        let seq = SequenceHeader::new(64, 64);
        let mut fh = FrameHeader::key_frame(60);
        fh.error_resilient_mode = false;
        assert!(matches!(fh.validate(&seq), Err(EntropyError::InvalidConfig(_))));
    }

    #[test]
    fn restoration_unit_sizes() {
        let lr = RestorationParams {
            types: [RestorationType::Wiener, RestorationType::Sgrproj, RestorationType::None],
            unit_shift: 1,
            uv_shift: 1,
        };
        assert_eq!(lr.unit_size(0), 128);
        assert_eq!(lr.unit_size(1), 64);
        assert!(lr.uses_chroma_lr());
    }
}
