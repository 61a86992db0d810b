//! Sequence header values and their OBU payload serialization.

use crate::bitwriter::BitWriter;
use crate::error::{EntropyError, Feature, Result};
use crate::size::BlockSize;

pub const SEQ_LEVEL_IDX_MAX_PARAMETERS: u8 = 31;
pub const MAX_OPERATING_POINTS: usize = 32;

const CP_BT_709: u8 = 1;
const TC_SRGB: u8 = 13;
const MC_IDENTITY: u8 = 0;

fn bits_needed(v: u32) -> u8 {
    if v == 0 {
        1
    } else {
        32 - v.leading_zeros() as u8
    }
}

/// A sequence-level tool that is either fixed or chosen per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceToggle {
    Off,
    On,
    PerFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingPoint {
    pub idc: u16,
    pub seq_level_idx: u8,
    pub seq_tier: bool,
}

impl Default for OperatingPoint {
    fn default() -> Self {
        Self {
            idc: 0,
            seq_level_idx: SEQ_LEVEL_IDX_MAX_PARAMETERS,
            seq_tier: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDescription {
    pub color_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
}

impl ColorDescription {
    fn is_srgb(&self) -> bool {
        self.color_primaries == CP_BT_709
            && self.transfer_characteristics == TC_SRGB
            && self.matrix_coefficients == MC_IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorConfig {
    pub bit_depth: u8,
    pub mono_chrome: bool,
    pub color_description: Option<ColorDescription>,
    pub full_range: bool,
    pub subsampling_x: bool,
    pub subsampling_y: bool,
    pub chroma_sample_position: u8,
    pub separate_uv_delta_q: bool,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            bit_depth: 8,
            mono_chrome: false,
            color_description: None,
            full_range: false,
            subsampling_x: true,
            subsampling_y: true,
            chroma_sample_position: 0,
            separate_uv_delta_q: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeader {
    pub profile: u8,
    pub still_picture: bool,
    pub reduced_still_picture_header: bool,
    pub timing_info_present: bool,
    pub decoder_model_info_present: bool,
    pub operating_points: Vec<OperatingPoint>,
    pub max_frame_width: u32,
    pub max_frame_height: u32,
    pub frame_id_numbers_present: bool,
    pub use_128x128_superblock: bool,
    pub enable_filter_intra: bool,
    pub enable_intra_edge_filter: bool,
    pub enable_interintra_compound: bool,
    pub enable_masked_compound: bool,
    pub enable_warped_motion: bool,
    pub enable_dual_filter: bool,
    pub enable_order_hint: bool,
    pub enable_jnt_comp: bool,
    pub enable_ref_frame_mvs: bool,
    pub order_hint_bits: u8,
    pub force_screen_content_tools: SequenceToggle,
    pub force_integer_mv: SequenceToggle,
    pub enable_superres: bool,
    pub enable_cdef: bool,
    pub enable_restoration: bool,
    pub color: ColorConfig,
    pub film_grain_params_present: bool,
}

impl SequenceHeader {
    /// Profile 0, 8-bit 4:2:0 sequence with every optional tool switched off.
    pub fn new(max_frame_width: u32, max_frame_height: u32) -> Self {
        Self {
            profile: 0,
            still_picture: false,
            reduced_still_picture_header: false,
            timing_info_present: false,
            decoder_model_info_present: false,
            operating_points: vec![OperatingPoint::default()],
            max_frame_width,
            max_frame_height,
            frame_id_numbers_present: false,
            use_128x128_superblock: false,
            enable_filter_intra: false,
            enable_intra_edge_filter: false,
            enable_interintra_compound: false,
            enable_masked_compound: false,
            enable_warped_motion: false,
            enable_dual_filter: false,
            enable_order_hint: false,
            enable_jnt_comp: false,
            enable_ref_frame_mvs: false,
            order_hint_bits: 0,
            force_screen_content_tools: SequenceToggle::PerFrame,
            force_integer_mv: SequenceToggle::PerFrame,
            enable_superres: false,
            enable_cdef: false,
            enable_restoration: false,
            color: ColorConfig::default(),
            film_grain_params_present: false,
        }
    }

    pub fn sb_size(&self) -> BlockSize {
        if self.use_128x128_superblock {
            BlockSize::Block128x128
        } else {
            BlockSize::Block64x64
        }
    }

    pub fn ssx(&self) -> u32 {
        self.color.subsampling_x as u32
    }

    pub fn ssy(&self) -> u32 {
        self.color.subsampling_y as u32
    }

    pub fn num_planes(&self) -> usize {
        if self.color.mono_chrome { 1 } else { 3 }
    }

    pub(crate) fn order_hint_bits_used(&self) -> u8 {
        if self.enable_order_hint { self.order_hint_bits } else { 0 }
    }

    pub fn validate(&self) -> Result<()> {
        let unsupported = [
            (self.reduced_still_picture_header, Feature::ReducedStillPictureHeader),
            (self.timing_info_present, Feature::TimingInfo),
            (self.decoder_model_info_present, Feature::DecoderModelInfo),
            (self.frame_id_numbers_present, Feature::FrameIdNumbers),
            (self.enable_superres, Feature::Superres),
            (self.color.mono_chrome, Feature::Monochrome),
            (self.enable_interintra_compound, Feature::InterIntra),
            (self.enable_masked_compound, Feature::MaskedCompound),
            (self.enable_jnt_comp, Feature::JointCompound),
            (self.profile == 2 && self.color.bit_depth == 12, Feature::HighBitDepthProfile2),
        ];
        if let Some(&(_, feature)) = unsupported.iter().find(|(hit, _)| *hit) {
            return Err(EntropyError::UnsupportedFeature(feature));
        }

        let invalid = |msg: String| Err(EntropyError::InvalidConfig(msg));
        if self.profile > 2 {
            return invalid(format!("sequence profile {} out of range", self.profile));
        }
        if !matches!(self.color.bit_depth, 8 | 10) {
            return invalid(format!("bit depth {} not allowed", self.color.bit_depth));
        }
        let expected = match self.profile {
            0 => (true, true),
            1 => (false, false),
            _ => (true, false),
        };
        if (self.color.subsampling_x, self.color.subsampling_y) != expected {
            return invalid(format!(
                "profile {} requires subsampling {:?}",
                self.profile, expected
            ));
        }
        if let Some(desc) = self.color.color_description {
            if desc.is_srgb() && (self.profile != 1 || !self.color.full_range) {
                return invalid("sRGB colour needs profile 1 with full range".into());
            }
        }
        if self.color.chroma_sample_position > 3 {
            return invalid("chroma_sample_position is a 2-bit field".into());
        }
        if self.operating_points.is_empty() || self.operating_points.len() > MAX_OPERATING_POINTS {
            return invalid(format!(
                "{} operating points, expected 1..={MAX_OPERATING_POINTS}",
                self.operating_points.len()
            ));
        }
        for op in &self.operating_points {
            if op.idc >= 1 << 12 || op.seq_level_idx > SEQ_LEVEL_IDX_MAX_PARAMETERS {
                return invalid(format!("operating point {op:?} out of range"));
            }
        }
        if !(1..=1 << 16).contains(&self.max_frame_width)
            || !(1..=1 << 16).contains(&self.max_frame_height)
        {
            return invalid(format!(
                "frame size {}x{} out of range",
                self.max_frame_width, self.max_frame_height
            ));
        }
        if self.enable_order_hint && !(1..=8).contains(&self.order_hint_bits) {
            return invalid(format!("order_hint_bits {} out of range", self.order_hint_bits));
        }
        if !self.enable_order_hint && (self.enable_jnt_comp || self.enable_ref_frame_mvs) {
            return invalid("reference-frame MVs need order hints".into());
        }
        if self.force_screen_content_tools == SequenceToggle::Off
            && self.force_integer_mv != SequenceToggle::PerFrame
        {
            return invalid("integer MV is per-frame when screen content is off".into());
        }
        Ok(())
    }

    /// Serializes the sequence header OBU payload, trailing bits included.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut w = BitWriter::new();

        w.write_bits(self.profile as u64, 3); // seq_profile
        w.write_bit(self.still_picture);
        w.write_bit(false); // reduced_still_picture_header
        w.write_bit(false); // timing_info_present_flag
        w.write_bit(false); // initial_display_delay_present_flag
        w.write_bits(self.operating_points.len() as u64 - 1, 5);
        for op in &self.operating_points {
            w.write_bits(op.idc as u64, 12);
            w.write_bits(op.seq_level_idx as u64, 5);
            if op.seq_level_idx > 7 {
                w.write_bit(op.seq_tier);
            }
        }

        let width_bits = bits_needed(self.max_frame_width - 1);
        let height_bits = bits_needed(self.max_frame_height - 1);
        w.write_bits(width_bits as u64 - 1, 4);
        w.write_bits(height_bits as u64 - 1, 4);
        w.write_bits((self.max_frame_width - 1) as u64, width_bits);
        w.write_bits((self.max_frame_height - 1) as u64, height_bits);

        w.write_bit(false); // frame_id_numbers_present_flag
        w.write_bit(self.use_128x128_superblock);
        w.write_bit(self.enable_filter_intra);
        w.write_bit(self.enable_intra_edge_filter);
        w.write_bit(self.enable_interintra_compound);
        w.write_bit(self.enable_masked_compound);
        w.write_bit(self.enable_warped_motion);
        w.write_bit(self.enable_dual_filter);
        w.write_bit(self.enable_order_hint);
        if self.enable_order_hint {
            w.write_bit(self.enable_jnt_comp);
            w.write_bit(self.enable_ref_frame_mvs);
        }

        let choose_sct = self.force_screen_content_tools == SequenceToggle::PerFrame;
        w.write_bit(choose_sct); // seq_choose_screen_content_tools
        if !choose_sct {
            w.write_bit(self.force_screen_content_tools == SequenceToggle::On);
        }
        if self.force_screen_content_tools != SequenceToggle::Off {
            let choose_imv = self.force_integer_mv == SequenceToggle::PerFrame;
            w.write_bit(choose_imv); // seq_choose_integer_mv
            if !choose_imv {
                w.write_bit(self.force_integer_mv == SequenceToggle::On);
            }
        }
        if self.enable_order_hint {
            w.write_bits(self.order_hint_bits as u64 - 1, 3);
        }

        w.write_bit(self.enable_superres);
        w.write_bit(self.enable_cdef);
        w.write_bit(self.enable_restoration);
        self.write_color_config(&mut w);
        w.write_bit(self.film_grain_params_present);

        Ok(w.trailing_bits())
    }

    fn write_color_config(&self, w: &mut BitWriter) {
        let c = &self.color;
        w.write_bit(c.bit_depth > 8); // high_bitdepth
        if self.profile == 2 && c.bit_depth > 8 {
            w.write_bit(c.bit_depth == 12); // twelve_bit
        }
        if self.profile != 1 {
            w.write_bit(false); // mono_chrome
        }
        w.write_bit(c.color_description.is_some());
        if let Some(desc) = c.color_description {
            w.write_bits(desc.color_primaries as u64, 8);
            w.write_bits(desc.transfer_characteristics as u64, 8);
            w.write_bits(desc.matrix_coefficients as u64, 8);
            if desc.is_srgb() {
                w.write_bit(c.separate_uv_delta_q);
                return;
            }
        }
        w.write_bit(c.full_range);
        if c.subsampling_x && c.subsampling_y {
            w.write_bits(c.chroma_sample_position as u64, 2);
        }
        w.write_bit(c.separate_uv_delta_q);
    }
}
