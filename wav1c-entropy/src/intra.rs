//! Intra prediction mode syntax.

use crate::block::IntraInfo;
use crate::cdf::CdfContext;
use crate::error::{BlockLocation, EntropyError, Feature, Result, SyntaxElement};
use crate::mode::{CflAlpha, IntraMode, UvMode};
use crate::msac::MsacEncoder;
use crate::size::BlockSize;

pub const MAX_ANGLE_DELTA: i8 = 3;
const CFL_ALPHA_MAX: u8 = 16;

/// Which intra tools apply to the block being coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntraParams {
    pub bsize: BlockSize,
    /// Above and left mode buckets on intra frames; `None` on inter frames.
    pub kf_ctx: Option<(usize, usize)>,
    /// The block carries chroma modes.
    pub has_chroma: bool,
    pub cfl_allowed: bool,
    pub allow_screen_content_tools: bool,
    pub enable_filter_intra: bool,
}

impl IntraParams {
    fn use_angle_delta(&self) -> bool {
        self.bsize >= BlockSize::Block8x8
    }

    fn palette_allowed(&self) -> bool {
        self.allow_screen_content_tools
            && self.bsize.width() <= 64
            && self.bsize.height() <= 64
            && self.bsize >= BlockSize::Block8x8
    }

    fn filter_intra_allowed(&self, y_mode: IntraMode) -> bool {
        self.enable_filter_intra
            && y_mode == IntraMode::Dc
            && self.bsize.width() <= 32
            && self.bsize.height() <= 32
    }
}

/// Chroma-from-luma is limited to blocks of at most 32x32, or to 4x4 chroma
/// in lossless segments.
pub fn cfl_allowed(bsize: BlockSize, lossless: bool, ssx: u32, ssy: u32) -> bool {
    if lossless {
        bsize.plane_size(ssx, ssy) == Some(BlockSize::Block4x4)
    } else {
        bsize.width().max(bsize.height()) <= 32
    }
}

fn write_angle_delta(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    mode: IntraMode,
    delta: i8,
    coded: bool,
    location: BlockLocation,
) -> Result<()> {
    if !coded {
        if delta != 0 {
            return Err(EntropyError::invariant(
                SyntaxElement::IntraMode,
                location,
                format!("angle delta {delta} on a mode without one"),
            ));
        }
        return Ok(());
    }
    if !(-MAX_ANGLE_DELTA..=MAX_ANGLE_DELTA).contains(&delta) {
        return Err(EntropyError::invariant(
            SyntaxElement::IntraMode,
            location,
            format!("angle delta {delta} out of range"),
        ));
    }
    let ctx = mode as usize - IntraMode::V as usize;
    enc.encode_symbol((delta + MAX_ANGLE_DELTA) as usize, &mut cdfs.angle_delta[ctx]);
    Ok(())
}

fn cfl_sign(alpha: i8) -> usize {
    match alpha.signum() {
        0 => 0,
        -1 => 1,
        _ => 2,
    }
}

fn write_cfl_alphas(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    cfl: CflAlpha,
    location: BlockLocation,
) -> Result<()> {
    let (su, sv) = (cfl_sign(cfl.u), cfl_sign(cfl.v));
    if su == 0 && sv == 0 {
        return Err(EntropyError::invariant(SyntaxElement::CflAlpha, location, "both alphas are zero"));
    }
    if cfl.u.unsigned_abs() > CFL_ALPHA_MAX || cfl.v.unsigned_abs() > CFL_ALPHA_MAX {
        return Err(EntropyError::invariant(
            SyntaxElement::CflAlpha,
            location,
            format!("alpha ({}, {}) out of range", cfl.u, cfl.v),
        ));
    }
    let joint = su * 3 + sv - 1;
    enc.encode_symbol(joint, &mut cdfs.cfl_sign);
    if su != 0 {
        enc.encode_symbol(cfl.u.unsigned_abs() as usize - 1, &mut cdfs.cfl_alpha[su * 3 + sv - 3]);
    }
    if sv != 0 {
        enc.encode_symbol(cfl.v.unsigned_abs() as usize - 1, &mut cdfs.cfl_alpha[sv * 3 + su - 3]);
    }
    Ok(())
}

/// Codes the luma and chroma modes of an intra block, followed by its
/// palette and filter-intra flags.
pub fn write_intra_modes(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    info: &IntraInfo,
    params: &IntraParams,
    location: BlockLocation,
) -> Result<()> {
    let y_mode = info.y_mode;
    match params.kf_ctx {
        Some((above, left)) => enc.encode_symbol(y_mode as usize, &mut cdfs.kf_y_mode[above][left]),
        None => enc.encode_symbol(y_mode as usize, &mut cdfs.y_mode[params.bsize.size_group()]),
    }
    let angles = params.use_angle_delta();
    write_angle_delta(enc, cdfs, y_mode, info.y_angle_delta, angles && y_mode.is_directional(), location)?;

    if params.has_chroma {
        if info.uv_mode == UvMode::Cfl && !params.cfl_allowed {
            return Err(EntropyError::invariant(
                SyntaxElement::UvMode,
                location,
                "chroma from luma is not available for this block",
            ));
        }
        enc.encode_symbol(
            info.uv_mode.symbol(),
            &mut cdfs.uv_mode[params.cfl_allowed as usize][y_mode as usize],
        );
        match info.uv_mode {
            UvMode::Cfl => write_cfl_alphas(enc, cdfs, info.cfl, location)?,
            UvMode::Intra(m) => {
                write_angle_delta(enc, cdfs, m, info.uv_angle_delta, angles && m.is_directional(), location)?
            }
        }
    }

    if info.use_palette {
        return Err(EntropyError::UnsupportedFeature(Feature::PaletteColors));
    }
    if params.palette_allowed() {
        if y_mode == IntraMode::Dc {
            let bsize_ctx = params.bsize.pels_log2() as usize - 6;
            enc.encode_bool(false, &mut cdfs.palette_y_mode[bsize_ctx][0]);
        }
        if params.has_chroma && info.uv_mode == UvMode::Intra(IntraMode::Dc) {
            enc.encode_bool(false, &mut cdfs.palette_uv_mode[0]);
        }
    }

    if params.filter_intra_allowed(y_mode) {
        enc.encode_bool(info.filter_intra.is_some(), &mut cdfs.filter_intra[params.bsize as usize]);
        if let Some(mode) = info.filter_intra {
            enc.encode_symbol(mode as usize, &mut cdfs.filter_intra_mode);
        }
    } else if info.filter_intra.is_some() {
        return Err(EntropyError::invariant(
            SyntaxElement::FilterIntra,
            location,
            "filter intra needs DC luma, at most 32x32, and the sequence tool",
        ));
    }
    Ok(())
}
