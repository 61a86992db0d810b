//! Inter prediction syntax: references, modes, motion vectors, motion
//! modes and interpolation filters.

use crate::block::InterInfo;
use crate::cdf::CdfContext;
use crate::context::{self, Neighbors};
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::frame::FrameHeader;
use crate::mode::{GlobalMotionType, InterMode, InterpFilter, MotionMode, RefFrame};
use crate::msac::MsacEncoder;
use crate::mv::write_mv;
use crate::size::BlockSize;

/// Frame-level switches the inter syntax depends on.
#[derive(Debug, Clone, Copy)]
pub struct InterParams<'a> {
    pub fh: &'a FrameHeader,
    pub enable_dual_filter: bool,
    pub bsize: BlockSize,
}

impl InterParams<'_> {
    fn comp_allowed(&self) -> bool {
        self.fh.reference_select && self.bsize.is_comp_ref_allowed()
    }

    fn min_side(&self) -> u32 {
        self.bsize.width().min(self.bsize.height())
    }
}

fn ref_error(location: BlockLocation, reason: String) -> EntropyError {
    EntropyError::invariant(SyntaxElement::RefFrames, location, reason)
}

/// Codes the reference frame pair. A second reference of `Intra` means
/// single prediction.
pub fn write_ref_frames(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    refs: [RefFrame; 2],
    comp_allowed: bool,
    nb: &Neighbors,
    location: BlockLocation,
) -> Result<()> {
    use RefFrame::*;
    let compound = refs[1].is_inter();
    if !refs[0].is_inter() {
        return Err(ref_error(location, "inter block without a reference".into()));
    }
    if compound && !comp_allowed {
        return Err(ref_error(location, "compound prediction not allowed here".into()));
    }
    if comp_allowed {
        enc.encode_bool(compound, &mut cdfs.comp_inter[nb.comp_inter_ctx()]);
    }
    let counts = nb.ref_counts();

    if compound {
        let bidir = !refs[0].is_backward() && refs[1].is_backward();
        let uni = matches!(
            (refs[0], refs[1]),
            (Last, Last2) | (Last, Last3) | (Last, Golden) | (Bwd, Alt)
        );
        if !bidir && !uni {
            return Err(ref_error(location, format!("invalid compound pair {refs:?}")));
        }
        enc.encode_bool(bidir, &mut cdfs.comp_ref_type[nb.comp_ref_type_ctx()]);
        if uni {
            let bit = refs[0] == Bwd;
            enc.encode_bool(bit, &mut cdfs.uni_comp_ref[counts.fwd_bwd()][0]);
            if !bit {
                let bit1 = matches!(refs[1], Last3 | Golden);
                enc.encode_bool(bit1, &mut cdfs.uni_comp_ref[counts.last2_vs_last3_golden()][1]);
                if bit1 {
                    enc.encode_bool(refs[1] == Golden, &mut cdfs.uni_comp_ref[counts.last3_vs_golden()][2]);
                }
            }
            return Ok(());
        }
        let bit = matches!(refs[0], Last3 | Golden);
        enc.encode_bool(bit, &mut cdfs.comp_ref[counts.last_last2_vs_last3_golden()][0]);
        if bit {
            enc.encode_bool(refs[0] == Golden, &mut cdfs.comp_ref[counts.last3_vs_golden()][2]);
        } else {
            enc.encode_bool(refs[0] == Last2, &mut cdfs.comp_ref[counts.last_vs_last2()][1]);
        }
        let bwd = refs[1] == Alt;
        enc.encode_bool(bwd, &mut cdfs.comp_bwdref[counts.bwd_alt2_vs_alt()][0]);
        if !bwd {
            enc.encode_bool(refs[1] == Alt2, &mut cdfs.comp_bwdref[counts.bwd_vs_alt2()][1]);
        }
        return Ok(());
    }

    let r = refs[0];
    let backward = r.is_backward();
    enc.encode_bool(backward, &mut cdfs.single_ref[counts.fwd_bwd()][0]);
    if backward {
        let alt = r == Alt;
        enc.encode_bool(alt, &mut cdfs.single_ref[counts.bwd_alt2_vs_alt()][1]);
        if !alt {
            enc.encode_bool(r == Alt2, &mut cdfs.single_ref[counts.bwd_vs_alt2()][5]);
        }
    } else {
        let far = matches!(r, Last3 | Golden);
        enc.encode_bool(far, &mut cdfs.single_ref[counts.last_last2_vs_last3_golden()][2]);
        if far {
            enc.encode_bool(r != Last3, &mut cdfs.single_ref[counts.last3_vs_golden()][4]);
        } else {
            enc.encode_bool(r != Last, &mut cdfs.single_ref[counts.last_vs_last2()][3]);
        }
    }
    Ok(())
}

/// Codes the inter mode from the packed mode context of its reference type.
pub fn write_inter_mode(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    mode: InterMode,
    compound: bool,
    mode_context: u16,
    location: BlockLocation,
) -> Result<()> {
    let mode_error = |reason: String| EntropyError::invariant(SyntaxElement::InterMode, location, reason);
    if mode.is_compound() != compound {
        return Err(mode_error(format!("{mode:?} does not match the reference count")));
    }
    if compound {
        let ctx = context::compound_mode_ctx(mode_context)
            .ok_or_else(|| mode_error(format!("mode context {mode_context:#x} out of range")))?;
        enc.encode_symbol(mode.compound_symbol(), &mut cdfs.compound_mode[ctx]);
        return Ok(());
    }

    let newmv_ctx = context::newmv_ctx(mode_context);
    let refmv_ctx = context::refmv_ctx(mode_context);
    if newmv_ctx >= cdfs.newmv.len() || refmv_ctx >= cdfs.refmv.len() {
        return Err(mode_error(format!("mode context {mode_context:#x} out of range")));
    }
    enc.encode_bool(mode != InterMode::NewMv, &mut cdfs.newmv[newmv_ctx]);
    if mode == InterMode::NewMv {
        return Ok(());
    }
    enc.encode_bool(mode != InterMode::GlobalMv, &mut cdfs.zeromv[context::zeromv_ctx(mode_context)]);
    if mode == InterMode::GlobalMv {
        return Ok(());
    }
    enc.encode_bool(mode != InterMode::NearestMv, &mut cdfs.refmv[refmv_ctx]);
    Ok(())
}

/// Codes which candidate of the reference list the mode refers to.
pub fn write_drl(enc: &mut MsacEncoder, cdfs: &mut CdfContext, info: &InterInfo, location: BlockLocation) -> Result<()> {
    let count = info.pred.ref_mv_count as usize;
    let k = info.drl_index as usize;
    let weights = &info.pred.drl_weights;
    let drl_error = |reason: &str| {
        EntropyError::invariant(
            SyntaxElement::Drl,
            location,
            format!("index {k} with {count} candidates: {reason}"),
        )
    };

    if matches!(info.mode, InterMode::NewMv | InterMode::NewNewMv) {
        if k > 2 || (k > 0 && count <= k) {
            return Err(drl_error("not reachable"));
        }
        for idx in 0..2 {
            if count > idx + 1 {
                enc.encode_bool(k != idx, &mut cdfs.drl[context::drl_ctx(weights, idx)]);
                if k == idx {
                    break;
                }
            }
        }
    } else if info.mode.has_nearmv() {
        if k > 2 || (k > 0 && count <= k + 1) {
            return Err(drl_error("not reachable"));
        }
        for idx in 1..3 {
            if count > idx + 1 {
                enc.encode_bool(k != idx - 1, &mut cdfs.drl[context::drl_ctx(weights, idx)]);
                if k == idx - 1 {
                    break;
                }
            }
        }
    } else if k != 0 {
        return Err(drl_error("mode has no list index"));
    }
    Ok(())
}

/// Most flexible motion mode the block may signal.
pub fn motion_mode_allowed(params: &InterParams<'_>, info: &InterInfo) -> MotionMode {
    let fh = params.fh;
    if !fh.force_integer_mv
        && info.mode.is_global()
        && fh.gm_type(info.ref_frames[0]) > GlobalMotionType::Translation
        && params.min_side() >= 8
    {
        return MotionMode::Simple;
    }
    if params.min_side() >= 8 && !info.is_compound() && info.pred.overlappable {
        if info.pred.num_proj_ref >= 1 && fh.allow_warped_motion && !fh.force_integer_mv {
            return MotionMode::Warped;
        }
        return MotionMode::Obmc;
    }
    MotionMode::Simple
}

pub fn write_motion_mode(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    params: &InterParams<'_>,
    info: &InterInfo,
    location: BlockLocation,
) -> Result<()> {
    let allowed = if params.fh.is_motion_mode_switchable {
        motion_mode_allowed(params, info)
    } else {
        MotionMode::Simple
    };
    if info.motion_mode as u8 > allowed as u8 {
        return Err(EntropyError::invariant(
            SyntaxElement::MotionMode,
            location,
            format!("{:?} where at most {allowed:?} is allowed", info.motion_mode),
        ));
    }
    let b = params.bsize as usize;
    match allowed {
        MotionMode::Simple => {}
        MotionMode::Obmc => enc.encode_bool(info.motion_mode == MotionMode::Obmc, &mut cdfs.obmc[b]),
        MotionMode::Warped => enc.encode_symbol(info.motion_mode as usize, &mut cdfs.motion_mode[b]),
    }
    Ok(())
}

/// False when the filters follow from the mode and nothing is coded.
pub fn interp_needed(params: &InterParams<'_>, info: &InterInfo) -> bool {
    if info.motion_mode == MotionMode::Warped {
        return false;
    }
    let refs = if info.is_compound() { &info.ref_frames[..] } else { &info.ref_frames[..1] };
    let non_translational = info.mode.is_global()
        && params.min_side() >= 8
        && refs.iter().all(|&r| params.fh.gm_type(r) != GlobalMotionType::Translation);
    !non_translational
}

/// Filter a block uses when none is coded.
pub fn default_interp(frame_filter: InterpFilter) -> InterpFilter {
    match frame_filter {
        InterpFilter::Switchable => InterpFilter::Regular,
        f => f,
    }
}

/// Codes the interpolation filters and returns the pair the block uses.
pub fn write_interp_filter(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    params: &InterParams<'_>,
    info: &InterInfo,
    nb: &Neighbors,
    location: BlockLocation,
) -> Result<[InterpFilter; 2]> {
    let frame_filter = params.fh.interpolation_filter;
    if !interp_needed(params, info) {
        return Ok([default_interp(frame_filter); 2]);
    }
    let filter_error = |reason: String| EntropyError::invariant(SyntaxElement::InterpFilter, location, reason);
    if frame_filter != InterpFilter::Switchable {
        if info.interp != [frame_filter; 2] {
            return Err(filter_error(format!("{:?} on a {frame_filter:?} frame", info.interp)));
        }
        return Ok(info.interp);
    }
    if info.interp.iter().any(|&f| f as u8 > InterpFilter::Sharp as u8) {
        return Err(filter_error(format!("{:?} is not switchable", info.interp)));
    }
    if !params.enable_dual_filter && info.interp[0] != info.interp[1] {
        return Err(filter_error("dual filters without the sequence tool".into()));
    }
    let dirs = if params.enable_dual_filter { 2 } else { 1 };
    for dir in 0..dirs {
        let ctx = nb.interp_ctx(dir, info.ref_frames);
        enc.encode_symbol(info.interp[dir] as usize, &mut cdfs.switchable_interp[ctx]);
    }
    Ok(info.interp)
}

/// Codes everything after the intra/inter flag of an inter block and
/// returns the filters to record for its neighbours.
pub fn write_inter_info(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    params: &InterParams<'_>,
    info: &InterInfo,
    nb: &Neighbors,
    location: BlockLocation,
) -> Result<[InterpFilter; 2]> {
    write_ref_frames(enc, cdfs, info.ref_frames, params.comp_allowed(), nb, location)?;
    write_inter_mode(enc, cdfs, info.mode, info.is_compound(), info.pred.mode_context, location)?;
    write_drl(enc, cdfs, info, location)?;

    let precision = params.fh.mv_precision();
    for (i, coded) in info.mode.new_mv_refs().into_iter().enumerate() {
        if coded {
            write_mv(enc, &mut cdfs.nmv, info.mv[i], info.pred.ref_mv[i], precision, location)?;
        }
    }

    write_motion_mode(enc, cdfs, params, info, location)?;
    write_interp_filter(enc, cdfs, params, info, nb, location)
}
