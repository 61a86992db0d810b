//! Tile coder: walks the partition trees of a tile's superblocks and emits
//! every block's syntax into one arithmetic-coded stream.

use tracing::{debug, trace};

use crate::block::{CodingBlock, InterInfo, PartitionTree, Prediction, RestorationUnit, TransformBlock};
use crate::cdf::CdfContext;
use crate::context::{Neighbors, SegmentPrediction, spatial_segment_pred};
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::frame::{FrameHeader, TileBounds};
use crate::inter::{InterParams, default_interp, write_inter_info};
use crate::intra::{IntraParams, cfl_allowed, write_intra_modes};
use crate::mode::{InterMode, IntraMode, InterpFilter, MvPrecision, RefFrame, TxSetType, TxType};
use crate::msac::MsacEncoder;
use crate::mv::write_mv;
use crate::neighbor::{NeighborInfo, NeighborState};
use crate::partition::{FrameExtent, PartitionBlock, partition_blocks, write_partition};
use crate::restoration::{RestorationLayout, RestorationRefs, write_restoration_unit};
use crate::segment::{CdefTracker, write_delta_qindex, write_segment_id};
use crate::sequence::SequenceHeader;
use crate::size::{BlockSize, TxSize, is_chroma_reference};
use crate::txb::{TxTypeSignal, TxbCoding, txb_context, write_coeffs};
use crate::txsize::{TxLeaf, TxParams, TxfmEdges, write_tx_size};

/// Largest residual unit coded before moving on to the next plane.
const RESIDUAL_UNIT_MI: u32 = 16;

/// Frame-level inputs shared by all tiles of a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameState<'a> {
    pub seq: &'a SequenceHeader,
    pub fh: &'a FrameHeader,
    pub extent: FrameExtent,
    pub restoration: RestorationLayout,
}

impl<'a> FrameState<'a> {
    pub fn new(seq: &'a SequenceHeader, fh: &'a FrameHeader, mi_rows: u32, mi_cols: u32) -> Self {
        Self {
            seq,
            fh,
            extent: FrameExtent { mi_rows, mi_cols },
            restoration: RestorationLayout::new(seq, fh),
        }
    }

    fn subsampling(&self, plane: usize) -> (u32, u32) {
        if plane == 0 {
            (0, 0)
        } else {
            (self.seq.ssx(), self.seq.ssy())
        }
    }
}

/// Coded bytes of one tile and its adapted CDFs.
#[derive(Debug, Clone)]
pub struct TileOutput {
    pub data: Vec<u8>,
    pub cdf: CdfContext,
}

/// Luma transform block and the type chroma may inherit from it.
#[derive(Debug, Clone, Copy)]
struct LumaTx {
    leaf: TxLeaf,
    tx_type: TxType,
}

/// What the residual coder needs to know about the block's prediction.
#[derive(Debug, Clone, Copy)]
struct ResidualParams {
    block: PartitionBlock,
    segment_id: u8,
    lossless: bool,
    is_inter: bool,
    has_chroma: bool,
    intra_dir: IntraMode,
    uv_tx_type: TxType,
}

pub struct TileEncoder<'a> {
    frame: FrameState<'a>,
    bounds: TileBounds,
    enc: MsacEncoder,
    cdf: CdfContext,
    ctx: NeighborState,
    lr_refs: RestorationRefs,
    cdef: CdefTracker,
    current_qindex: u8,
}

impl<'a> TileEncoder<'a> {
    /// Starts a tile from `cdf`, the frame's initial context.
    pub fn new(frame: FrameState<'a>, bounds: TileBounds, cdf: CdfContext) -> Self {
        let (ssx, ssy) = frame.subsampling(1);
        let mut enc = MsacEncoder::new();
        enc.allow_update_cdf = !frame.fh.disable_cdf_update;
        debug!(
            mi_row_start = bounds.mi_row_start,
            mi_col_start = bounds.mi_col_start,
            "starting tile"
        );
        Self {
            frame,
            bounds,
            enc,
            cdf,
            ctx: NeighborState::new(
                bounds.mi_row_start,
                bounds.mi_col_start,
                bounds.mi_row_end - bounds.mi_row_start,
                bounds.mi_col_end - bounds.mi_col_start,
                ssx,
                ssy,
            ),
            lr_refs: RestorationRefs::new(),
            cdef: CdefTracker::new(),
            current_qindex: frame.fh.quant.base_q_idx,
        }
    }

    pub fn bounds(&self) -> TileBounds {
        self.bounds
    }

    /// Bits written so far.
    pub fn tell(&self) -> usize {
        self.enc.tell()
    }

    /// Codes one superblock: its restoration units, then its partition tree.
    /// Returns the number of bits it took.
    pub fn encode_superblock(
        &mut self,
        mi_row: u32,
        mi_col: u32,
        tree: &PartitionTree,
        restoration: &[Vec<RestorationUnit>; 3],
    ) -> Result<usize> {
        let start = self.enc.tell();
        let sb_size = self.frame.seq.sb_size();
        self.cdef.reset();
        self.encode_restoration(mi_row, mi_col, sb_size, restoration)?;
        self.encode_partition(mi_row, mi_col, sb_size, tree)?;
        let bits = self.enc.tell() - start;
        trace!(mi_row, mi_col, bits, "superblock");
        Ok(bits)
    }

    pub fn finish(self) -> TileOutput {
        let data = self.enc.finalize();
        debug!(bytes = data.len(), "finished tile");
        TileOutput { data, cdf: self.cdf }
    }

    fn encode_restoration(
        &mut self,
        mi_row: u32,
        mi_col: u32,
        sb_size: BlockSize,
        units: &[Vec<RestorationUnit>; 3],
    ) -> Result<()> {
        let layout = self.frame.restoration;
        if !layout.coded {
            return Ok(());
        }
        let location = BlockLocation::new(mi_row, mi_col, sb_size);
        for (plane, grid) in layout.planes.iter().enumerate().take(self.frame.seq.num_planes()) {
            if grid.unit_count() == 0 {
                continue;
            }
            let (rows, cols) = grid.units_in_sb(mi_row, mi_col, sb_size);
            for r in rows {
                for c in cols.clone() {
                    let index = (r * grid.cols + c) as usize;
                    let unit = units[plane].get(index).ok_or_else(|| {
                        EntropyError::invariant(
                            SyntaxElement::Restoration,
                            location,
                            format!("plane {plane} is missing restoration unit {index}"),
                        )
                    })?;
                    write_restoration_unit(
                        &mut self.enc,
                        &mut self.cdf,
                        &mut self.lr_refs,
                        plane,
                        grid.frame_type,
                        unit,
                        location,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn neighbors(&self, mi_row: u32, mi_col: u32) -> Neighbors {
        Neighbors::new(
            self.ctx.blocks.above(mi_row, mi_col),
            self.ctx.blocks.left(mi_row, mi_col),
        )
    }

    fn segment_prediction(&self, mi_row: u32, mi_col: u32) -> SegmentPrediction {
        let seg = |n: Option<NeighborInfo>| n.map(|n| n.segment_id);
        let blocks = &self.ctx.blocks;
        spatial_segment_pred(
            seg(blocks.above_left(mi_row, mi_col)),
            seg(blocks.above(mi_row, mi_col)),
            seg(blocks.left(mi_row, mi_col)),
        )
    }

    fn encode_partition(&mut self, mi_row: u32, mi_col: u32, bsize: BlockSize, tree: &PartitionTree) -> Result<()> {
        let extent = self.frame.extent;
        let location = BlockLocation::new(mi_row, mi_col, bsize);
        let partition = tree.partition();
        let ctx = if bsize >= BlockSize::Block8x8 {
            self.neighbors(mi_row, mi_col).partition_ctx(bsize)
        } else {
            0
        };
        write_partition(&mut self.enc, &mut self.cdf, ctx, extent, partition, location)?;

        let blocks = partition_blocks(bsize, partition, mi_row, mi_col, extent);
        let mismatch = |expected: usize, got: usize| {
            EntropyError::invariant(
                SyntaxElement::Partition,
                location,
                format!("{partition:?} lays out {expected} in-frame blocks, tree has {got}"),
            )
        };
        match tree {
            PartitionTree::Split(children) => {
                if children.len() != blocks.len() {
                    return Err(mismatch(blocks.len(), children.len()));
                }
                for (child, b) in children.iter().zip(&blocks) {
                    self.encode_partition(b.mi_row, b.mi_col, b.bsize, child)?;
                }
            }
            PartitionTree::Leaf(_, coded) => {
                if coded.len() != blocks.len() {
                    return Err(mismatch(blocks.len(), coded.len()));
                }
                for (block, b) in coded.iter().zip(&blocks) {
                    self.encode_block(*b, block)?;
                }
            }
        }
        Ok(())
    }

    fn encode_block(&mut self, pb: PartitionBlock, block: &CodingBlock) -> Result<()> {
        let PartitionBlock { mi_row, mi_col, bsize } = pb;
        let location = BlockLocation::new(mi_row, mi_col, bsize);
        let (seq, fh) = (self.frame.seq, self.frame.fh);
        let nb = self.neighbors(mi_row, mi_col);
        let (ssx, ssy) = self.frame.subsampling(1);
        let has_chroma = seq.num_planes() > 1 && is_chroma_reference(mi_row, mi_col, bsize, ssx, ssy);
        let intra_frame = fh.is_intra();

        match &block.prediction {
            Prediction::Inter(_) if intra_frame => {
                return Err(EntropyError::invariant(
                    SyntaxElement::IsInter,
                    location,
                    "inter prediction on an intra frame",
                ));
            }
            Prediction::IntraBc { .. } if !(intra_frame && fh.allow_intrabc) => {
                return Err(EntropyError::invariant(
                    SyntaxElement::IntraBc,
                    location,
                    "intra block copy is not allowed on this frame",
                ));
            }
            _ => {}
        }

        let skip_mode = self.write_skip_mode(bsize, block, &nb, location)?;
        let skip = if skip_mode {
            true
        } else {
            self.enc.encode_bool(block.skip, &mut self.cdf.skip[nb.skip_ctx()]);
            block.skip
        };

        let pred = self.segment_prediction(mi_row, mi_col);
        let segment_id = write_segment_id(
            &mut self.enc,
            &mut self.cdf,
            &fh.segmentation,
            pred,
            block.segment_id,
            skip,
            location,
        )?;

        if fh.cdef_enabled(seq) {
            self.cdef.write(
                &mut self.enc,
                fh.cdef.bits,
                seq.use_128x128_superblock,
                skip,
                block.cdef_idx,
                location,
            )?;
        }
        self.write_delta_q(bsize, skip, block.delta_q, location)?;

        let lossless = fh.is_lossless(segment_id);
        let mut info = NeighborInfo {
            bsize,
            is_inter: false,
            skip,
            skip_mode,
            ref_frames: [RefFrame::Intra; 2],
            y_mode: IntraMode::Dc,
            interp: [default_interp(fh.interpolation_filter); 2],
            segment_id,
        };
        let mut intra_dir = IntraMode::Dc;
        let mut uv_tx_type = TxType::DctDct;

        if skip_mode {
            info.is_inter = true;
            info.ref_frames = fh.skip_mode_frames;
        } else {
            if intra_frame {
                if fh.allow_intrabc {
                    let dv = match block.prediction {
                        Prediction::IntraBc { dv, ref_dv } => Some((dv, ref_dv)),
                        _ => None,
                    };
                    self.enc.encode_bool(dv.is_some(), &mut self.cdf.intrabc);
                    if let Some((dv, ref_dv)) = dv {
                        write_mv(&mut self.enc, &mut self.cdf.ndvc, dv, ref_dv, MvPrecision::Integer, location)?;
                        info.is_inter = true;
                        info.interp = [InterpFilter::Bilinear; 2];
                    }
                }
            } else {
                let is_inter = block.is_inter();
                self.enc.encode_bool(is_inter, &mut self.cdf.intra_inter[nb.intra_inter_ctx()]);
            }

            match &block.prediction {
                Prediction::Intra(intra) => {
                    let params = IntraParams {
                        bsize,
                        kf_ctx: intra_frame.then(|| nb.kf_y_mode_ctx()),
                        has_chroma,
                        cfl_allowed: cfl_allowed(bsize, lossless, ssx, ssy),
                        allow_screen_content_tools: fh.allow_screen_content_tools,
                        enable_filter_intra: seq.enable_filter_intra,
                    };
                    write_intra_modes(&mut self.enc, &mut self.cdf, intra, &params, location)?;
                    info.y_mode = intra.y_mode;
                    intra_dir = intra.filter_intra.map_or(intra.y_mode, |f| f.intra_dir());
                    uv_tx_type = intra.uv_mode.tx_type();
                }
                Prediction::Inter(inter) => {
                    let params = InterParams {
                        fh,
                        enable_dual_filter: seq.enable_dual_filter,
                        bsize,
                    };
                    info.interp = write_inter_info(&mut self.enc, &mut self.cdf, &params, inter, &nb, location)?;
                    info.is_inter = true;
                    info.ref_frames = inter.ref_frames;
                }
                Prediction::IntraBc { .. } => {}
            }
        }

        let extent = self.frame.extent;
        let (bw, bh) = (bsize.width_mi(), bsize.height_mi());
        let tx_params = TxParams {
            bsize,
            mi_row,
            mi_col,
            rows_in_frame: bh.min(extent.mi_rows - mi_row),
            cols_in_frame: bw.min(extent.mi_cols - mi_col),
            tx_mode: fh.tx_mode(),
            is_inter: info.is_inter,
            skip,
            lossless,
        };
        let mut edges = TxfmEdges {
            above: &mut self.ctx.txfm_above,
            left: &mut self.ctx.txfm_left,
        };
        let leaves = write_tx_size(&mut self.enc, &mut self.cdf, &mut edges, &nb, &tx_params, &block.tx, location)?;

        let residual = ResidualParams {
            block: pb,
            segment_id,
            lossless,
            is_inter: info.is_inter,
            has_chroma,
            intra_dir,
            uv_tx_type,
        };
        if skip {
            if block.residual.iter().any(|r| !r.is_empty()) {
                return Err(EntropyError::invariant(
                    SyntaxElement::Coefficients,
                    location,
                    "skipped block carries transform blocks",
                ));
            }
            self.clear_coef_context(&residual)?;
        } else {
            self.write_residual(&residual, &leaves, &block.residual)?;
        }

        self.ctx.blocks.set(mi_row, mi_col, bh, bw, info);
        Ok(())
    }

    /// Codes the skip-mode flag where the frame allows it and checks that a
    /// skip-mode block matches what the flag implies.
    fn write_skip_mode(
        &mut self,
        bsize: BlockSize,
        block: &CodingBlock,
        nb: &Neighbors,
        location: BlockLocation,
    ) -> Result<bool> {
        let fh = self.frame.fh;
        let allowed = !fh.is_intra() && fh.skip_mode_present && bsize.is_comp_ref_allowed();
        let err = |reason: &str| Err(EntropyError::invariant(SyntaxElement::SkipMode, location, reason));
        if !allowed {
            return if block.skip_mode {
                err("skip mode is not available for this block")
            } else {
                Ok(false)
            };
        }
        self.enc.encode_bool(block.skip_mode, &mut self.cdf.skip_mode[nb.skip_mode_ctx()]);
        if !block.skip_mode {
            return Ok(false);
        }
        if !block.skip {
            return err("skip mode implies a skipped residual");
        }
        match &block.prediction {
            Prediction::Inter(InterInfo { ref_frames, mode, .. })
                if *ref_frames == fh.skip_mode_frames && *mode == InterMode::NearestNearestMv =>
            {
                Ok(true)
            }
            _ => err("skip mode implies NEAREST_NEARESTMV on the skip-mode references"),
        }
    }

    fn write_delta_q(&mut self, bsize: BlockSize, skip: bool, delta: i32, location: BlockLocation) -> Result<()> {
        let fh = self.frame.fh;
        let sb_size = self.frame.seq.sb_size();
        let sb_mask = sb_size.width_mi() - 1;
        let sb_top_left = location.mi_row & sb_mask == 0 && location.mi_col & sb_mask == 0;
        let coded = fh.delta_q_present && sb_top_left && (bsize != sb_size || !skip);
        if !coded {
            if delta != 0 {
                return Err(EntropyError::invariant(
                    SyntaxElement::DeltaQ,
                    location,
                    format!("delta {delta} on a block that codes none"),
                ));
            }
            return Ok(());
        }
        write_delta_qindex(&mut self.enc, &mut self.cdf, delta, location)?;
        let qindex = self.current_qindex as i32 + (delta << fh.delta_q_res_log2);
        if !(1..=255).contains(&qindex) {
            return Err(EntropyError::invariant(
                SyntaxElement::DeltaQ,
                location,
                format!("delta {delta} moves the quantizer to {qindex}"),
            ));
        }
        self.current_qindex = qindex as u8;
        Ok(())
    }

    fn planes(&self, p: &ResidualParams) -> usize {
        if p.has_chroma { self.frame.seq.num_planes() } else { 1 }
    }

    fn plane_bsize(&self, plane: usize, p: &ResidualParams) -> Result<BlockSize> {
        let (ssx, ssy) = self.frame.subsampling(plane);
        p.block.bsize.plane_size(ssx, ssy).ok_or_else(|| {
            EntropyError::invariant(
                SyntaxElement::Coefficients,
                BlockLocation::new(p.block.mi_row, p.block.mi_col, p.block.bsize),
                format!("no plane block for subsampling ({ssx}, {ssy})"),
            )
        })
    }

    /// A skipped block leaves zero contexts over its whole extent.
    fn clear_coef_context(&mut self, p: &ResidualParams) -> Result<()> {
        for plane in 0..self.planes(p) {
            let (ssx, ssy) = self.frame.subsampling(plane);
            let plane_bsize = self.plane_bsize(plane, p)?;
            self.ctx.coef_above[plane].fill(p.block.mi_col >> ssx, plane_bsize.width_mi(), 0);
            self.ctx.coef_left[plane].fill(p.block.mi_row >> ssy, plane_bsize.height_mi(), 0);
        }
        Ok(())
    }

    /// Codes the transform blocks of every plane, 64x64 luma unit by unit.
    fn write_residual(
        &mut self,
        p: &ResidualParams,
        leaves: &[TxLeaf],
        residual: &[Vec<TransformBlock>; 3],
    ) -> Result<()> {
        let PartitionBlock { mi_row, mi_col, bsize } = p.block;
        let location = BlockLocation::new(mi_row, mi_col, bsize);
        let extent = self.frame.extent;
        let max_w = bsize.width_mi().min(extent.mi_cols - mi_col);
        let max_h = bsize.height_mi().min(extent.mi_rows - mi_row);
        let mu_w = max_w.min(RESIDUAL_UNIT_MI);
        let mu_h = max_h.min(RESIDUAL_UNIT_MI);
        let planes = self.planes(p);

        let mut next = [0usize; 3];
        let mut luma = Vec::with_capacity(leaves.len());
        for row in (0..max_h).step_by(mu_h as usize) {
            for col in (0..max_w).step_by(mu_w as usize) {
                let in_unit = |l: &&TxLeaf| {
                    let (r, c) = (l.mi_row - mi_row, l.mi_col - mi_col);
                    (row..row + mu_h).contains(&r) && (col..col + mu_w).contains(&c)
                };
                for leaf in leaves.iter().filter(in_unit) {
                    let tb = next_txb(residual, &mut next, 0, location)?;
                    let tx_type = self.write_luma_txb(p, leaf, tb)?;
                    luma.push(LumaTx { leaf: *leaf, tx_type });
                }

                for plane in 1..planes {
                    let (ssx, ssy) = self.frame.subsampling(plane);
                    let plane_bsize = self.plane_bsize(plane, p)?;
                    let tx = if p.lossless {
                        TxSize::Tx4x4
                    } else {
                        plane_bsize.max_rect_tx_size().adjusted()
                    };
                    let unit_h = ((mu_h + row).min(max_h) + ssy) >> ssy;
                    let unit_w = ((mu_w + col).min(max_w) + ssx) >> ssx;
                    for blk_row in ((row >> ssy)..unit_h).step_by(tx.height_mi() as usize) {
                        for blk_col in ((col >> ssx)..unit_w).step_by(tx.width_mi() as usize) {
                            let pos_row = (mi_row >> ssy) + blk_row;
                            let pos_col = (mi_col >> ssx) + blk_col;
                            let expected = self.chroma_tx_type(p, tx, pos_row << ssy, pos_col << ssx, &luma);
                            let tb = next_txb(residual, &mut next, plane, location)?;
                            if has_coeffs(tb) && tb.tx_type != expected {
                                return Err(EntropyError::invariant(
                                    SyntaxElement::TxType,
                                    location,
                                    format!("chroma {:?} where {expected:?} is implied", tb.tx_type),
                                ));
                            }
                            let coding = TxbPlacement {
                                plane,
                                plane_bsize,
                                pos_row,
                                pos_col,
                                tx,
                            };
                            self.write_txb(&coding, tb, expected, None, location)?;
                        }
                    }
                }
            }
        }

        for (plane, blocks) in residual.iter().enumerate() {
            if next[plane] != blocks.len() {
                return Err(EntropyError::invariant(
                    SyntaxElement::Coefficients,
                    location,
                    format!("plane {plane} has {} transform blocks, {} coded", blocks.len(), next[plane]),
                ));
            }
        }
        Ok(())
    }

    /// Codes one luma transform block and returns the type chroma sees.
    fn write_luma_txb(&mut self, p: &ResidualParams, leaf: &TxLeaf, tb: &TransformBlock) -> Result<TxType> {
        let fh = self.frame.fh;
        let location = BlockLocation::new(p.block.mi_row, p.block.mi_col, p.block.bsize);
        let set = TxSetType::for_tx(leaf.size, p.is_inter, fh.reduced_tx_set);
        let signal = (set.symbol_count() > 1 && fh.segment_qindex(p.segment_id) > 0).then_some(TxTypeSignal {
            set,
            is_inter: p.is_inter,
            intra_dir: p.intra_dir,
        });
        let nonzero = has_coeffs(tb);
        if signal.is_none() && nonzero && tb.tx_type != TxType::DctDct {
            return Err(EntropyError::invariant(
                SyntaxElement::TxType,
                location,
                format!("{:?} where only DCT_DCT can be coded", tb.tx_type),
            ));
        }
        let coding = TxbPlacement {
            plane: 0,
            plane_bsize: p.block.bsize,
            pos_row: leaf.mi_row,
            pos_col: leaf.mi_col,
            tx: leaf.size,
        };
        self.write_txb(&coding, tb, tb.tx_type, signal, location)?;
        Ok(if nonzero { tb.tx_type } else { TxType::DctDct })
    }

    /// Chroma transform type implied by the block's prediction at the luma
    /// position (`luma_row`, `luma_col`).
    fn chroma_tx_type(&self, p: &ResidualParams, tx: TxSize, luma_row: u32, luma_col: u32, luma: &[LumaTx]) -> TxType {
        if p.lossless || tx.sqr_up() > TxSize::Tx32x32 {
            return TxType::DctDct;
        }
        let set = TxSetType::for_tx(tx, p.is_inter, self.frame.fh.reduced_tx_set);
        let tx_type = if p.is_inter {
            let row = luma_row.max(p.block.mi_row);
            let col = luma_col.max(p.block.mi_col);
            luma.iter()
                .find(|l| {
                    (l.leaf.mi_row..l.leaf.mi_row + l.leaf.size.height_mi()).contains(&row)
                        && (l.leaf.mi_col..l.leaf.mi_col + l.leaf.size.width_mi()).contains(&col)
                })
                .map_or(TxType::DctDct, |l| l.tx_type)
        } else {
            p.uv_tx_type
        };
        if set.contains(tx_type) { tx_type } else { TxType::DctDct }
    }

    fn write_txb(
        &mut self,
        at: &TxbPlacement,
        tb: &TransformBlock,
        tx_type: TxType,
        signal: Option<TxTypeSignal>,
        location: BlockLocation,
    ) -> Result<()> {
        let TxbPlacement { plane, plane_bsize, pos_row, pos_col, tx } = *at;
        let (tw, th) = (tx.width_mi(), tx.height_mi());
        let ctx = txb_context(
            plane_bsize,
            tx,
            plane,
            self.ctx.coef_above[plane].slice(pos_col, tw),
            self.ctx.coef_left[plane].slice(pos_row, th),
        );
        let coding = TxbCoding {
            tx_size: tx,
            tx_type,
            plane_type: usize::from(plane > 0),
            ctx,
            coeffs: &tb.coeffs,
            signal,
            location,
        };
        let cul = write_coeffs(&mut self.enc, &mut self.cdf, &coding)?;

        let (ssx, ssy) = self.frame.subsampling(plane);
        let extent = self.frame.extent;
        let plane_cols = (extent.mi_cols + ssx) >> ssx;
        let plane_rows = (extent.mi_rows + ssy) >> ssy;
        let in_w = tw.min(plane_cols.saturating_sub(pos_col));
        let in_h = th.min(plane_rows.saturating_sub(pos_row));
        let above = &mut self.ctx.coef_above[plane];
        above.fill(pos_col, in_w, cul);
        above.fill(pos_col + in_w, tw - in_w, 0);
        let left = &mut self.ctx.coef_left[plane];
        left.fill(pos_row, in_h, cul);
        left.fill(pos_row + in_h, th - in_h, 0);
        Ok(())
    }
}

/// Where a transform block sits, in 4x4 units of its plane.
#[derive(Debug, Clone, Copy)]
struct TxbPlacement {
    plane: usize,
    plane_bsize: BlockSize,
    pos_row: u32,
    pos_col: u32,
    tx: TxSize,
}

fn next_txb<'r>(
    residual: &'r [Vec<TransformBlock>; 3],
    next: &mut [usize; 3],
    plane: usize,
    location: BlockLocation,
) -> Result<&'r TransformBlock> {
    let tb = residual[plane].get(next[plane]).ok_or_else(|| {
        EntropyError::invariant(
            SyntaxElement::Coefficients,
            location,
            format!("plane {plane} ran out of transform blocks"),
        )
    })?;
    next[plane] += 1;
    Ok(tb)
}

fn has_coeffs(tb: &TransformBlock) -> bool {
    tb.coeffs.iter().any(|&c| c != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::IntraInfo;
    use crate::block::TxPartition;
    use crate::frame::TileLayout;
    use crate::mode::UvMode;
    use crate::size::PartitionType;
    use crate::testutil::MsacDecoder;

    const SB: BlockSize = BlockSize::Block64x64;

    fn tile<'a>(seq: &'a SequenceHeader, fh: &'a FrameHeader) -> TileEncoder<'a> {
        let layout = TileLayout::new(seq, 0, 0);
        let frame = FrameState::new(seq, fh, layout.mi_rows, layout.mi_cols);
        TileEncoder::new(frame, layout.tile(0), CdfContext::for_qidx(fh.quant.base_q_idx))
    }

    fn no_lr() -> [Vec<RestorationUnit>; 3] {
        Default::default()
    }

    /// The only in-frame 8x8 block of an 8x8 frame under a 64x64 superblock.
    fn tiny_tree(block: CodingBlock) -> PartitionTree {
        PartitionTree::Split(vec![PartitionTree::Split(vec![PartitionTree::Split(vec![
            PartitionTree::single(block),
        ])])])
    }

    fn coded_8x8(luma: TransformBlock, chroma: [TransformBlock; 2]) -> CodingBlock {
        let [u, v] = chroma;
        CodingBlock {
            tx: TxPartition::Uniform(TxSize::Tx8x8),
            residual: [vec![luma], vec![u], vec![v]],
            ..Default::default()
        }
    }

    fn dc_only(tx: TxSize, tx_type: TxType, dc: i32) -> TransformBlock {
        let mut tb = TransformBlock::zero(tx);
        tb.tx_type = tx_type;
        tb.coeffs[0] = dc;
        tb
    }

    #[test]
    fn skipped_superblock_starts_with_partition_skip_and_mode() {
        let seq = SequenceHeader::new(64, 64);
        let fh = FrameHeader::key_frame(100);
        let mut t = tile(&seq, &fh);
        let bits = t
            .encode_superblock(0, 0, &PartitionTree::single(CodingBlock::skipped(SB)), &no_lr())
            .unwrap();
        assert!(bits > 0);
        let out = t.finish();

        let mut cdfs = CdfContext::for_qidx(100);
        let mut dec = MsacDecoder::new(&out.data, true);
        assert_eq!(dec.decode_symbol(&mut cdfs.partition[12]), PartitionType::None as usize);
        assert!(dec.decode_bool(&mut cdfs.skip[0]));
        assert_eq!(dec.decode_symbol(&mut cdfs.kf_y_mode[0][0]), IntraMode::Dc as usize);
    }

    #[test]
    fn adapted_cdfs_come_back_with_the_tile() {
        let seq = SequenceHeader::new(64, 64);
        let fh = FrameHeader::key_frame(100);
        let mut t = tile(&seq, &fh);
        t.encode_superblock(0, 0, &PartitionTree::single(CodingBlock::skipped(SB)), &no_lr())
            .unwrap();
        let out = t.finish();
        assert_ne!(out.cdf.skip[0], CdfContext::for_qidx(100).skip[0]);
    }

    #[test]
    fn tree_must_match_the_partition_layout() {
        let seq = SequenceHeader::new(64, 64);
        let fh = FrameHeader::key_frame(100);
        let mut t = tile(&seq, &fh);
        let tree = PartitionTree::Leaf(PartitionType::Horz, vec![CodingBlock::skipped(SB)]);
        assert!(t.encode_superblock(0, 0, &tree, &no_lr()).is_err());
    }

    #[test]
    fn bottom_edge_drops_blocks_outside_the_frame() {
        let seq = SequenceHeader::new(64, 32);
        let fh = FrameHeader::key_frame(100);
        let mut t = tile(&seq, &fh);
        let horz = PartitionTree::Leaf(PartitionType::Horz, vec![CodingBlock::skipped(BlockSize::Block64x32)]);
        t.encode_superblock(0, 0, &horz, &no_lr()).unwrap();

        let mut t = tile(&seq, &fh);
        let none = PartitionTree::single(CodingBlock::skipped(SB));
        assert!(t.encode_superblock(0, 0, &none, &no_lr()).is_err());
    }

    #[test]
    fn inter_blocks_are_rejected_on_key_frames() {
        let seq = SequenceHeader::new(64, 64);
        let fh = FrameHeader::key_frame(100);
        let mut t = tile(&seq, &fh);
        let block = CodingBlock {
            skip: true,
            prediction: Prediction::Inter(InterInfo::new([RefFrame::Last, RefFrame::Intra], InterMode::GlobalMv)),
            ..Default::default()
        };
        let err = t
            .encode_superblock(0, 0, &PartitionTree::single(block), &no_lr())
            .unwrap_err();
        assert!(matches!(
            err,
            EntropyError::InvariantViolation { element: SyntaxElement::IsInter, .. }
        ));
    }

    #[test]
    fn delta_q_is_only_coded_at_the_superblock_origin() {
        let seq = SequenceHeader::new(64, 64);
        let mut fh = FrameHeader::key_frame(100);
        fh.delta_q_present = true;
        let block = |delta_q| CodingBlock {
            delta_q,
            ..CodingBlock::skipped(BlockSize::Block32x64)
        };

        let mut t = tile(&seq, &fh);
        let tree = PartitionTree::Leaf(PartitionType::Vert, vec![block(0), block(3)]);
        let err = t.encode_superblock(0, 0, &tree, &no_lr()).unwrap_err();
        assert!(matches!(
            err,
            EntropyError::InvariantViolation { element: SyntaxElement::DeltaQ, .. }
        ));

        let mut t = tile(&seq, &fh);
        let tree = PartitionTree::Leaf(PartitionType::Vert, vec![block(-4), block(0)]);
        t.encode_superblock(0, 0, &tree, &no_lr()).unwrap();
        assert_eq!(t.current_qindex, 96);

        let mut t = tile(&seq, &fh);
        let tree = PartitionTree::Leaf(PartitionType::Vert, vec![block(-100), block(0)]);
        assert!(t.encode_superblock(0, 0, &tree, &no_lr()).is_err());
    }

    #[test]
    fn skipped_blocks_carry_no_residual() {
        let seq = SequenceHeader::new(64, 64);
        let fh = FrameHeader::key_frame(100);
        let mut t = tile(&seq, &fh);
        let mut block = CodingBlock::skipped(SB);
        block.residual[0].push(TransformBlock::zero(TxSize::Tx64x64));
        assert!(t.encode_superblock(0, 0, &PartitionTree::single(block), &no_lr()).is_err());
    }

    #[test]
    fn coded_block_consumes_every_plane() {
        let seq = SequenceHeader::new(8, 8);
        let fh = FrameHeader::key_frame(100);
        let block = coded_8x8(
            dc_only(TxSize::Tx8x8, TxType::DctDct, 5),
            [dc_only(TxSize::Tx4x4, TxType::DctDct, -2), TransformBlock::zero(TxSize::Tx4x4)],
        );
        let mut t = tile(&seq, &fh);
        t.encode_superblock(0, 0, &tiny_tree(block.clone()), &no_lr()).unwrap();
        assert_ne!(t.ctx.coef_above[0].get(0), 0);
        assert_ne!(t.ctx.coef_above[1].get(0), 0);
        assert_eq!(t.ctx.coef_above[2].get(0), 0);

        let mut extra = block;
        extra.residual[0].push(TransformBlock::zero(TxSize::Tx8x8));
        let mut t = tile(&seq, &fh);
        assert!(t.encode_superblock(0, 0, &tiny_tree(extra), &no_lr()).is_err());
    }

    #[test]
    fn chroma_type_follows_the_intra_mode() {
        let seq = SequenceHeader::new(8, 8);
        let fh = FrameHeader::key_frame(100);
        let v_block = |uv_type| {
            let mut block = coded_8x8(
                TransformBlock::zero(TxSize::Tx8x8),
                [dc_only(TxSize::Tx4x4, uv_type, 3), TransformBlock::zero(TxSize::Tx4x4)],
            );
            block.prediction = Prediction::Intra(IntraInfo {
                y_mode: IntraMode::V,
                uv_mode: UvMode::Intra(IntraMode::V),
                ..Default::default()
            });
            block
        };

        let mut t = tile(&seq, &fh);
        t.encode_superblock(0, 0, &tiny_tree(v_block(TxType::AdstDct)), &no_lr())
            .unwrap();

        let mut t = tile(&seq, &fh);
        let err = t
            .encode_superblock(0, 0, &tiny_tree(v_block(TxType::DctDct)), &no_lr())
            .unwrap_err();
        assert!(matches!(
            err,
            EntropyError::InvariantViolation { element: SyntaxElement::TxType, .. }
        ));
    }

    #[test]
    fn lossless_luma_must_stay_dct() {
        let seq = SequenceHeader::new(8, 8);
        let fh = FrameHeader::key_frame(0);
        let mut block = coded_8x8(
            dc_only(TxSize::Tx4x4, TxType::AdstAdst, 1),
            [TransformBlock::zero(TxSize::Tx4x4), TransformBlock::zero(TxSize::Tx4x4)],
        );
        block.tx = TxPartition::Uniform(TxSize::Tx4x4);
        block.residual[0].extend((0..3).map(|_| TransformBlock::zero(TxSize::Tx4x4)));
        let mut t = tile(&seq, &fh);
        assert!(t.encode_superblock(0, 0, &tiny_tree(block), &no_lr()).is_err());
    }
}
