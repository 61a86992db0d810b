//! Context selection from causal neighbour state.
//!
//! Every function here is pure: it reads what the above and left blocks
//! left behind and returns an index into the matching CDF family.

use crate::mode::RefFrame;
use crate::neighbor::NeighborInfo;
use crate::size::{BlockSize, TxSize};

/// Above and left neighbours of the block being coded, `None` when outside
/// the tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbors {
    pub above: Option<NeighborInfo>,
    pub left: Option<NeighborInfo>,
}

fn flag(n: Option<NeighborInfo>, f: impl Fn(&NeighborInfo) -> bool) -> usize {
    n.as_ref().is_some_and(f) as usize
}

impl Neighbors {
    pub fn new(above: Option<NeighborInfo>, left: Option<NeighborInfo>) -> Self {
        Self { above, left }
    }

    fn edge(&self) -> Option<NeighborInfo> {
        self.above.or(self.left)
    }

    /// `0..3`
    pub fn skip_ctx(&self) -> usize {
        flag(self.above, |n| n.skip) + flag(self.left, |n| n.skip)
    }

    /// `0..3`
    pub fn skip_mode_ctx(&self) -> usize {
        flag(self.above, |n| n.skip_mode) + flag(self.left, |n| n.skip_mode)
    }

    /// `0..4`
    pub fn intra_inter_ctx(&self) -> usize {
        match (self.above, self.left) {
            (Some(a), Some(l)) => {
                let (ai, li) = (!a.is_inter, !l.is_inter);
                if ai && li { 3 } else { (ai || li) as usize }
            }
            (Some(n), None) | (None, Some(n)) => 2 * (!n.is_inter) as usize,
            (None, None) => 0,
        }
    }

    /// Context of the single/compound choice, `0..5`.
    pub fn comp_inter_ctx(&self) -> usize {
        let bwd = |n: &NeighborInfo| n.ref_frames[0].is_backward();
        match (self.above, self.left) {
            (Some(a), Some(l)) => match (a.has_second_ref(), l.has_second_ref()) {
                (false, false) => (bwd(&a) ^ bwd(&l)) as usize,
                (false, true) => 2 + (bwd(&a) || !a.is_inter) as usize,
                (true, false) => 2 + (bwd(&l) || !l.is_inter) as usize,
                (true, true) => 4,
            },
            (Some(n), None) | (None, Some(n)) => {
                if n.has_second_ref() { 3 } else { bwd(&n) as usize }
            }
            (None, None) => 1,
        }
    }

    /// Context of the unidirectional/bidirectional compound choice, `0..5`.
    pub fn comp_ref_type_ctx(&self) -> usize {
        let bwd = |n: &NeighborInfo| n.ref_frames[0].is_backward();
        match (self.above, self.left) {
            (Some(a), Some(l)) => {
                let (ai, li) = (!a.is_inter, !l.is_inter);
                if ai && li {
                    2
                } else if ai || li {
                    let edge = if ai { l } else { a };
                    if !edge.has_second_ref() {
                        2
                    } else {
                        1 + 2 * edge.has_uni_comp_refs() as usize
                    }
                } else {
                    let (a_sg, l_sg) = (!a.has_second_ref(), !l.has_second_ref());
                    let same_dir = bwd(&a) == bwd(&l);
                    if a_sg && l_sg {
                        1 + 2 * same_dir as usize
                    } else if a_sg || l_sg {
                        let uni = if a_sg { l.has_uni_comp_refs() } else { a.has_uni_comp_refs() };
                        if uni { 3 + same_dir as usize } else { 1 }
                    } else {
                        match (a.has_uni_comp_refs(), l.has_uni_comp_refs()) {
                            (false, false) => 0,
                            (true, true) => {
                                let a_bwd = a.ref_frames[0] == RefFrame::Bwd;
                                let l_bwd = l.ref_frames[0] == RefFrame::Bwd;
                                3 + (a_bwd == l_bwd) as usize
                            }
                            _ => 2,
                        }
                    }
                }
            }
            (Some(n), None) | (None, Some(n)) => {
                if !n.is_inter || !n.has_second_ref() {
                    2
                } else {
                    4 * n.has_uni_comp_refs() as usize
                }
            }
            (None, None) => 2,
        }
    }

    pub fn ref_counts(&self) -> RefCounts {
        let mut counts = [0u8; 8];
        for n in [self.above, self.left].into_iter().flatten() {
            if n.is_inter {
                counts[n.ref_frames[0] as usize] += 1;
                if n.has_second_ref() {
                    counts[n.ref_frames[1] as usize] += 1;
                }
            }
        }
        RefCounts(counts)
    }

    /// Index into the flat partition table: four contexts per square size
    /// from 8x8 up.
    pub fn partition_ctx(&self, bsize: BlockSize) -> usize {
        let bsl = bsize.width_mi_log2();
        let above = flag(self.above, |n| n.bsize.width_mi_log2() < bsl);
        let left = flag(self.left, |n| n.bsize.height_mi_log2() < bsl);
        (bsl as usize - 1) * 4 + left * 2 + above
    }

    /// Above and left luma-mode buckets for key-frame mode coding.
    pub fn kf_y_mode_ctx(&self) -> (usize, usize) {
        let ctx = |n: Option<NeighborInfo>| n.map_or(0, |n| n.y_mode.kf_context());
        (ctx(self.above), ctx(self.left))
    }

    /// Switchable interpolation filter context for direction `dir`, `0..16`.
    pub fn interp_ctx(&self, dir: usize, ref_frames: [RefFrame; 2]) -> usize {
        const NONE: usize = 3;
        let base = 4 * ref_frames[1].is_inter() as usize + 8 * (dir & 1);
        let filter = |n: Option<NeighborInfo>| {
            n.filter(|n| n.ref_frames[0] == ref_frames[0] || n.ref_frames[1] == ref_frames[0])
                .map_or(NONE, |n| n.interp[dir & 1] as usize)
        };
        let (a, l) = (filter(self.above), filter(self.left));
        base + if a == l {
            l
        } else if l == NONE {
            a
        } else if a == NONE {
            l
        } else {
            NONE
        }
    }

    /// Intra transform-depth context, `0..3`. `above_w` and `left_h` are the
    /// transform extents recorded along the block's top and left edges.
    pub fn tx_size_ctx(&self, bsize: BlockSize, above_w: u8, left_h: u8) -> usize {
        let max_tx = bsize.max_rect_tx_size();
        let above = self.above.map(|n| {
            if n.is_inter { n.bsize.width() >= max_tx.width() } else { above_w as u32 >= max_tx.width() }
        });
        let left = self.left.map(|n| {
            if n.is_inter { n.bsize.height() >= max_tx.height() } else { left_h as u32 >= max_tx.height() }
        });
        above.unwrap_or(false) as usize + left.unwrap_or(false) as usize
    }
}

/// References used by the above and left blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefCounts([u8; 8]);

fn count_ctx(a: u32, b: u32) -> usize {
    match a.cmp(&b) {
        std::cmp::Ordering::Equal => 1,
        std::cmp::Ordering::Less => 0,
        std::cmp::Ordering::Greater => 2,
    }
}

impl RefCounts {
    fn n(&self, refs: &[RefFrame]) -> u32 {
        refs.iter().map(|&r| self.0[r as usize] as u32).sum()
    }

    /// Forward against backward references.
    pub fn fwd_bwd(&self) -> usize {
        use RefFrame::*;
        count_ctx(self.n(&[Last, Last2, Last3, Golden]), self.n(&[Bwd, Alt2, Alt]))
    }

    pub fn bwd_alt2_vs_alt(&self) -> usize {
        use RefFrame::*;
        count_ctx(self.n(&[Bwd, Alt2]), self.n(&[Alt]))
    }

    pub fn last_last2_vs_last3_golden(&self) -> usize {
        use RefFrame::*;
        count_ctx(self.n(&[Last, Last2]), self.n(&[Last3, Golden]))
    }

    pub fn last_vs_last2(&self) -> usize {
        count_ctx(self.n(&[RefFrame::Last]), self.n(&[RefFrame::Last2]))
    }

    pub fn last3_vs_golden(&self) -> usize {
        count_ctx(self.n(&[RefFrame::Last3]), self.n(&[RefFrame::Golden]))
    }

    pub fn bwd_vs_alt2(&self) -> usize {
        count_ctx(self.n(&[RefFrame::Bwd]), self.n(&[RefFrame::Alt2]))
    }

    pub fn last2_vs_last3_golden(&self) -> usize {
        use RefFrame::*;
        count_ctx(self.n(&[Last2]), self.n(&[Last3, Golden]))
    }
}

/// Transform split flag context, `0..21`. `above_w` and `left_h` are the
/// edge extents at the transform's own position.
pub fn txfm_partition_ctx(above_w: u8, left_h: u8, bsize: BlockSize, tx: TxSize) -> usize {
    if tx == TxSize::Tx4x4 {
        return 0;
    }
    let above = ((above_w as u32) < tx.width()) as usize;
    let left = ((left_h as u32) < tx.height()) as usize;
    let max_tx = TxSize::sqr_for_side(bsize.width().max(bsize.height()));
    let category = (tx.sqr_up() != max_tx && max_tx > TxSize::Tx8x8) as usize
        + (TxSize::Tx64x64 as usize - max_tx as usize) * 2;
    category * 3 + above + left
}

const REF_CAT_LEVEL: u32 = 640;

/// Context of the `idx`-th dynamic reference list flag, `0..3`.
pub fn drl_ctx(weights: &[u32; 4], idx: usize) -> usize {
    match (weights[idx] >= REF_CAT_LEVEL, weights[idx + 1] >= REF_CAT_LEVEL) {
        (true, true) => 0,
        (true, false) => 1,
        (false, false) => 2,
        (false, true) => 0,
    }
}

const NEWMV_CTX_MASK: u16 = 7;
const GLOBALMV_OFFSET: u16 = 3;
const GLOBALMV_CTX_MASK: u16 = 1;
const REFMV_OFFSET: u16 = 4;
const REFMV_CTX_MASK: u16 = 15;

pub fn newmv_ctx(mode_context: u16) -> usize {
    (mode_context & NEWMV_CTX_MASK) as usize
}

pub fn zeromv_ctx(mode_context: u16) -> usize {
    ((mode_context >> GLOBALMV_OFFSET) & GLOBALMV_CTX_MASK) as usize
}

pub fn refmv_ctx(mode_context: u16) -> usize {
    ((mode_context >> REFMV_OFFSET) & REFMV_CTX_MASK) as usize
}

#[rustfmt::skip]
const COMPOUND_MODE_CTX_MAP: [[u8; 5]; 3] = [
    [0, 1, 1, 1, 1],
    [1, 2, 3, 4, 4],
    [4, 4, 5, 6, 7],
];

/// Compound mode context; `None` when the packed context is out of range.
pub fn compound_mode_ctx(mode_context: u16) -> Option<usize> {
    let row = COMPOUND_MODE_CTX_MAP.get(refmv_ctx(mode_context) >> 1)?;
    Some(row[newmv_ctx(mode_context).min(4)] as usize)
}

/// Spatial segment-id prediction and the CDF it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPrediction {
    pub pred: u8,
    pub cdf_index: usize,
}

pub fn spatial_segment_pred(
    above_left: Option<u8>,
    above: Option<u8>,
    left: Option<u8>,
) -> SegmentPrediction {
    let cdf_index = match (above_left, above, left) {
        (Some(ul), Some(u), Some(l)) if ul == u && ul == l => 2,
        (Some(ul), Some(u), Some(l)) if ul == u || ul == l || u == l => 1,
        _ => 0,
    };
    let pred = match (above, left) {
        (None, None) => 0,
        (None, Some(l)) => l,
        (Some(u), None) => u,
        (Some(u), Some(l)) => {
            if above_left == Some(u) { u } else { l }
        }
    };
    SegmentPrediction { pred, cdf_index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{InterpFilter, IntraMode};

    fn intra(bsize: BlockSize) -> NeighborInfo {
        NeighborInfo {
            bsize,
            is_inter: false,
            skip: false,
            skip_mode: false,
            ref_frames: [RefFrame::Intra; 2],
            y_mode: IntraMode::Dc,
            interp: [InterpFilter::Regular; 2],
            segment_id: 0,
        }
    }

    fn inter(r0: RefFrame, r1: RefFrame) -> NeighborInfo {
        NeighborInfo {
            is_inter: true,
            ref_frames: [r0, r1],
            ..intra(BlockSize::Block16x16)
        }
    }

    #[test]
    fn skip_ctx_counts_skipped_neighbours() {
        let mut a = intra(BlockSize::Block8x8);
        a.skip = true;
        assert_eq!(Neighbors::new(Some(a), None).skip_ctx(), 1);
        assert_eq!(Neighbors::new(Some(a), Some(a)).skip_ctx(), 2);
        assert_eq!(Neighbors::default().skip_ctx(), 0);
    }

    #[test]
    fn intra_inter_ctx_cases() {
        let i = intra(BlockSize::Block8x8);
        let p = inter(RefFrame::Last, RefFrame::Intra);
        assert_eq!(Neighbors::new(Some(i), Some(i)).intra_inter_ctx(), 3);
        assert_eq!(Neighbors::new(Some(i), Some(p)).intra_inter_ctx(), 1);
        assert_eq!(Neighbors::new(Some(p), Some(p)).intra_inter_ctx(), 0);
        assert_eq!(Neighbors::new(None, Some(i)).intra_inter_ctx(), 2);
        assert_eq!(Neighbors::new(Some(p), None).intra_inter_ctx(), 0);
    }

    #[test]
    fn comp_inter_ctx_cases() {
        let fwd = inter(RefFrame::Last, RefFrame::Intra);
        let bwd = inter(RefFrame::Alt, RefFrame::Intra);
        let comp = inter(RefFrame::Last, RefFrame::Alt);
        assert_eq!(Neighbors::default().comp_inter_ctx(), 1);
        assert_eq!(Neighbors::new(Some(fwd), Some(bwd)).comp_inter_ctx(), 1);
        assert_eq!(Neighbors::new(Some(fwd), Some(fwd)).comp_inter_ctx(), 0);
        assert_eq!(Neighbors::new(Some(bwd), Some(comp)).comp_inter_ctx(), 3);
        assert_eq!(Neighbors::new(Some(comp), Some(comp)).comp_inter_ctx(), 4);
        assert_eq!(Neighbors::new(None, Some(comp)).comp_inter_ctx(), 3);
        let i = intra(BlockSize::Block8x8);
        assert_eq!(Neighbors::new(Some(comp), Some(i)).comp_inter_ctx(), 3);
    }

    #[test]
    fn comp_ref_type_ctx_cases() {
        let uni = inter(RefFrame::Last, RefFrame::Last2);
        let bi = inter(RefFrame::Last, RefFrame::Alt);
        let single = inter(RefFrame::Golden, RefFrame::Intra);
        let i = intra(BlockSize::Block8x8);
        assert_eq!(Neighbors::default().comp_ref_type_ctx(), 2);
        assert_eq!(Neighbors::new(Some(uni), None).comp_ref_type_ctx(), 4);
        assert_eq!(Neighbors::new(Some(bi), None).comp_ref_type_ctx(), 0);
        assert_eq!(Neighbors::new(Some(i), Some(uni)).comp_ref_type_ctx(), 3);
        assert_eq!(Neighbors::new(Some(single), Some(single)).comp_ref_type_ctx(), 3);
        assert_eq!(Neighbors::new(Some(bi), Some(bi)).comp_ref_type_ctx(), 0);
        assert_eq!(Neighbors::new(Some(uni), Some(bi)).comp_ref_type_ctx(), 2);
        assert_eq!(Neighbors::new(Some(single), Some(bi)).comp_ref_type_ctx(), 1);
    }

    #[test]
    fn ref_counts_compare_groups() {
        let a = inter(RefFrame::Last, RefFrame::Alt);
        let l = inter(RefFrame::Last, RefFrame::Intra);
        let counts = Neighbors::new(Some(a), Some(l)).ref_counts();
        assert_eq!(counts.fwd_bwd(), 2);
        assert_eq!(counts.last_vs_last2(), 2);
        assert_eq!(counts.last3_vs_golden(), 1);
        assert_eq!(counts.bwd_alt2_vs_alt(), 0);
    }

    #[test]
    fn partition_ctx_uses_size_class_offset() {
        let n = Neighbors::new(Some(intra(BlockSize::Block8x8)), Some(intra(BlockSize::Block32x32)));
        assert_eq!(n.partition_ctx(BlockSize::Block16x16), 4 + 1);
        assert_eq!(n.partition_ctx(BlockSize::Block64x64), 12 + 3);
        assert_eq!(Neighbors::default().partition_ctx(BlockSize::Block8x8), 0);
        assert_eq!(Neighbors::default().partition_ctx(BlockSize::Block128x128), 16);
    }

    #[test]
    fn interp_ctx_matches_reference_filters() {
        let mut a = inter(RefFrame::Last, RefFrame::Intra);
        a.interp = [InterpFilter::Smooth, InterpFilter::Sharp];
        let l = inter(RefFrame::Golden, RefFrame::Intra);
        let refs = [RefFrame::Last, RefFrame::Intra];
        let n = Neighbors::new(Some(a), Some(l));
        assert_eq!(n.interp_ctx(0, refs), 1);
        assert_eq!(n.interp_ctx(1, refs), 8 + 2);
        assert_eq!(Neighbors::default().interp_ctx(0, [RefFrame::Last, RefFrame::Alt]), 4 + 3);
    }

    #[test]
    fn tx_size_ctx_prefers_block_size_of_inter_neighbours() {
        let big = inter(RefFrame::Last, RefFrame::Intra);
        let n = Neighbors::new(Some(big), Some(intra(BlockSize::Block4x4)));
        assert_eq!(n.tx_size_ctx(BlockSize::Block16x16, 4, 16), 2);
        assert_eq!(n.tx_size_ctx(BlockSize::Block16x16, 4, 8), 1);
        assert_eq!(Neighbors::default().tx_size_ctx(BlockSize::Block16x16, 64, 64), 0);
    }

    #[test]
    fn txfm_partition_ctx_categories() {
        assert_eq!(txfm_partition_ctx(64, 64, BlockSize::Block64x64, TxSize::Tx64x64), 0);
        assert_eq!(txfm_partition_ctx(16, 64, BlockSize::Block64x64, TxSize::Tx32x32), 3 + 1);
        assert_eq!(txfm_partition_ctx(4, 4, BlockSize::Block8x8, TxSize::Tx8x8), 18 + 2);
        assert_eq!(txfm_partition_ctx(4, 4, BlockSize::Block8x8, TxSize::Tx4x4), 0);
    }

    #[test]
    fn drl_ctx_thresholds() {
        let w = [700, 700, 100, 0];
        assert_eq!(drl_ctx(&w, 0), 0);
        assert_eq!(drl_ctx(&w, 1), 1);
        assert_eq!(drl_ctx(&w, 2), 2);
    }

    #[test]
    fn mode_context_fields() {
        let ctx = (3 << REFMV_OFFSET) | (1 << GLOBALMV_OFFSET) | 5;
        assert_eq!(newmv_ctx(ctx), 5);
        assert_eq!(zeromv_ctx(ctx), 1);
        assert_eq!(refmv_ctx(ctx), 3);
        assert_eq!(compound_mode_ctx(ctx), Some(4));
        assert_eq!(compound_mode_ctx(15 << REFMV_OFFSET), None);
    }

    #[test]
    fn segment_prediction_votes() {
        assert_eq!(spatial_segment_pred(None, None, None), SegmentPrediction { pred: 0, cdf_index: 0 });
        assert_eq!(spatial_segment_pred(None, None, Some(3)).pred, 3);
        assert_eq!(spatial_segment_pred(Some(2), Some(2), Some(2)), SegmentPrediction { pred: 2, cdf_index: 2 });
        assert_eq!(spatial_segment_pred(Some(2), Some(2), Some(5)), SegmentPrediction { pred: 2, cdf_index: 1 });
        assert_eq!(spatial_segment_pred(Some(1), Some(2), Some(5)), SegmentPrediction { pred: 5, cdf_index: 0 });
    }
}
