//! Decided-mode records consumed by the tile coder.
//!
//! Everything here is produced upstream by mode decision. Block positions
//! and sizes are not stored on the blocks themselves: the partition tree
//! fixes both, and the traversal hands them down.

use crate::mode::{
    CflAlpha, FilterIntraMode, InterMode, InterpFilter, IntraMode, MotionMode, Mv, RefFrame,
    TxType, UvMode,
};
use crate::size::{BlockSize, PartitionType, TxSize};

/// Luma transform layout of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxPartition {
    /// One transform size repeated over the block.
    Uniform(TxSize),
    /// Leaves of the inter transform split trees, one tree per largest
    /// transform in raster order inside each 64x64 unit, depth first.
    /// Nodes starting outside the frame are left out.
    Variable(Vec<TxSize>),
}

impl Default for TxPartition {
    fn default() -> Self {
        TxPartition::Uniform(TxSize::Tx4x4)
    }
}

/// Quantized coefficients of one transform block, row-major over the
/// coded area (64-sample sides reduced to 32).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformBlock {
    pub tx_type: TxType,
    pub coeffs: Vec<i32>,
}

impl TransformBlock {
    pub fn new(tx_type: TxType, coeffs: Vec<i32>) -> Self {
        Self { tx_type, coeffs }
    }

    /// An all-zero block of the given size.
    pub fn zero(tx_size: TxSize) -> Self {
        let adj = tx_size.adjusted();
        Self {
            tx_type: TxType::DctDct,
            coeffs: vec![0; (adj.width() * adj.height()) as usize],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntraInfo {
    pub y_mode: IntraMode,
    /// Angle offset in `-3..=3`, used by directional modes from 8x8 up.
    pub y_angle_delta: i8,
    pub uv_mode: UvMode,
    pub uv_angle_delta: i8,
    pub cfl: CflAlpha,
    pub filter_intra: Option<FilterIntraMode>,
    pub use_palette: bool,
}

/// Motion-vector prediction state resolved upstream for the block's
/// reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MvPrediction {
    /// Packed new/global/ref-mv context.
    pub mode_context: u16,
    pub ref_mv_count: u8,
    /// Candidate weights of the first four stack entries.
    pub drl_weights: [u32; 4],
    /// Predictors the coded differences are taken against.
    pub ref_mv: [Mv; 2],
    pub num_proj_ref: u8,
    /// True when an above or left neighbour can drive OBMC.
    pub overlappable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterInfo {
    /// Second entry is `Intra` for single-reference prediction.
    pub ref_frames: [RefFrame; 2],
    pub mode: InterMode,
    pub drl_index: u8,
    pub mv: [Mv; 2],
    pub motion_mode: MotionMode,
    /// Filters in coded order: vertical, then horizontal.
    pub interp: [InterpFilter; 2],
    pub pred: MvPrediction,
}

impl InterInfo {
    /// Zero motion with simple prediction and regular filters.
    pub fn new(ref_frames: [RefFrame; 2], mode: InterMode) -> Self {
        Self {
            ref_frames,
            mode,
            drl_index: 0,
            mv: [Mv::ZERO; 2],
            motion_mode: MotionMode::Simple,
            interp: [InterpFilter::Regular; 2],
            pred: MvPrediction::default(),
        }
    }

    pub fn is_compound(&self) -> bool {
        self.ref_frames[1].is_inter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    Intra(IntraInfo),
    Inter(InterInfo),
    /// Intra block copy with a displacement vector and its predictor.
    IntraBc { dv: Mv, ref_dv: Mv },
}

impl Default for Prediction {
    fn default() -> Self {
        Prediction::Intra(IntraInfo::default())
    }
}

/// One leaf block of the partition tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodingBlock {
    pub segment_id: u8,
    pub skip: bool,
    pub skip_mode: bool,
    /// CDEF strength index for the enclosing 64x64 unit.
    pub cdef_idx: u8,
    /// Superblock quantizer delta in `delta_q_res` steps.
    pub delta_q: i32,
    pub prediction: Prediction,
    pub tx: TxPartition,
    /// Transform blocks per plane in coding order, in-frame only.
    pub residual: [Vec<TransformBlock>; 3],
}

impl CodingBlock {
    /// A skipped DC-predicted block of `bsize` at its largest transform.
    pub fn skipped(bsize: BlockSize) -> Self {
        Self {
            skip: true,
            tx: TxPartition::Uniform(bsize.max_rect_tx_size()),
            ..Default::default()
        }
    }

    pub fn is_inter(&self) -> bool {
        !matches!(self.prediction, Prediction::Intra(_))
    }
}

/// Partition tree of a superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionTree {
    /// Any non-split partition with its blocks in coding order. Blocks
    /// that would start outside the frame are left out.
    Leaf(PartitionType, Vec<CodingBlock>),
    /// Four quadrants in raster order, out-of-frame quadrants left out.
    Split(Vec<PartitionTree>),
}

impl PartitionTree {
    pub fn single(block: CodingBlock) -> Self {
        PartitionTree::Leaf(PartitionType::None, vec![block])
    }

    pub fn partition(&self) -> PartitionType {
        match self {
            PartitionTree::Leaf(p, _) => *p,
            PartitionTree::Split(_) => PartitionType::Split,
        }
    }
}

/// Wiener or self-guided filter choice of one restoration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorationUnit {
    #[default]
    None,
    /// Three taps per pass, vertical pass first. Chroma leaves tap 0 at 0.
    Wiener { coeffs: [[i8; 3]; 2] },
    Sgrproj { set: u8, xqd: [i8; 2] },
}

/// Everything mode decision produced for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameSyntax {
    /// Superblock trees in frame raster order.
    pub superblocks: Vec<PartitionTree>,
    /// Restoration units per plane, raster order over the frame.
    pub restoration: [Vec<RestorationUnit>; 3],
}
