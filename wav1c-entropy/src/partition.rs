//! Partition symbols and the block layout each partition produces.

use crate::cdf::{CDF_PROB_TOP, Cdf, CdfContext};
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::msac::MsacEncoder;
use crate::size::{BlockSize, PartitionType};

/// Position and size of one block produced by a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionBlock {
    pub mi_row: u32,
    pub mi_col: u32,
    pub bsize: BlockSize,
}

/// Frame extent in 4x4 units, used to drop blocks starting outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExtent {
    pub mi_rows: u32,
    pub mi_cols: u32,
}

impl FrameExtent {
    pub fn contains(&self, mi_row: u32, mi_col: u32) -> bool {
        mi_row < self.mi_rows && mi_col < self.mi_cols
    }

    /// Whether the lower and right halves of a square block are in frame.
    pub fn halves(&self, mi_row: u32, mi_col: u32, bsize: BlockSize) -> (bool, bool) {
        let hbs = bsize.width_mi() >> 1;
        (mi_row + hbs < self.mi_rows, mi_col + hbs < self.mi_cols)
    }
}

fn partition_error(location: BlockLocation, reason: String) -> EntropyError {
    EntropyError::invariant(SyntaxElement::Partition, location, reason)
}

const HORZ_ALIKE: [PartitionType; 6] = [
    PartitionType::Horz,
    PartitionType::Split,
    PartitionType::HorzA,
    PartitionType::HorzB,
    PartitionType::VertA,
    PartitionType::Horz4,
];

const VERT_ALIKE: [PartitionType; 6] = [
    PartitionType::Vert,
    PartitionType::Split,
    PartitionType::HorzA,
    PartitionType::VertA,
    PartitionType::VertB,
    PartitionType::Vert4,
];

/// Collapses a partition table into split-versus-other using the mass of
/// the partitions that would also split along the missing edge.
fn gather(cdf: &Cdf, alike: &[PartitionType; 6]) -> Cdf {
    let mass: u32 = alike
        .iter()
        .map(|&p| p as usize)
        .filter(|&s| s < cdf.symbols())
        .map(|s| cdf.probability(s) as u32)
        .sum();
    Cdf::from_icdf(&[mass.min(CDF_PROB_TOP as u32 - 1) as u16])
}

/// Codes the partition of a square block at (`mi_row`, `mi_col`).
///
/// Blocks smaller than 8x8 carry no symbol. Along the bottom and right frame
/// edges only a split decision is coded, and a corner block must split.
pub fn write_partition(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    ctx: usize,
    extent: FrameExtent,
    partition: PartitionType,
    location: BlockLocation,
) -> Result<()> {
    let Some(bsize) = location.bsize else {
        return Err(partition_error(location, "partition without a block size".into()));
    };
    if bsize < BlockSize::Block8x8 {
        if partition != PartitionType::None {
            return Err(partition_error(location, format!("{partition:?} below 8x8")));
        }
        return Ok(());
    }
    if !partition.is_allowed_for(bsize) {
        return Err(partition_error(location, format!("{partition:?} not allowed for {bsize:?}")));
    }
    let (has_rows, has_cols) = extent.halves(location.mi_row, location.mi_col, bsize);
    let split = partition == PartitionType::Split;
    match (has_rows, has_cols) {
        (true, true) => enc.encode_symbol(partition as usize, &mut cdfs.partition[ctx]),
        (false, true) => {
            if !split && partition != PartitionType::Horz {
                return Err(partition_error(location, format!("{partition:?} crosses the bottom edge")));
            }
            enc.encode_symbol_fixed(split as usize, &gather(&cdfs.partition[ctx], &VERT_ALIKE));
        }
        (true, false) => {
            if !split && partition != PartitionType::Vert {
                return Err(partition_error(location, format!("{partition:?} crosses the right edge")));
            }
            enc.encode_symbol_fixed(split as usize, &gather(&cdfs.partition[ctx], &HORZ_ALIKE));
        }
        (false, false) => {
            if !split {
                return Err(partition_error(location, format!("{partition:?} at a frame corner")));
            }
        }
    }
    Ok(())
}

/// Blocks a partition of the square `bsize` at (`mi_row`, `mi_col`) codes,
/// in coding order. For `Split` these are the quadrants to recurse into.
/// Blocks starting outside `extent` are left out.
pub fn partition_blocks(
    bsize: BlockSize,
    partition: PartitionType,
    mi_row: u32,
    mi_col: u32,
    extent: FrameExtent,
) -> Vec<PartitionBlock> {
    let Some(sub) = bsize.subsize(partition) else {
        return Vec::new();
    };
    let hbs = bsize.width_mi() >> 1;
    let qbs = hbs >> 1;
    let at = |dr: u32, dc: u32, bsize: BlockSize| PartitionBlock {
        mi_row: mi_row + dr,
        mi_col: mi_col + dc,
        bsize,
    };
    let square = bsize.subsize(PartitionType::Split);
    let blocks = match (partition, square) {
        (PartitionType::None, _) => vec![at(0, 0, sub)],
        (PartitionType::Horz, _) => vec![at(0, 0, sub), at(hbs, 0, sub)],
        (PartitionType::Vert, _) => vec![at(0, 0, sub), at(0, hbs, sub)],
        (PartitionType::Split, _) => vec![at(0, 0, sub), at(0, hbs, sub), at(hbs, 0, sub), at(hbs, hbs, sub)],
        (PartitionType::HorzA, Some(q)) => vec![at(0, 0, q), at(0, hbs, q), at(hbs, 0, sub)],
        (PartitionType::HorzB, Some(q)) => vec![at(0, 0, sub), at(hbs, 0, q), at(hbs, hbs, q)],
        (PartitionType::VertA, Some(q)) => vec![at(0, 0, q), at(hbs, 0, q), at(0, hbs, sub)],
        (PartitionType::VertB, Some(q)) => vec![at(0, 0, sub), at(0, hbs, q), at(hbs, hbs, q)],
        (PartitionType::Horz4, _) => (0..4).map(|i| at(i * qbs, 0, sub)).collect(),
        (PartitionType::Vert4, _) => (0..4).map(|i| at(0, i * qbs, sub)).collect(),
        _ => Vec::new(),
    };
    blocks
        .into_iter()
        .filter(|b| extent.contains(b.mi_row, b.mi_col))
        .collect()
}
