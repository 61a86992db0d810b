//! Luma transform size syntax and the edge contexts it maintains.

use crate::block::TxPartition;
use crate::cdf::CdfContext;
use crate::context::{Neighbors, txfm_partition_ctx};
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::frame::TxMode;
use crate::msac::MsacEncoder;
use crate::neighbor::LineContext;
use crate::size::{BlockSize, MAX_VARTX_DEPTH, TxSize};

/// One luma transform block, positioned in mi units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxLeaf {
    pub mi_row: u32,
    pub mi_col: u32,
    pub size: TxSize,
}

#[derive(Debug, Clone, Copy)]
pub struct TxParams {
    pub bsize: BlockSize,
    pub mi_row: u32,
    pub mi_col: u32,
    /// Rows and columns of the block inside the frame, in mi.
    pub rows_in_frame: u32,
    pub cols_in_frame: u32,
    pub tx_mode: TxMode,
    /// Inter or intra block copy.
    pub is_inter: bool,
    pub skip: bool,
    pub lossless: bool,
}

impl TxParams {
    fn signals_tx(&self) -> bool {
        self.tx_mode == TxMode::Select
            && self.bsize > BlockSize::Block4x4
            && !(self.is_inter && self.skip)
            && !self.lossless
    }

    fn implied_tx(&self) -> TxSize {
        if self.lossless || self.tx_mode == TxMode::Only4x4 {
            TxSize::Tx4x4
        } else {
            self.bsize.max_rect_tx_size()
        }
    }
}

/// Transform edge contexts along the tile's top and left, in samples.
pub struct TxfmEdges<'a> {
    pub above: &'a mut LineContext,
    pub left: &'a mut LineContext,
}

impl TxfmEdges<'_> {
    fn update(&mut self, mi_row: u32, mi_col: u32, tx: TxSize, area: TxSize) {
        self.above.fill(mi_col, area.width_mi(), tx.width() as u8);
        self.left.fill(mi_row, area.height_mi(), tx.height() as u8);
    }
}

fn tx_error(location: BlockLocation, reason: String) -> EntropyError {
    EntropyError::invariant(SyntaxElement::TxSize, location, reason)
}

/// Transform blocks of a uniform layout in coding order: 64x64 units in
/// raster order, then raster order inside each unit.
pub fn uniform_leaves(p: &TxParams, tx: TxSize) -> Vec<TxLeaf> {
    let (bw, bh) = (p.bsize.width_mi(), p.bsize.height_mi());
    let unit_w = bw.min(16);
    let unit_h = bh.min(16);
    let mut leaves = Vec::new();
    for row in (0..bh).step_by(unit_h as usize) {
        for col in (0..bw).step_by(unit_w as usize) {
            let row_end = (row + unit_h).min(p.rows_in_frame);
            let col_end = (col + unit_w).min(p.cols_in_frame);
            for r in (row..row_end).step_by(tx.height_mi() as usize) {
                for c in (col..col_end).step_by(tx.width_mi() as usize) {
                    leaves.push(TxLeaf { mi_row: p.mi_row + r, mi_col: p.mi_col + c, size: tx });
                }
            }
        }
    }
    leaves
}

/// Supplies the expected leaf at each node of the split trees.
struct LeafCursor<'a> {
    uniform: Option<TxSize>,
    list: &'a [TxSize],
    pos: usize,
}

impl<'a> LeafCursor<'a> {
    fn new(tx: &'a TxPartition) -> Self {
        match tx {
            TxPartition::Uniform(t) => Self { uniform: Some(*t), list: &[], pos: 0 },
            TxPartition::Variable(list) => Self { uniform: None, list, pos: 0 },
        }
    }

    fn is_leaf(&self, tx: TxSize) -> bool {
        match self.uniform {
            Some(u) => u == tx,
            None => self.list.get(self.pos) == Some(&tx),
        }
    }

    fn take(&mut self, tx: TxSize, location: BlockLocation) -> Result<()> {
        let next = self.uniform.or_else(|| self.list.get(self.pos).copied());
        if next != Some(tx) {
            return Err(tx_error(location, format!("split tree expects {tx:?}, layout has {next:?}")));
        }
        if self.uniform.is_none() {
            self.pos += 1;
        }
        Ok(())
    }

    fn finish(&self, location: BlockLocation) -> Result<()> {
        if self.uniform.is_none() && self.pos != self.list.len() {
            return Err(tx_error(
                location,
                format!("{} transform leaves left over", self.list.len() - self.pos),
            ));
        }
        Ok(())
    }
}

struct VarTx<'e, 'c, 'a> {
    enc: &'e mut MsacEncoder,
    cdfs: &'e mut CdfContext,
    edges: &'e mut TxfmEdges<'a>,
    cursor: LeafCursor<'c>,
    params: &'e TxParams,
    leaves: Vec<TxLeaf>,
    location: BlockLocation,
}

impl VarTx<'_, '_, '_> {
    fn node(&mut self, tx: TxSize, depth: u32, row: u32, col: u32) -> Result<()> {
        let p = self.params;
        if row >= p.rows_in_frame || col >= p.cols_in_frame {
            return Ok(());
        }
        let (mi_row, mi_col) = (p.mi_row + row, p.mi_col + col);
        if depth == MAX_VARTX_DEPTH || tx == TxSize::Tx4x4 {
            self.cursor.take(tx, self.location)?;
            self.edges.update(mi_row, mi_col, tx, tx);
            self.leaves.push(TxLeaf { mi_row, mi_col, size: tx });
            return Ok(());
        }

        let ctx = txfm_partition_ctx(self.edges.above.get(mi_col), self.edges.left.get(mi_row), p.bsize, tx);
        let leaf = self.cursor.is_leaf(tx);
        self.enc.encode_bool(!leaf, &mut self.cdfs.txfm_partition[ctx]);
        if leaf {
            self.cursor.take(tx, self.location)?;
            self.edges.update(mi_row, mi_col, tx, tx);
            self.leaves.push(TxLeaf { mi_row, mi_col, size: tx });
            return Ok(());
        }

        let sub = tx.sub_size();
        if sub == TxSize::Tx4x4 {
            self.edges.update(mi_row, mi_col, sub, tx);
            for r in row..(row + tx.height_mi()).min(p.rows_in_frame) {
                for c in col..(col + tx.width_mi()).min(p.cols_in_frame) {
                    self.cursor.take(sub, self.location)?;
                    self.leaves.push(TxLeaf { mi_row: p.mi_row + r, mi_col: p.mi_col + c, size: sub });
                }
            }
            return Ok(());
        }
        for r in (0..tx.height_mi()).step_by(sub.height_mi() as usize) {
            for c in (0..tx.width_mi()).step_by(sub.width_mi() as usize) {
                self.node(sub, depth + 1, row + r, col + c)?;
            }
        }
        Ok(())
    }
}

/// Codes the luma transform layout of a block, updates the edge contexts,
/// and returns the transform blocks in coding order.
pub fn write_tx_size(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    edges: &mut TxfmEdges<'_>,
    nb: &Neighbors,
    p: &TxParams,
    tx: &TxPartition,
    location: BlockLocation,
) -> Result<Vec<TxLeaf>> {
    let (bw, bh) = (p.bsize.width_mi(), p.bsize.height_mi());

    if p.signals_tx() && p.is_inter {
        let max_tx = p.bsize.max_rect_tx_size();
        let mut vartx = VarTx {
            enc,
            cdfs,
            edges,
            cursor: LeafCursor::new(tx),
            params: p,
            leaves: Vec::new(),
            location,
        };
        for row in (0..bh).step_by(max_tx.height_mi() as usize) {
            for col in (0..bw).step_by(max_tx.width_mi() as usize) {
                vartx.node(max_tx, 0, row, col)?;
            }
        }
        vartx.cursor.finish(location)?;
        return Ok(vartx.leaves);
    }

    let chosen = match tx {
        TxPartition::Uniform(t) => *t,
        TxPartition::Variable(_) => {
            return Err(tx_error(location, "split trees are only coded for inter blocks".into()));
        }
    };

    if p.signals_tx() {
        let max_tx = p.bsize.max_rect_tx_size();
        let max_depth = p.bsize.max_tx_depth();
        let depth = (0..=max_depth)
            .find(|&d| max_tx.split_depth(d) == chosen)
            .ok_or_else(|| tx_error(location, format!("{chosen:?} is not a split of {max_tx:?}")))?;
        let ctx = nb.tx_size_ctx(p.bsize, edges.above.get(p.mi_col), edges.left.get(p.mi_row));
        enc.encode_symbol(depth as usize, &mut cdfs.tx_size[p.bsize.tx_size_cat()][ctx]);
    } else if !(p.is_inter && p.skip) && chosen != p.implied_tx() {
        return Err(tx_error(
            location,
            format!("{chosen:?} where the frame implies {:?}", p.implied_tx()),
        ));
    }

    let used = if p.is_inter && p.skip { p.implied_tx() } else { chosen };
    if p.is_inter && p.skip {
        edges.above.fill(p.mi_col, bw, p.bsize.width() as u8);
        edges.left.fill(p.mi_row, bh, p.bsize.height() as u8);
    } else {
        edges.above.fill(p.mi_col, bw, used.width() as u8);
        edges.left.fill(p.mi_row, bh, used.height() as u8);
    }
    Ok(uniform_leaves(p, used))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::TXFM_CONTEXT_INIT;
    use crate::testutil::MsacDecoder;

    fn params(bsize: BlockSize, is_inter: bool) -> TxParams {
        TxParams {
            bsize,
            mi_row: 0,
            mi_col: 0,
            rows_in_frame: bsize.height_mi(),
            cols_in_frame: bsize.width_mi(),
            tx_mode: TxMode::Select,
            is_inter,
            skip: false,
            lossless: false,
        }
    }

    fn lines() -> (LineContext, LineContext) {
        (LineContext::new(0, 32, TXFM_CONTEXT_INIT), LineContext::new(0, 32, TXFM_CONTEXT_INIT))
    }

    #[test]
    fn uniform_leaves_walk_64x64_units() {
        let p = params(BlockSize::Block128x64, false);
        let leaves = uniform_leaves(&p, TxSize::Tx64x64);
        assert_eq!(leaves.len(), 2);
        assert_eq!((leaves[1].mi_row, leaves[1].mi_col), (0, 16));

        let mut clipped = params(BlockSize::Block16x16, false);
        clipped.cols_in_frame = 2;
        let leaves = uniform_leaves(&clipped, TxSize::Tx8x8);
        assert_eq!(leaves.len(), 2);
        assert!(leaves.iter().all(|l| l.mi_col == 0));
    }

    #[test]
    fn intra_depth_symbol_and_contexts() {
        let p = params(BlockSize::Block32x32, false);
        let (mut above, mut left) = lines();
        let mut edges = TxfmEdges { above: &mut above, left: &mut left };
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let leaves = write_tx_size(
            &mut enc,
            &mut cdfs,
            &mut edges,
            &Neighbors::default(),
            &p,
            &TxPartition::Uniform(TxSize::Tx8x8),
            BlockLocation::frame(),
        )
        .unwrap();
        assert_eq!(leaves.len(), 16);
        assert_eq!(above.get(0), 8);
        assert_eq!(left.get(7), 8);
        assert_eq!(above.get(8), TXFM_CONTEXT_INIT);

        let data = enc.finalize();
        let mut dec = MsacDecoder::new(&data, true);
        let mut cdfs = CdfContext::new();
        assert_eq!(dec.decode_symbol(&mut cdfs.tx_size[2][0]), 2);
    }

    #[test]
    fn intra_sizes_must_be_reachable() {
        let p = params(BlockSize::Block64x64, false);
        let (mut above, mut left) = lines();
        let mut edges = TxfmEdges { above: &mut above, left: &mut left };
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let res = write_tx_size(
            &mut enc,
            &mut cdfs,
            &mut edges,
            &Neighbors::default(),
            &p,
            &TxPartition::Uniform(TxSize::Tx8x8),
            BlockLocation::frame(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn split_tree_flags_decode_back() {
        let p = params(BlockSize::Block16x16, true);
        let tree = TxPartition::Variable(vec![
            TxSize::Tx8x8,
            TxSize::Tx4x4,
            TxSize::Tx4x4,
            TxSize::Tx4x4,
            TxSize::Tx4x4,
            TxSize::Tx8x8,
            TxSize::Tx8x8,
        ]);
        let (mut above, mut left) = lines();
        let mut edges = TxfmEdges { above: &mut above, left: &mut left };
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let leaves =
            write_tx_size(&mut enc, &mut cdfs, &mut edges, &Neighbors::default(), &p, &tree, BlockLocation::frame())
                .unwrap();
        assert_eq!(leaves.len(), 7);
        assert_eq!((leaves[1].mi_row, leaves[1].mi_col), (0, 2));
        assert_eq!((leaves[4].mi_row, leaves[4].mi_col), (1, 3));
        assert_eq!(above.get(0), 8);
        // the last 8x8 leaf sits under the split quadrant
        assert_eq!(above.get(2), 8);
        assert_eq!(left.get(0), 4);
        assert_eq!(left.get(1), 4);
        assert_eq!(left.get(2), 8);

        let data = enc.finalize();
        let mut dec = MsacDecoder::new(&data, true);
        let mut cdfs = CdfContext::new();
        // 16x16 root: split; first 8x8 kept; second 8x8 split to 4x4.
        assert!(dec.decode_bool(&mut cdfs.txfm_partition[txfm_partition_ctx(64, 64, p.bsize, TxSize::Tx16x16)]));
        assert!(!dec.decode_bool(&mut cdfs.txfm_partition[txfm_partition_ctx(64, 64, p.bsize, TxSize::Tx8x8)]));
        assert!(dec.decode_bool(&mut cdfs.txfm_partition[txfm_partition_ctx(64, 64, p.bsize, TxSize::Tx8x8)]));
    }

    #[test]
    fn split_tree_must_be_consumed_exactly() {
        let p = params(BlockSize::Block16x16, true);
        let (mut above, mut left) = lines();
        let mut edges = TxfmEdges { above: &mut above, left: &mut left };
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        let extra = TxPartition::Variable(vec![TxSize::Tx16x16, TxSize::Tx8x8]);
        let nb = Neighbors::default();
        let loc = BlockLocation::frame();
        assert!(write_tx_size(&mut enc, &mut cdfs, &mut edges, &nb, &p, &extra, loc).is_err());
        let wrong = TxPartition::Variable(vec![TxSize::Tx32x32]);
        assert!(write_tx_size(&mut enc, &mut cdfs, &mut edges, &nb, &p, &wrong, loc).is_err());
    }

    #[test]
    fn skipped_inter_blocks_record_block_size() {
        let mut p = params(BlockSize::Block32x16, true);
        p.skip = true;
        let (mut above, mut left) = lines();
        let mut edges = TxfmEdges { above: &mut above, left: &mut left };
        let mut enc = MsacEncoder::new();
        let mut cdfs = CdfContext::new();
        write_tx_size(
            &mut enc,
            &mut cdfs,
            &mut edges,
            &Neighbors::default(),
            &p,
            &TxPartition::default(),
            BlockLocation::frame(),
        )
        .unwrap();
        assert_eq!(above.get(0), 32);
        assert_eq!(left.get(0), 16);
    }
}
