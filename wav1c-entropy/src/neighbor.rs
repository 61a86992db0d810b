//! Causal state of already-coded blocks inside one tile.
//!
//! Positions are absolute 4x4 (mi) coordinates. Anything outside the tile
//! or not yet written reads back as `None`.

use crate::mode::{InterpFilter, IntraMode, RefFrame};
use crate::size::BlockSize;

/// Dense per-mi map over a rectangle of the frame.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    row0: u32,
    col0: u32,
    rows: u32,
    cols: u32,
    cells: Vec<Option<T>>,
}

impl<T: Copy> Grid<T> {
    pub fn new(row0: u32, col0: u32, rows: u32, cols: u32) -> Self {
        Self {
            row0,
            col0,
            rows,
            cols,
            cells: vec![None; (rows * cols) as usize],
        }
    }

    fn index(&self, row: u32, col: u32) -> Option<usize> {
        let r = row.checked_sub(self.row0)?;
        let c = col.checked_sub(self.col0)?;
        (r < self.rows && c < self.cols).then(|| (r * self.cols + c) as usize)
    }

    pub fn get(&self, row: u32, col: u32) -> Option<T> {
        self.index(row, col).and_then(|i| self.cells[i])
    }

    pub fn above(&self, row: u32, col: u32) -> Option<T> {
        row.checked_sub(1).and_then(|r| self.get(r, col))
    }

    pub fn left(&self, row: u32, col: u32) -> Option<T> {
        col.checked_sub(1).and_then(|c| self.get(row, c))
    }

    pub fn above_left(&self, row: u32, col: u32) -> Option<T> {
        row.checked_sub(1)
            .zip(col.checked_sub(1))
            .and_then(|(r, c)| self.get(r, c))
    }

    /// Writes `value` over `rows` x `cols` cells from (`row`, `col`),
    /// dropping whatever falls outside the grid.
    pub fn set(&mut self, row: u32, col: u32, rows: u32, cols: u32, value: T) {
        let r_end = (row + rows).min(self.row0 + self.rows);
        let c_end = (col + cols).min(self.col0 + self.cols);
        for r in row.max(self.row0)..r_end {
            for c in col.max(self.col0)..c_end {
                let i = ((r - self.row0) * self.cols + (c - self.col0)) as usize;
                self.cells[i] = Some(value);
            }
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(None);
    }
}

/// What later blocks need to know about a coded block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborInfo {
    pub bsize: BlockSize,
    /// Inter prediction, including intra block copy.
    pub is_inter: bool,
    pub skip: bool,
    pub skip_mode: bool,
    /// `Intra` in the second slot means a single reference.
    pub ref_frames: [RefFrame; 2],
    /// DC for inter and intra-block-copy blocks.
    pub y_mode: IntraMode,
    pub interp: [InterpFilter; 2],
    pub segment_id: u8,
}

impl NeighborInfo {
    pub fn has_second_ref(&self) -> bool {
        self.ref_frames[1].is_inter()
    }

    /// Compound prediction with both references on the same side.
    pub fn has_uni_comp_refs(&self) -> bool {
        self.has_second_ref()
            && self.ref_frames[0].is_backward() == self.ref_frames[1].is_backward()
    }
}

/// One row or column of byte contexts along a tile edge.
#[derive(Debug, Clone)]
pub struct LineContext {
    base: u32,
    init: u8,
    values: Vec<u8>,
}

/// Room past the tile end for blocks that overhang the frame.
const LINE_MARGIN: u32 = 32;

impl LineContext {
    pub fn new(base: u32, len: u32, init: u8) -> Self {
        Self {
            base,
            init,
            values: vec![init; (len + LINE_MARGIN) as usize],
        }
    }

    fn range(&self, pos: u32, len: u32) -> std::ops::Range<usize> {
        let n = self.values.len();
        let start = (pos.saturating_sub(self.base) as usize).min(n);
        let end = (start + len as usize).min(n);
        start..end
    }

    pub fn slice(&self, pos: u32, len: u32) -> &[u8] {
        &self.values[self.range(pos, len)]
    }

    pub fn get(&self, pos: u32) -> u8 {
        self.slice(pos, 1).first().copied().unwrap_or(self.init)
    }

    pub fn fill(&mut self, pos: u32, len: u32, value: u8) {
        let r = self.range(pos, len);
        self.values[r].fill(value);
    }

    pub fn reset(&mut self) {
        self.values.fill(self.init);
    }
}

/// Transform widths and heights seen along the edges, in samples.
pub const TXFM_CONTEXT_INIT: u8 = 64;

/// Neighbour state owned by one tile.
#[derive(Debug, Clone)]
pub struct NeighborState {
    pub blocks: Grid<NeighborInfo>,
    /// Coefficient context bytes per plane, in plane 4x4 units.
    pub coef_above: [LineContext; 3],
    pub coef_left: [LineContext; 3],
    /// Transform sizes in mi units.
    pub txfm_above: LineContext,
    pub txfm_left: LineContext,
}

impl NeighborState {
    /// State for a tile covering `rows` x `cols` mi from (`row0`, `col0`)
    /// with chroma subsampled by (`ssx`, `ssy`).
    pub fn new(row0: u32, col0: u32, rows: u32, cols: u32, ssx: u32, ssy: u32) -> Self {
        let above = |p: usize| {
            let s = if p == 0 { 0 } else { ssx };
            LineContext::new(col0 >> s, (cols >> s) + 1, 0)
        };
        let left = |p: usize| {
            let s = if p == 0 { 0 } else { ssy };
            LineContext::new(row0 >> s, (rows >> s) + 1, 0)
        };
        Self {
            blocks: Grid::new(row0, col0, rows, cols),
            coef_above: std::array::from_fn(above),
            coef_left: std::array::from_fn(left),
            txfm_above: LineContext::new(col0, cols, TXFM_CONTEXT_INIT),
            txfm_left: LineContext::new(row0, rows, TXFM_CONTEXT_INIT),
        }
    }

    pub fn reset(&mut self) {
        self.blocks.reset();
        for line in self.coef_above.iter_mut().chain(self.coef_left.iter_mut()) {
            line.reset();
        }
        self.txfm_above.reset();
        self.txfm_left.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_reads_none_outside_and_before_writes() {
        let mut g: Grid<u8> = Grid::new(16, 16, 16, 16);
        assert_eq!(g.get(16, 16), None);
        g.set(16, 16, 2, 2, 7);
        assert_eq!(g.get(17, 17), Some(7));
        assert_eq!(g.get(18, 16), None);
        assert_eq!(g.above(16, 16), None);
        assert_eq!(g.left(17, 18), Some(7));
        assert_eq!(g.above_left(18, 18), Some(7));
    }

    #[test]
    fn grid_set_clips_to_bounds() {
        let mut g: Grid<u8> = Grid::new(0, 0, 4, 4);
        g.set(2, 2, 8, 8, 1);
        assert_eq!(g.get(3, 3), Some(1));
        assert_eq!(g.get(4, 4), None);
        g.reset();
        assert_eq!(g.get(3, 3), None);
    }

    #[test]
    fn line_context_is_relative_to_tile_start() {
        let mut l = LineContext::new(32, 16, 64);
        l.fill(34, 4, 8);
        assert_eq!(l.slice(33, 3), &[64, 8, 8]);
        assert_eq!(l.get(38), 64);
        l.reset();
        assert_eq!(l.get(34), 64);
    }

    #[test]
    fn line_context_slices_never_overrun() {
        let l = LineContext::new(0, 4, 0);
        assert_eq!(l.slice(30, 16).len(), 6);
        assert!(l.slice(100, 4).is_empty());
    }

    #[test]
    fn uni_comp_needs_same_direction() {
        let mut n = NeighborInfo {
            bsize: BlockSize::Block8x8,
            is_inter: true,
            skip: false,
            skip_mode: false,
            ref_frames: [RefFrame::Last, RefFrame::Last3],
            y_mode: IntraMode::Dc,
            interp: [InterpFilter::Regular; 2],
            segment_id: 0,
        };
        assert!(n.has_uni_comp_refs());
        n.ref_frames = [RefFrame::Last, RefFrame::Alt];
        assert!(!n.has_uni_comp_refs());
        n.ref_frames = [RefFrame::Last, RefFrame::Intra];
        assert!(!n.has_second_ref());
    }
}
