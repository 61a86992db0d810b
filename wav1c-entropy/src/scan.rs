//! Coefficient scan orders and the position tables the level contexts use.
//!
//! Positions are row-major within the coded (64-reduced) transform, so
//! `pos = row * width + col`.

use std::sync::OnceLock;

use crate::mode::{TxClass, TxType};
use crate::size::TxSize;

const SCAN_KINDS: usize = 3;

fn scan_kind(class: TxClass) -> usize {
    match class {
        TxClass::TwoD => 0,
        TxClass::Vert => 1,
        TxClass::Horiz => 2,
    }
}

fn build_default(w: usize, h: usize) -> Vec<u16> {
    let mut scan = Vec::with_capacity(w * h);
    for d in 0..(w + h - 1) {
        let lo = d.saturating_sub(w - 1);
        let hi = d.min(h - 1);
        let ascending = if w == h { d % 2 == 1 } else { w < h };
        for i in 0..=(hi - lo) {
            let row = if ascending { lo + i } else { hi - i };
            let col = d - row;
            scan.push((row * w + col) as u16);
        }
    }
    scan
}

fn build_row(w: usize, h: usize) -> Vec<u16> {
    (0..(w * h) as u16).collect()
}

fn build_col(w: usize, h: usize) -> Vec<u16> {
    let mut scan = Vec::with_capacity(w * h);
    for col in 0..w {
        for row in 0..h {
            scan.push((row * w + col) as u16);
        }
    }
    scan
}

fn tables() -> &'static Vec<Vec<u16>> {
    static TABLES: OnceLock<Vec<Vec<u16>>> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut out = Vec::with_capacity(TxSize::all().len() * SCAN_KINDS);
        for &tx in TxSize::all() {
            let adj = tx.adjusted();
            let (w, h) = (adj.width() as usize, adj.height() as usize);
            out.push(build_default(w, h));
            out.push(build_row(w, h));
            out.push(build_col(w, h));
        }
        out
    })
}

/// Scan order for a transform block. Identity and the 2D kernels use the
/// diagonal order; vertical 1D kernels scan rows, horizontal ones columns.
pub fn scan_order(tx_size: TxSize, tx_type: TxType) -> &'static [u16] {
    &tables()[tx_size as usize * SCAN_KINDS + scan_kind(tx_type.class())]
}

#[rustfmt::skip]
const BASE_CTX_OFFSET_SQUARE: [[u8; 5]; 5] = [
    [ 0,  1,  6,  6, 21],
    [ 1,  6,  6, 21, 21],
    [ 6,  6, 21, 21, 21],
    [ 6, 21, 21, 21, 21],
    [21, 21, 21, 21, 21],
];

#[rustfmt::skip]
const BASE_CTX_OFFSET_WIDE: [[u8; 5]; 5] = [
    [ 0, 16,  6,  6, 21],
    [16, 16,  6, 21, 21],
    [16, 16, 21, 21, 21],
    [16, 16, 21, 21, 21],
    [16, 16, 21, 21, 21],
];

#[rustfmt::skip]
const BASE_CTX_OFFSET_TALL: [[u8; 5]; 5] = [
    [ 0, 11, 11, 11, 11],
    [11, 11, 11, 11, 11],
    [ 6,  6, 21, 21, 21],
    [ 6, 21, 21, 21, 21],
    [21, 21, 21, 21, 21],
];

/// Context offset of a 2D-class coefficient at (`row`, `col`).
pub fn base_ctx_offset(tx_size: TxSize, row: usize, col: usize) -> usize {
    let table = match tx_size.width_log2().cmp(&tx_size.height_log2()) {
        std::cmp::Ordering::Equal => &BASE_CTX_OFFSET_SQUARE,
        std::cmp::Ordering::Greater => &BASE_CTX_OFFSET_WIDE,
        std::cmp::Ordering::Less => &BASE_CTX_OFFSET_TALL,
    };
    table[row.min(4)][col.min(4)] as usize
}

pub const SIG_COEF_CONTEXTS_2D: usize = 26;

/// 1D-class context offsets by distance from the first row or column.
pub const BASE_POS_CTX_OFFSET: [usize; 3] =
    [SIG_COEF_CONTEXTS_2D, SIG_COEF_CONTEXTS_2D + 5, SIG_COEF_CONTEXTS_2D + 10];

/// Neighbours (row, col) summed for the base-level context.
pub fn sig_ref_offsets(class: TxClass) -> &'static [(usize, usize); 5] {
    match class {
        TxClass::TwoD => &[(0, 1), (1, 0), (1, 1), (0, 2), (2, 0)],
        TxClass::Horiz => &[(0, 1), (1, 0), (0, 2), (0, 3), (0, 4)],
        TxClass::Vert => &[(0, 1), (1, 0), (2, 0), (3, 0), (4, 0)],
    }
}

/// Neighbours (row, col) summed for the range context.
pub fn br_ref_offsets(class: TxClass) -> &'static [(usize, usize); 3] {
    match class {
        TxClass::TwoD => &[(0, 1), (1, 0), (1, 1)],
        TxClass::Horiz => &[(0, 1), (1, 0), (0, 2)],
        TxClass::Vert => &[(0, 1), (1, 0), (2, 0)],
    }
}

/// First end-of-block value in each position group.
pub const EOB_GROUP_START: [u16; 12] = [0, 1, 2, 3, 5, 9, 17, 33, 65, 129, 257, 513];

/// Position group of a 1-based end-of-block count.
pub fn eob_pos_token(eob: u16) -> usize {
    EOB_GROUP_START
        .iter()
        .rposition(|&start| start <= eob)
        .unwrap_or(0)
}

/// Number of extra bits refining a position group.
pub fn eob_offset_bits(token: usize) -> u32 {
    token.saturating_sub(2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(scan: &[u16]) -> bool {
        let mut seen = vec![false; scan.len()];
        for &p in scan {
            let p = p as usize;
            if p >= seen.len() || seen[p] {
                return false;
            }
            seen[p] = true;
        }
        true
    }

    #[test]
    fn square_4x4_zigzag() {
        assert_eq!(
            scan_order(TxSize::Tx4x4, TxType::DctDct),
            &[0, 1, 4, 8, 5, 2, 3, 6, 9, 12, 13, 10, 7, 11, 14, 15]
        );
    }

    #[test]
    fn wide_diagonals_start_at_bottom_row() {
        let scan = scan_order(TxSize::Tx8x4, TxType::DctDct);
        assert_eq!(&scan[..6], &[0, 8, 1, 16, 9, 2]);
    }

    #[test]
    fn tall_diagonals_start_at_top_row() {
        let scan = scan_order(TxSize::Tx4x8, TxType::DctDct);
        assert_eq!(&scan[..10], &[0, 1, 4, 2, 5, 8, 3, 6, 9, 12]);
    }

    #[test]
    fn one_dimensional_classes_scan_rows_or_columns() {
        assert_eq!(scan_order(TxSize::Tx4x4, TxType::VDct)[..5], [0, 1, 2, 3, 4]);
        assert_eq!(scan_order(TxSize::Tx4x4, TxType::HDct)[..5], [0, 4, 8, 12, 1]);
    }

    #[test]
    fn every_scan_is_a_permutation_of_the_coded_area() {
        for &tx in TxSize::all() {
            for t in [TxType::DctDct, TxType::VDct, TxType::HDct] {
                let scan = scan_order(tx, t);
                let adj = tx.adjusted();
                assert_eq!(scan.len(), (adj.width() * adj.height()) as usize);
                assert!(is_permutation(scan), "{tx:?} {t:?}");
            }
        }
    }

    #[test]
    fn context_neighbours_always_come_later_in_scan() {
        for &tx in TxSize::all() {
            let adj = tx.adjusted();
            let (w, h) = (adj.width() as usize, adj.height() as usize);
            for t in [TxType::DctDct, TxType::VDct, TxType::HDct] {
                let scan = scan_order(tx, t);
                let mut order = vec![0usize; scan.len()];
                for (i, &p) in scan.iter().enumerate() {
                    order[p as usize] = i;
                }
                for pos in 0..w * h {
                    let (r, c) = (pos / w, pos % w);
                    for &(dr, dc) in sig_ref_offsets(t.class()) {
                        if r + dr < h && c + dc < w {
                            assert!(order[(r + dr) * w + c + dc] > order[pos]);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn eob_tokens_follow_group_starts() {
        assert_eq!(eob_pos_token(1), 1);
        assert_eq!(eob_pos_token(2), 2);
        assert_eq!(eob_pos_token(4), 3);
        assert_eq!(eob_pos_token(5), 4);
        assert_eq!(eob_pos_token(1024), 11);
        assert_eq!(eob_offset_bits(11), 9);
    }
}
