//! Block, transform and partition geometry.

pub const MI_SIZE: u32 = 4;
pub const MI_SIZE_LOG2: u32 = 2;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockSize {
    Block4x4 = 0,
    Block4x8,
    Block8x4,
    Block8x8,
    Block8x16,
    Block16x8,
    Block16x16,
    Block16x32,
    Block32x16,
    Block32x32,
    Block32x64,
    Block64x32,
    Block64x64,
    Block64x128,
    Block128x64,
    Block128x128,
    Block4x16,
    Block16x4,
    Block8x32,
    Block32x8,
    Block16x64,
    Block64x16,
}

use BlockSize::*;

#[rustfmt::skip]
const BLOCK_LOG2: [(u8, u8); 22] = [
    (2, 2), (2, 3), (3, 2), (3, 3), (3, 4), (4, 3), (4, 4), (4, 5), (5, 4), (5, 5), (5, 6),
    (6, 5), (6, 6), (6, 7), (7, 6), (7, 7), (2, 4), (4, 2), (3, 5), (5, 3), (4, 6), (6, 4),
];

#[rustfmt::skip]
const ALL_BLOCK_SIZES: [BlockSize; 22] = [
    Block4x4, Block4x8, Block8x4, Block8x8, Block8x16, Block16x8, Block16x16, Block16x32,
    Block32x16, Block32x32, Block32x64, Block64x32, Block64x64, Block64x128, Block128x64,
    Block128x128, Block4x16, Block16x4, Block8x32, Block32x8, Block16x64, Block64x16,
];

#[rustfmt::skip]
const SIZE_GROUP: [u8; 22] = [0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 0, 0, 1, 1, 2, 2];

impl BlockSize {
    pub fn from_log2(w_log2: u32, h_log2: u32) -> Option<Self> {
        BLOCK_LOG2
            .iter()
            .position(|&(w, h)| w as u32 == w_log2 && h as u32 == h_log2)
            .map(|i| ALL_BLOCK_SIZES[i])
    }

    pub fn width_log2(self) -> u32 {
        BLOCK_LOG2[self as usize].0 as u32
    }

    pub fn height_log2(self) -> u32 {
        BLOCK_LOG2[self as usize].1 as u32
    }

    pub fn width(self) -> u32 {
        1 << self.width_log2()
    }

    pub fn height(self) -> u32 {
        1 << self.height_log2()
    }

    /// Width in 4x4 units.
    pub fn width_mi(self) -> u32 {
        self.width() >> MI_SIZE_LOG2
    }

    pub fn height_mi(self) -> u32 {
        self.height() >> MI_SIZE_LOG2
    }

    pub fn width_mi_log2(self) -> u32 {
        self.width_log2() - MI_SIZE_LOG2
    }

    pub fn height_mi_log2(self) -> u32 {
        self.height_log2() - MI_SIZE_LOG2
    }

    pub fn pels_log2(self) -> u32 {
        self.width_log2() + self.height_log2()
    }

    pub fn is_sqr(self) -> bool {
        self.width_log2() == self.height_log2()
    }

    pub fn size_group(self) -> usize {
        SIZE_GROUP[self as usize] as usize
    }

    /// Compound prediction needs both sides of at least 8.
    pub fn is_comp_ref_allowed(self) -> bool {
        self.width().min(self.height()) >= 8
    }

    pub fn subsize(self, partition: PartitionType) -> Option<BlockSize> {
        let (w, h) = (self.width_log2(), self.height_log2());
        let (sw, sh) = match partition {
            PartitionType::None => (w, h),
            PartitionType::Horz | PartitionType::HorzA | PartitionType::HorzB => (w, h.checked_sub(1)?),
            PartitionType::Vert | PartitionType::VertA | PartitionType::VertB => (w.checked_sub(1)?, h),
            PartitionType::Split => (w.checked_sub(1)?, h.checked_sub(1)?),
            PartitionType::Horz4 => (w, h.checked_sub(2)?),
            PartitionType::Vert4 => (w.checked_sub(2)?, h),
        };
        BlockSize::from_log2(sw, sh)
    }

    /// Size of the block in a plane subsampled by `ssx`/`ssy`, at least 4x4.
    pub fn plane_size(self, ssx: u32, ssy: u32) -> Option<BlockSize> {
        let w = self.width_log2().saturating_sub(ssx).max(2);
        let h = self.height_log2().saturating_sub(ssy).max(2);
        BlockSize::from_log2(w, h)
    }

    /// Largest rectangular transform fitting the block.
    pub fn max_rect_tx_size(self) -> TxSize {
        let w = self.width_log2().min(6);
        let h = self.height_log2().min(6);
        TxSize::from_log2(w, h).unwrap_or(TxSize::Tx4x4)
    }

    /// Splits from the largest transform down to 4x4.
    pub fn tx_depth_to_4x4(self) -> u32 {
        let mut tx = self.max_rect_tx_size();
        let mut depth = 0;
        while tx != TxSize::Tx4x4 {
            tx = tx.sub_size();
            depth += 1;
        }
        depth
    }

    /// Depth limit of the intra transform-size symbol.
    pub fn max_tx_depth(self) -> u32 {
        self.tx_depth_to_4x4().min(MAX_TX_DEPTH)
    }

    pub fn tx_size_cat(self) -> usize {
        self.tx_depth_to_4x4().saturating_sub(1) as usize
    }

    pub fn all() -> &'static [BlockSize; 22] {
        &ALL_BLOCK_SIZES
    }
}

pub const MAX_TX_DEPTH: u32 = 2;
pub const MAX_VARTX_DEPTH: u32 = 2;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TxSize {
    Tx4x4 = 0,
    Tx8x8,
    Tx16x16,
    Tx32x32,
    Tx64x64,
    Tx4x8,
    Tx8x4,
    Tx8x16,
    Tx16x8,
    Tx16x32,
    Tx32x16,
    Tx32x64,
    Tx64x32,
    Tx4x16,
    Tx16x4,
    Tx8x32,
    Tx32x8,
    Tx16x64,
    Tx64x16,
}

#[rustfmt::skip]
const TX_LOG2: [(u8, u8); 19] = [
    (2, 2), (3, 3), (4, 4), (5, 5), (6, 6), (2, 3), (3, 2), (3, 4), (4, 3), (4, 5),
    (5, 4), (5, 6), (6, 5), (2, 4), (4, 2), (3, 5), (5, 3), (4, 6), (6, 4),
];

#[rustfmt::skip]
const ALL_TX_SIZES: [TxSize; 19] = [
    TxSize::Tx4x4, TxSize::Tx8x8, TxSize::Tx16x16, TxSize::Tx32x32, TxSize::Tx64x64,
    TxSize::Tx4x8, TxSize::Tx8x4, TxSize::Tx8x16, TxSize::Tx16x8, TxSize::Tx16x32,
    TxSize::Tx32x16, TxSize::Tx32x64, TxSize::Tx64x32, TxSize::Tx4x16, TxSize::Tx16x4,
    TxSize::Tx8x32, TxSize::Tx32x8, TxSize::Tx16x64, TxSize::Tx64x16,
];

impl TxSize {
    pub fn from_log2(w_log2: u32, h_log2: u32) -> Option<Self> {
        TX_LOG2
            .iter()
            .position(|&(w, h)| w as u32 == w_log2 && h as u32 == h_log2)
            .map(|i| ALL_TX_SIZES[i])
    }

    pub fn width_log2(self) -> u32 {
        TX_LOG2[self as usize].0 as u32
    }

    pub fn height_log2(self) -> u32 {
        TX_LOG2[self as usize].1 as u32
    }

    pub fn width(self) -> u32 {
        1 << self.width_log2()
    }

    pub fn height(self) -> u32 {
        1 << self.height_log2()
    }

    pub fn width_mi(self) -> u32 {
        self.width() >> MI_SIZE_LOG2
    }

    pub fn height_mi(self) -> u32 {
        self.height() >> MI_SIZE_LOG2
    }

    /// Square transform of the shorter side.
    pub fn sqr(self) -> TxSize {
        let l = self.width_log2().min(self.height_log2());
        ALL_TX_SIZES[(l - 2) as usize]
    }

    /// Square transform of the longer side.
    pub fn sqr_up(self) -> TxSize {
        let l = self.width_log2().max(self.height_log2());
        ALL_TX_SIZES[(l - 2) as usize]
    }

    /// Coefficient table selector: average of the square bounds.
    pub fn txs_ctx(self) -> usize {
        (self.sqr() as usize + self.sqr_up() as usize + 1) >> 1
    }

    /// Size after one split step.
    pub fn sub_size(self) -> TxSize {
        let (w, h) = (self.width_log2(), self.height_log2());
        let (sw, sh) = if w == h {
            (w.saturating_sub(1).max(2), h.saturating_sub(1).max(2))
        } else if w.abs_diff(h) == 1 {
            (w.min(h), w.min(h))
        } else if w > h {
            (w - 1, h)
        } else {
            (w, h - 1)
        };
        TxSize::from_log2(sw, sh).unwrap_or(TxSize::Tx4x4)
    }

    /// Transform actually coded: 64-sample sides are reduced to 32.
    pub fn adjusted(self) -> TxSize {
        TxSize::from_log2(self.width_log2().min(5), self.height_log2().min(5)).unwrap_or(self)
    }

    pub fn is_rect(self) -> bool {
        self.width_log2() != self.height_log2()
    }

    pub fn to_block_size(self) -> BlockSize {
        BlockSize::from_log2(self.width_log2(), self.height_log2()).unwrap_or(BlockSize::Block4x4)
    }

    /// Square transform whose side is the largest square at most `side` samples.
    pub fn sqr_for_side(side: u32) -> TxSize {
        match side {
            64.. => TxSize::Tx64x64,
            32..=63 => TxSize::Tx32x32,
            16..=31 => TxSize::Tx16x16,
            8..=15 => TxSize::Tx8x8,
            _ => TxSize::Tx4x4,
        }
    }

    /// Transform after `depth` uniform split steps from `self`.
    pub fn split_depth(self, depth: u32) -> TxSize {
        (0..depth).fold(self, |tx, _| tx.sub_size())
    }

    pub fn all() -> &'static [TxSize; 19] {
        &ALL_TX_SIZES
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionType {
    None = 0,
    Horz,
    Vert,
    Split,
    HorzA,
    HorzB,
    VertA,
    VertB,
    Horz4,
    Vert4,
}

impl PartitionType {
    pub fn from_symbol(symbol: usize) -> Option<Self> {
        use PartitionType::*;
        [None, Horz, Vert, Split, HorzA, HorzB, VertA, VertB, Horz4, Vert4]
            .get(symbol)
            .copied()
    }

    /// Number of partition symbols coded for a square block size.
    pub fn symbol_count(bsize: BlockSize) -> usize {
        match bsize {
            BlockSize::Block8x8 => 4,
            BlockSize::Block128x128 => 8,
            _ => 10,
        }
    }

    pub fn is_allowed_for(self, bsize: BlockSize) -> bool {
        (self as usize) < Self::symbol_count(bsize)
    }
}

/// True when a block at (`mi_row`, `mi_col`) carries the chroma of its area.
pub fn is_chroma_reference(mi_row: u32, mi_col: u32, bsize: BlockSize, ssx: u32, ssy: u32) -> bool {
    let bw = bsize.width_mi();
    let bh = bsize.height_mi();
    ((mi_row & 1) == 1 || (bh & 1) == 0 || ssy == 0) && ((mi_col & 1) == 1 || (bw & 1) == 0 || ssx == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_dimensions() {
        assert_eq!(Block64x16.width(), 64);
        assert_eq!(Block64x16.height(), 16);
        assert_eq!(Block128x128.width_mi(), 32);
        assert_eq!(Block4x4.pels_log2(), 4);
    }

    #[test]
    fn subsizes_follow_partition() {
        assert_eq!(Block64x64.subsize(PartitionType::Horz), Some(Block64x32));
        assert_eq!(Block64x64.subsize(PartitionType::VertA), Some(Block32x64));
        assert_eq!(Block64x64.subsize(PartitionType::Horz4), Some(Block64x16));
        assert_eq!(Block16x16.subsize(PartitionType::Vert4), Some(Block4x16));
        assert_eq!(Block8x8.subsize(PartitionType::Split), Some(Block4x4));
        assert_eq!(Block8x8.subsize(PartitionType::Horz4), None);
        assert_eq!(Block128x128.subsize(PartitionType::Vert4), None);
    }

    #[test]
    fn max_rect_tx_caps_at_64() {
        assert_eq!(Block128x128.max_rect_tx_size(), TxSize::Tx64x64);
        assert_eq!(Block128x64.max_rect_tx_size(), TxSize::Tx64x64);
        assert_eq!(Block16x64.max_rect_tx_size(), TxSize::Tx16x64);
        assert_eq!(Block4x16.max_rect_tx_size(), TxSize::Tx4x16);
    }

    #[test]
    fn tx_sub_sizes() {
        assert_eq!(TxSize::Tx64x64.sub_size(), TxSize::Tx32x32);
        assert_eq!(TxSize::Tx16x32.sub_size(), TxSize::Tx16x16);
        assert_eq!(TxSize::Tx4x16.sub_size(), TxSize::Tx4x8);
        assert_eq!(TxSize::Tx64x16.sub_size(), TxSize::Tx32x16);
        assert_eq!(TxSize::Tx4x8.sub_size(), TxSize::Tx4x4);
        assert_eq!(TxSize::Tx4x4.sub_size(), TxSize::Tx4x4);
    }

    #[test]
    fn tx_size_categories() {
        assert_eq!(Block8x8.tx_size_cat(), 0);
        assert_eq!(Block8x8.max_tx_depth(), 1);
        assert_eq!(Block64x64.tx_size_cat(), 3);
        assert_eq!(Block64x64.max_tx_depth(), 2);
        assert_eq!(Block16x64.tx_size_cat(), 3);
    }

    #[test]
    fn txs_ctx_averages_square_bounds() {
        assert_eq!(TxSize::Tx4x4.txs_ctx(), 0);
        assert_eq!(TxSize::Tx4x8.txs_ctx(), 1);
        assert_eq!(TxSize::Tx4x16.txs_ctx(), 1);
        assert_eq!(TxSize::Tx32x32.txs_ctx(), 3);
        assert_eq!(TxSize::Tx64x64.txs_ctx(), 4);
    }

    #[test]
    fn adjusted_sizes_drop_64() {
        assert_eq!(TxSize::Tx64x64.adjusted(), TxSize::Tx32x32);
        assert_eq!(TxSize::Tx16x64.adjusted(), TxSize::Tx16x32);
        assert_eq!(TxSize::Tx64x16.adjusted(), TxSize::Tx32x16);
        assert_eq!(TxSize::Tx8x8.adjusted(), TxSize::Tx8x8);
    }

    #[test]
    fn chroma_planes_for_420() {
        assert_eq!(Block4x16.plane_size(1, 1), Some(Block4x8));
        assert_eq!(Block16x4.plane_size(1, 1), Some(Block8x4));
        assert_eq!(Block4x4.plane_size(1, 1), Some(Block4x4));
        assert_eq!(Block64x64.plane_size(1, 1), Some(Block32x32));
    }

    #[test]
    fn chroma_reference_for_sub8x8() {
        assert!(!is_chroma_reference(0, 0, Block4x4, 1, 1));
        assert!(!is_chroma_reference(0, 1, Block4x4, 1, 1));
        assert!(is_chroma_reference(1, 1, Block4x4, 1, 1));
        assert!(is_chroma_reference(0, 1, Block4x8, 1, 1));
        assert!(is_chroma_reference(0, 0, Block8x8, 1, 1));
        assert!(is_chroma_reference(0, 0, Block4x4, 0, 0));
    }

    #[test]
    fn partition_symbol_counts() {
        assert!(PartitionType::Split.is_allowed_for(Block8x8));
        assert!(!PartitionType::HorzA.is_allowed_for(Block8x8));
        assert!(PartitionType::VertB.is_allowed_for(Block128x128));
        assert!(!PartitionType::Horz4.is_allowed_for(Block128x128));
    }
}
