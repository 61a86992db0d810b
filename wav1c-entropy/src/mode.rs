//! Prediction, reference and transform-type vocabulary.

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntraMode {
    #[default]
    Dc = 0,
    V,
    H,
    D45,
    D135,
    D113,
    D157,
    D203,
    D67,
    Smooth,
    SmoothV,
    SmoothH,
    Paeth,
}

#[rustfmt::skip]
const INTRA_MODE_CONTEXT: [u8; 13] = [0, 1, 2, 3, 4, 4, 4, 4, 3, 0, 1, 2, 0];

impl IntraMode {
    pub fn is_directional(self) -> bool {
        (IntraMode::V as u8..=IntraMode::D67 as u8).contains(&(self as u8))
    }

    /// Bucket used by the key-frame luma mode context.
    pub fn kf_context(self) -> usize {
        INTRA_MODE_CONTEXT[self as usize] as usize
    }

    /// Default transform type implied by the prediction direction.
    pub fn tx_type(self) -> TxType {
        use IntraMode::*;
        match self {
            Dc | D45 => TxType::DctDct,
            V | D113 | D67 | SmoothV => TxType::AdstDct,
            H | D157 | D203 | SmoothH => TxType::DctAdst,
            D135 | Smooth | Paeth => TxType::AdstAdst,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvMode {
    Intra(IntraMode),
    Cfl,
}

impl UvMode {
    pub fn symbol(self) -> usize {
        match self {
            UvMode::Intra(m) => m as usize,
            UvMode::Cfl => 13,
        }
    }

    pub fn tx_type(self) -> TxType {
        match self {
            UvMode::Intra(m) => m.tx_type(),
            UvMode::Cfl => TxType::DctDct,
        }
    }
}

impl Default for UvMode {
    fn default() -> Self {
        UvMode::Intra(IntraMode::Dc)
    }
}

/// Chroma-from-luma scaling factors, each in `-16..=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CflAlpha {
    pub u: i8,
    pub v: i8,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterIntraMode {
    Dc = 0,
    V,
    H,
    D157,
    Paeth,
}

impl FilterIntraMode {
    /// Direction used to pick the intra transform-type table.
    pub fn intra_dir(self) -> IntraMode {
        match self {
            FilterIntraMode::Dc | FilterIntraMode::Paeth => IntraMode::Dc,
            FilterIntraMode::V => IntraMode::V,
            FilterIntraMode::H => IntraMode::H,
            FilterIntraMode::D157 => IntraMode::D157,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterMode {
    NearestMv = 13,
    NearMv,
    GlobalMv,
    NewMv,
    NearestNearestMv,
    NearNearMv,
    NearestNewMv,
    NewNearestMv,
    NearNewMv,
    NewNearMv,
    GlobalGlobalMv,
    NewNewMv,
}

impl InterMode {
    pub fn is_compound(self) -> bool {
        self as u8 >= InterMode::NearestNearestMv as u8
    }

    /// Compound symbol, counted from NEAREST_NEARESTMV.
    pub fn compound_symbol(self) -> usize {
        (self as u8 - InterMode::NearestNearestMv as u8) as usize
    }

    pub fn has_nearmv(self) -> bool {
        matches!(
            self,
            InterMode::NearMv | InterMode::NearNearMv | InterMode::NearNewMv | InterMode::NewNearMv
        )
    }

    pub fn is_global(self) -> bool {
        matches!(self, InterMode::GlobalMv | InterMode::GlobalGlobalMv)
    }

    /// Which of the two motion vectors carry a coded difference.
    pub fn new_mv_refs(self) -> [bool; 2] {
        match self {
            InterMode::NewMv => [true, false],
            InterMode::NewNewMv => [true, true],
            InterMode::NearestNewMv | InterMode::NearNewMv => [false, true],
            InterMode::NewNearestMv | InterMode::NewNearMv => [true, false],
            _ => [false, false],
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefFrame {
    Intra = 0,
    Last,
    Last2,
    Last3,
    Golden,
    Bwd,
    Alt2,
    Alt,
}

impl RefFrame {
    pub const INTER: [RefFrame; 7] = [
        RefFrame::Last,
        RefFrame::Last2,
        RefFrame::Last3,
        RefFrame::Golden,
        RefFrame::Bwd,
        RefFrame::Alt2,
        RefFrame::Alt,
    ];

    pub fn is_backward(self) -> bool {
        self >= RefFrame::Bwd
    }

    pub fn is_inter(self) -> bool {
        self != RefFrame::Intra
    }

    /// Index into per-reference arrays such as the global-motion table.
    pub fn inter_index(self) -> Option<usize> {
        match self {
            RefFrame::Intra => None,
            r => Some(r as usize - 1),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionMode {
    #[default]
    Simple = 0,
    Obmc,
    Warped,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpFilter {
    #[default]
    Regular = 0,
    Smooth,
    Sharp,
    Bilinear,
    Switchable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mv {
    pub row: i16,
    pub col: i16,
}

impl Mv {
    pub const ZERO: Mv = Mv { row: 0, col: 0 };

    pub fn new(row: i16, col: i16) -> Self {
        Self { row, col }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MvJoint {
    Zero = 0,
    Hnzvz,
    Hzvnz,
    Hnzvnz,
}

impl MvJoint {
    pub fn of(diff_row: i32, diff_col: i32) -> Self {
        match (diff_row == 0, diff_col == 0) {
            (true, true) => MvJoint::Zero,
            (true, false) => MvJoint::Hnzvz,
            (false, true) => MvJoint::Hzvnz,
            (false, false) => MvJoint::Hnzvnz,
        }
    }

    pub fn has_row(self) -> bool {
        matches!(self, MvJoint::Hzvnz | MvJoint::Hnzvnz)
    }

    pub fn has_col(self) -> bool {
        matches!(self, MvJoint::Hnzvz | MvJoint::Hnzvnz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MvPrecision {
    Integer,
    Low,
    High,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxType {
    #[default]
    DctDct = 0,
    AdstDct,
    DctAdst,
    AdstAdst,
    FlipadstDct,
    DctFlipadst,
    FlipadstFlipadst,
    AdstFlipadst,
    FlipadstAdst,
    Idtx,
    VDct,
    HDct,
    VAdst,
    HAdst,
    VFlipadst,
    HFlipadst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxClass {
    TwoD,
    Horiz,
    Vert,
}

impl TxType {
    #[rustfmt::skip]
    pub const ALL: [TxType; 16] = [
        TxType::DctDct, TxType::AdstDct, TxType::DctAdst, TxType::AdstAdst,
        TxType::FlipadstDct, TxType::DctFlipadst, TxType::FlipadstFlipadst, TxType::AdstFlipadst,
        TxType::FlipadstAdst, TxType::Idtx, TxType::VDct, TxType::HDct,
        TxType::VAdst, TxType::HAdst, TxType::VFlipadst, TxType::HFlipadst,
    ];

    pub fn class(self) -> TxClass {
        match self {
            TxType::VDct | TxType::VAdst | TxType::VFlipadst => TxClass::Vert,
            TxType::HDct | TxType::HAdst | TxType::HFlipadst => TxClass::Horiz,
            _ => TxClass::TwoD,
        }
    }
}

/// Allowed transform-type sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxSetType {
    DctOnly = 0,
    DctIdtx,
    Dtt4Idtx,
    Dtt4Idtx1dDct,
    Dtt9Idtx1dDct,
    All16,
}

#[rustfmt::skip]
const EXT_TX_IND: [[u8; 16]; 6] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 3, 4, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 5, 6, 4, 0, 0, 0, 0, 0, 0, 2, 3, 0, 0, 0, 0],
    [3, 4, 5, 8, 6, 7, 9, 10, 11, 0, 1, 2, 0, 0, 0, 0],
    [7, 8, 9, 12, 10, 11, 13, 14, 15, 0, 1, 2, 3, 4, 5, 6],
];

#[rustfmt::skip]
const EXT_TX_USED: [u16; 6] = [
    0b0000_0000_0000_0001,
    0b0000_0010_0000_0001,
    0b0000_0010_0000_1111,
    0b0000_1110_0000_1111,
    0b0000_1111_1111_1111,
    0b1111_1111_1111_1111,
];

impl TxSetType {
    pub fn symbol_count(self) -> usize {
        match self {
            TxSetType::DctOnly => 1,
            TxSetType::DctIdtx => 2,
            TxSetType::Dtt4Idtx => 5,
            TxSetType::Dtt4Idtx1dDct => 7,
            TxSetType::Dtt9Idtx1dDct => 12,
            TxSetType::All16 => 16,
        }
    }

    pub fn contains(self, tx_type: TxType) -> bool {
        EXT_TX_USED[self as usize] & (1 << tx_type as u16) != 0
    }

    pub fn symbol(self, tx_type: TxType) -> usize {
        EXT_TX_IND[self as usize][tx_type as usize] as usize
    }

    /// Position of the set in the intra or inter table family.
    pub fn table_index(self, is_inter: bool) -> Option<usize> {
        let idx = if is_inter {
            match self {
                TxSetType::All16 => 1,
                TxSetType::Dtt9Idtx1dDct => 2,
                TxSetType::DctIdtx => 3,
                _ => return None,
            }
        } else {
            match self {
                TxSetType::Dtt4Idtx1dDct => 1,
                TxSetType::Dtt4Idtx => 2,
                _ => return None,
            }
        };
        Some(idx)
    }

    pub fn for_tx(tx_size: crate::size::TxSize, is_inter: bool, reduced_tx_set: bool) -> Self {
        use crate::size::TxSize;
        let sqr_up = tx_size.sqr_up();
        if sqr_up > TxSize::Tx32x32 {
            return TxSetType::DctOnly;
        }
        if sqr_up == TxSize::Tx32x32 {
            return if is_inter { TxSetType::DctIdtx } else { TxSetType::DctOnly };
        }
        if reduced_tx_set {
            return if is_inter { TxSetType::DctIdtx } else { TxSetType::Dtt4Idtx };
        }
        let sqr = tx_size.sqr();
        match (is_inter, sqr == TxSize::Tx16x16) {
            (true, true) => TxSetType::Dtt9Idtx1dDct,
            (true, false) => TxSetType::All16,
            (false, true) => TxSetType::Dtt4Idtx,
            (false, false) => TxSetType::Dtt4Idtx1dDct,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GlobalMotionType {
    #[default]
    Identity = 0,
    Translation,
    RotZoom,
    Affine,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorationType {
    #[default]
    None = 0,
    Wiener,
    Sgrproj,
    Switchable,
}
