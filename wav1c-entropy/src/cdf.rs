//! Adaptive probability tables.
//!
//! A [`Cdf`] holds inverse cumulative probabilities: `icdf[i]` is
//! `32768 - P(symbol <= i)`, so entries fall monotonically and the last one
//! is always zero. The update counter lives in its own field.

use crate::default_cdf as dflt;
use crate::default_coef_cdf as coef;

pub const CDF_PROB_TOP: u16 = 32768;
pub const MAX_CDF_SYMBOLS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cdf {
    pub icdf: [u16; MAX_CDF_SYMBOLS],
    pub count: u16,
    symbols: u8,
}

impl Cdf {
    /// Equiprobable distribution over `n` symbols.
    pub fn uniform(n: usize) -> Self {
        debug_assert!((2..=MAX_CDF_SYMBOLS).contains(&n));
        let mut icdf = [0u16; MAX_CDF_SYMBOLS];
        for (i, p) in icdf.iter_mut().enumerate().take(n) {
            *p = (CDF_PROB_TOP as u32 - (CDF_PROB_TOP as u32 * (i as u32 + 1)) / n as u32) as u16;
        }
        Self {
            icdf,
            count: 0,
            symbols: n as u8,
        }
    }

    /// Builds a table from `n - 1` inverse cumulative values.
    pub fn from_icdf(values: &[u16]) -> Self {
        let n = values.len() + 1;
        debug_assert!((2..=MAX_CDF_SYMBOLS).contains(&n));
        let mut icdf = [0u16; MAX_CDF_SYMBOLS];
        icdf[..values.len()].copy_from_slice(values);
        Self {
            icdf,
            count: 0,
            symbols: n as u8,
        }
    }

    /// Builds a table from cumulative values as the default tables list them.
    pub fn from_cdf(values: &[u16]) -> Self {
        let mut inverse = [0u16; MAX_CDF_SYMBOLS - 1];
        for (dst, &v) in inverse.iter_mut().zip(values) {
            *dst = CDF_PROB_TOP - v;
        }
        Self::from_icdf(&inverse[..values.len()])
    }

    pub fn symbols(&self) -> usize {
        self.symbols as usize
    }

    /// Lower bound of the interval for `symbol`, 32768 for the first one.
    pub fn upper(&self, symbol: usize) -> u16 {
        if symbol == 0 {
            CDF_PROB_TOP
        } else {
            self.icdf[symbol - 1]
        }
    }

    pub fn probability(&self, symbol: usize) -> u16 {
        self.upper(symbol) - self.icdf[symbol]
    }

    /// Moves probability mass toward `symbol`.
    pub fn adapt(&mut self, symbol: usize) {
        let n = self.symbols();
        let rate = 3 + (self.count > 15) as u16 + (self.count > 31) as u16 + (n as u32).ilog2().min(2) as u16;
        for i in 0..n - 1 {
            if i < symbol {
                self.icdf[i] += (CDF_PROB_TOP - self.icdf[i]) >> rate;
            } else {
                self.icdf[i] -= self.icdf[i] >> rate;
            }
        }
        if self.count < 32 {
            self.count += 1;
        }
    }

    /// True when entries are non-increasing and end at zero.
    pub fn is_valid(&self) -> bool {
        let n = self.symbols();
        self.icdf[n - 1] == 0
            && self.icdf[0] < CDF_PROB_TOP
            && self.icdf[..n].windows(2).all(|w| w[0] >= w[1])
    }
}

fn bools<const N: usize>(t: &[u16; N]) -> [Cdf; N] {
    std::array::from_fn(|i| Cdf::from_cdf(&[t[i]]))
}

fn bools2<const A: usize, const B: usize>(t: &[[u16; B]; A]) -> [[Cdf; B]; A] {
    std::array::from_fn(|i| bools(&t[i]))
}

fn bools3<const A: usize, const B: usize, const C: usize>(t: &[[[u16; C]; B]; A]) -> [[[Cdf; C]; B]; A] {
    std::array::from_fn(|i| bools2(&t[i]))
}

fn rows<const N: usize, const K: usize>(t: &[[u16; K]; N]) -> [Cdf; N] {
    std::array::from_fn(|i| Cdf::from_cdf(&t[i]))
}

fn rows2<const A: usize, const B: usize, const K: usize>(t: &[[[u16; K]; B]; A]) -> [[Cdf; B]; A] {
    std::array::from_fn(|i| rows(&t[i]))
}

fn rows3<const A: usize, const B: usize, const C: usize, const K: usize>(
    t: &[[[[u16; K]; C]; B]; A],
) -> [[[Cdf; C]; B]; A] {
    std::array::from_fn(|i| rows2(&t[i]))
}

pub const TX_SIZES: usize = 5;
pub const PLANE_TYPES: usize = 2;
pub const TXB_SKIP_CONTEXTS: usize = 13;
pub const EOB_COEF_CONTEXTS: usize = 9;
pub const SIG_COEF_CONTEXTS_EOB: usize = 4;
pub const SIG_COEF_CONTEXTS: usize = 42;
pub const LEVEL_CONTEXTS: usize = 21;
pub const DC_SIGN_CONTEXTS: usize = 3;
pub const PARTITION_CONTEXTS: usize = 20;
pub const BLOCK_SIZES_ALL: usize = 22;
pub const INTRA_MODES: usize = 13;
pub const UV_INTRA_MODES_CFL: usize = 14;
pub const REF_CONTEXTS: usize = 3;
pub const MV_CLASSES: usize = 11;
pub const MV_OFFSET_BITS: usize = 10;
pub const TXFM_PARTITION_CONTEXTS: usize = 21;

/// Motion-vector component tables; one per axis.
#[derive(Clone, Debug)]
pub struct MvComponentCdfs {
    pub sign: Cdf,
    pub classes: Cdf,
    pub class0: Cdf,
    pub bits: [Cdf; MV_OFFSET_BITS],
    pub class0_fp: [Cdf; 2],
    pub fp: Cdf,
    pub class0_hp: Cdf,
    pub hp: Cdf,
}

impl Default for MvComponentCdfs {
    fn default() -> Self {
        Self {
            sign: Cdf::from_cdf(&[dflt::MV_SIGN]),
            classes: Cdf::from_cdf(&dflt::MV_CLASSES),
            class0: Cdf::from_cdf(&[dflt::MV_CLASS0]),
            bits: bools(&dflt::MV_BITS),
            class0_fp: rows(&dflt::MV_CLASS0_FP),
            fp: Cdf::from_cdf(&dflt::MV_FP),
            class0_hp: Cdf::from_cdf(&[dflt::MV_CLASS0_HP]),
            hp: Cdf::from_cdf(&[dflt::MV_HP]),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MvCdfs {
    pub joints: Cdf,
    pub comps: [MvComponentCdfs; 2],
}

impl Default for MvCdfs {
    fn default() -> Self {
        Self {
            joints: Cdf::from_cdf(&dflt::MV_JOINTS),
            comps: [MvComponentCdfs::default(), MvComponentCdfs::default()],
        }
    }
}

/// Every adaptive table used while coding a tile.
#[derive(Clone, Debug)]
pub struct CdfContext {
    pub coef_q_ctx: usize,

    pub txb_skip: [[Cdf; TXB_SKIP_CONTEXTS]; TX_SIZES],
    pub eob_extra: [[[Cdf; EOB_COEF_CONTEXTS]; PLANE_TYPES]; TX_SIZES],
    pub eob_flag16: [[Cdf; 2]; PLANE_TYPES],
    pub eob_flag32: [[Cdf; 2]; PLANE_TYPES],
    pub eob_flag64: [[Cdf; 2]; PLANE_TYPES],
    pub eob_flag128: [[Cdf; 2]; PLANE_TYPES],
    pub eob_flag256: [[Cdf; 2]; PLANE_TYPES],
    pub eob_flag512: [[Cdf; 2]; PLANE_TYPES],
    pub eob_flag1024: [[Cdf; 2]; PLANE_TYPES],
    pub coeff_base_eob: [[[Cdf; SIG_COEF_CONTEXTS_EOB]; PLANE_TYPES]; TX_SIZES],
    pub coeff_base: [[[Cdf; SIG_COEF_CONTEXTS]; PLANE_TYPES]; TX_SIZES],
    pub coeff_br: [[[Cdf; LEVEL_CONTEXTS]; PLANE_TYPES]; TX_SIZES],
    pub dc_sign: [[Cdf; DC_SIGN_CONTEXTS]; PLANE_TYPES],

    /// Intra transform sets 1 and 2, by square size and luma mode.
    pub intra_ext_tx: [[[Cdf; INTRA_MODES]; 4]; 2],
    /// Inter transform sets 1, 2 and 3, by square size.
    pub inter_ext_tx: [[Cdf; 4]; 3],

    pub skip: [Cdf; 3],
    pub skip_mode: [Cdf; 3],
    pub intra_inter: [Cdf; 4],
    pub comp_inter: [Cdf; 5],
    pub comp_ref_type: [Cdf; 5],
    pub uni_comp_ref: [[Cdf; 3]; REF_CONTEXTS],
    pub single_ref: [[Cdf; 6]; REF_CONTEXTS],
    pub comp_ref: [[Cdf; 3]; REF_CONTEXTS],
    pub comp_bwdref: [[Cdf; 2]; REF_CONTEXTS],

    pub newmv: [Cdf; 6],
    pub zeromv: [Cdf; 2],
    pub refmv: [Cdf; 6],
    pub drl: [Cdf; 3],
    pub compound_mode: [Cdf; 8],
    pub motion_mode: [Cdf; BLOCK_SIZES_ALL],
    pub obmc: [Cdf; BLOCK_SIZES_ALL],
    pub switchable_interp: [Cdf; 16],

    pub kf_y_mode: [[Cdf; 5]; 5],
    pub y_mode: [Cdf; 4],
    /// `[0]` when CfL is not allowed (13 modes), `[1]` when it is (14 modes).
    pub uv_mode: [[Cdf; INTRA_MODES]; 2],
    pub angle_delta: [Cdf; 8],
    pub cfl_sign: Cdf,
    pub cfl_alpha: [Cdf; 6],
    pub filter_intra: [Cdf; BLOCK_SIZES_ALL],
    pub filter_intra_mode: Cdf,
    pub palette_y_mode: [[Cdf; 3]; 7],
    pub palette_uv_mode: [Cdf; 2],
    pub intrabc: Cdf,

    pub tx_size: [[Cdf; 3]; 4],
    pub txfm_partition: [Cdf; TXFM_PARTITION_CONTEXTS],
    pub delta_q: Cdf,
    pub spatial_pred_seg: [Cdf; 3],
    pub switchable_restore: Cdf,
    pub wiener_restore: Cdf,
    pub sgrproj_restore: Cdf,

    pub partition: [Cdf; PARTITION_CONTEXTS],
    pub nmv: MvCdfs,
    pub ndvc: MvCdfs,
}

impl CdfContext {
    /// Defaults for the lowest quantizer bucket.
    pub fn new() -> Self {
        Self::for_q_ctx(0)
    }

    /// Seeds a context for a frame coded at `base_q_idx`.
    pub fn for_qidx(base_q_idx: u8) -> Self {
        Self::for_q_ctx(coef_q_ctx(base_q_idx))
    }

    fn for_q_ctx(q: usize) -> Self {
        Self {
            coef_q_ctx: q,
            txb_skip: bools2(&coef::TXB_SKIP[q]),
            eob_extra: bools3(&coef::EOB_EXTRA[q]),
            eob_flag16: rows2(&coef::EOB_MULTI16[q]),
            eob_flag32: rows2(&coef::EOB_MULTI32[q]),
            eob_flag64: rows2(&coef::EOB_MULTI64[q]),
            eob_flag128: rows2(&coef::EOB_MULTI128[q]),
            eob_flag256: rows2(&coef::EOB_MULTI256[q]),
            eob_flag512: rows2(&coef::EOB_MULTI512[q]),
            eob_flag1024: rows2(&coef::EOB_MULTI1024[q]),
            coeff_base_eob: rows3(&coef::COEFF_BASE_EOB[q]),
            coeff_base: rows3(&coef::COEFF_BASE[q]),
            coeff_br: rows3(&coef::COEFF_BR[q]),
            dc_sign: bools2(&coef::DC_SIGN),

            intra_ext_tx: [rows2(&dflt::INTRA_EXT_TX_SET1), rows2(&dflt::INTRA_EXT_TX_SET2)],
            inter_ext_tx: [
                rows(&dflt::INTER_EXT_TX_SET1),
                rows(&dflt::INTER_EXT_TX_SET2),
                bools(&dflt::INTER_EXT_TX_SET3),
            ],

            skip: bools(&dflt::SKIP),
            skip_mode: bools(&dflt::SKIP_MODE),
            intra_inter: bools(&dflt::INTRA_INTER),
            comp_inter: bools(&dflt::COMP_INTER),
            comp_ref_type: bools(&dflt::COMP_REF_TYPE),
            uni_comp_ref: bools2(&dflt::UNI_COMP_REF),
            single_ref: bools2(&dflt::SINGLE_REF),
            comp_ref: bools2(&dflt::COMP_REF),
            comp_bwdref: bools2(&dflt::COMP_BWDREF),

            newmv: bools(&dflt::NEWMV),
            zeromv: bools(&dflt::ZEROMV),
            refmv: bools(&dflt::REFMV),
            drl: bools(&dflt::DRL),
            compound_mode: rows(&dflt::COMPOUND_MODE),
            motion_mode: rows(&dflt::MOTION_MODE),
            obmc: bools(&dflt::OBMC),
            switchable_interp: rows(&dflt::SWITCHABLE_INTERP),

            kf_y_mode: rows2(&dflt::KF_Y_MODE),
            y_mode: rows(&dflt::Y_MODE),
            uv_mode: [rows(&dflt::UV_MODE), rows(&dflt::UV_MODE_CFL)],
            angle_delta: rows(&dflt::ANGLE_DELTA),
            cfl_sign: Cdf::from_cdf(&dflt::CFL_SIGN),
            cfl_alpha: rows(&dflt::CFL_ALPHA),
            filter_intra: bools(&dflt::FILTER_INTRA),
            filter_intra_mode: Cdf::from_cdf(&dflt::FILTER_INTRA_MODE),
            palette_y_mode: bools2(&dflt::PALETTE_Y_MODE),
            palette_uv_mode: bools(&dflt::PALETTE_UV_MODE),
            intrabc: Cdf::from_cdf(&[dflt::INTRABC]),

            tx_size: [
                bools(&dflt::TX_SIZE_8X8),
                rows(&dflt::TX_SIZE[0]),
                rows(&dflt::TX_SIZE[1]),
                rows(&dflt::TX_SIZE[2]),
            ],
            txfm_partition: bools(&dflt::TXFM_PARTITION),
            delta_q: Cdf::from_cdf(&dflt::DELTA_Q),
            spatial_pred_seg: rows(&dflt::SPATIAL_PRED_SEG),
            switchable_restore: Cdf::from_cdf(&dflt::SWITCHABLE_RESTORE),
            wiener_restore: Cdf::from_cdf(&[dflt::WIENER_RESTORE]),
            sgrproj_restore: Cdf::from_cdf(&[dflt::SGRPROJ_RESTORE]),

            partition: std::array::from_fn(|ctx| match ctx {
                0..=3 => Cdf::from_cdf(&dflt::PARTITION_8X8[ctx]),
                4..=15 => Cdf::from_cdf(&dflt::PARTITION_MID[ctx - 4]),
                _ => Cdf::from_cdf(&dflt::PARTITION_128X128[ctx - 16]),
            }),
            nmv: MvCdfs::default(),
            ndvc: MvCdfs::default(),
        }
    }

    pub fn eob_flag_mut(&mut self, eob_multi_size: usize, plane_type: usize, ctx: usize) -> &mut Cdf {
        match eob_multi_size {
            0 => &mut self.eob_flag16[plane_type][ctx],
            1 => &mut self.eob_flag32[plane_type][ctx],
            2 => &mut self.eob_flag64[plane_type][ctx],
            3 => &mut self.eob_flag128[plane_type][ctx],
            4 => &mut self.eob_flag256[plane_type][ctx],
            5 => &mut self.eob_flag512[plane_type][ctx],
            _ => &mut self.eob_flag1024[plane_type][ctx],
        }
    }
}

impl CdfContext {
    /// Visits every adaptive table once.
    pub fn for_each_cdf_mut(&mut self, f: &mut impl FnMut(&mut Cdf)) {
        fn all<'a>(cdfs: impl IntoIterator<Item = &'a mut Cdf>, f: &mut impl FnMut(&mut Cdf)) {
            cdfs.into_iter().for_each(f);
        }
        all(self.txb_skip.as_flattened_mut(), f);
        all(self.eob_extra.as_flattened_mut().as_flattened_mut(), f);
        for flags in [
            &mut self.eob_flag16,
            &mut self.eob_flag32,
            &mut self.eob_flag64,
            &mut self.eob_flag128,
            &mut self.eob_flag256,
            &mut self.eob_flag512,
            &mut self.eob_flag1024,
        ] {
            all(flags.as_flattened_mut(), f);
        }
        all(self.coeff_base_eob.as_flattened_mut().as_flattened_mut(), f);
        all(self.coeff_base.as_flattened_mut().as_flattened_mut(), f);
        all(self.coeff_br.as_flattened_mut().as_flattened_mut(), f);
        all(self.dc_sign.as_flattened_mut(), f);
        all(self.intra_ext_tx.as_flattened_mut().as_flattened_mut(), f);
        all(self.inter_ext_tx.as_flattened_mut(), f);

        for row in [
            &mut self.skip[..],
            &mut self.skip_mode,
            &mut self.intra_inter,
            &mut self.comp_inter,
            &mut self.comp_ref_type,
            &mut self.newmv,
            &mut self.zeromv,
            &mut self.refmv,
            &mut self.drl,
            &mut self.compound_mode,
            &mut self.motion_mode,
            &mut self.obmc,
            &mut self.switchable_interp,
            &mut self.y_mode,
            &mut self.angle_delta,
            &mut self.cfl_alpha,
            &mut self.filter_intra,
            &mut self.palette_uv_mode,
            &mut self.txfm_partition,
            &mut self.spatial_pred_seg,
            &mut self.partition,
        ] {
            all(row.iter_mut(), f);
        }
        all(self.uni_comp_ref.as_flattened_mut(), f);
        all(self.single_ref.as_flattened_mut(), f);
        all(self.comp_ref.as_flattened_mut(), f);
        all(self.comp_bwdref.as_flattened_mut(), f);
        all(self.kf_y_mode.as_flattened_mut(), f);
        all(self.uv_mode.as_flattened_mut(), f);
        all(self.palette_y_mode.as_flattened_mut(), f);
        all(self.tx_size.as_flattened_mut(), f);
        for cdf in [
            &mut self.cfl_sign,
            &mut self.filter_intra_mode,
            &mut self.intrabc,
            &mut self.delta_q,
            &mut self.switchable_restore,
            &mut self.wiener_restore,
            &mut self.sgrproj_restore,
        ] {
            f(cdf);
        }
        for mv in [&mut self.nmv, &mut self.ndvc] {
            f(&mut mv.joints);
            for comp in mv.comps.iter_mut() {
                for cdf in [
                    &mut comp.sign,
                    &mut comp.classes,
                    &mut comp.class0,
                    &mut comp.fp,
                    &mut comp.class0_hp,
                    &mut comp.hp,
                ] {
                    f(cdf);
                }
                all(comp.bits.iter_mut(), f);
                all(comp.class0_fp.iter_mut(), f);
            }
        }
    }

    /// Clears every adaptation counter, as done before a context is saved.
    pub fn reset_counts(&mut self) {
        self.for_each_cdf_mut(&mut |cdf| cdf.count = 0);
    }
}

impl Default for CdfContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Quantizer bucket selecting the default coefficient tables.
pub fn coef_q_ctx(base_q_idx: u8) -> usize {
    match base_q_idx {
        0..=20 => 0,
        21..=60 => 1,
        61..=120 => 2,
        _ => 3,
    }
}

pub const NUM_REF_SLOTS: usize = 8;

/// Saved end-of-frame contexts, one per reference slot.
#[derive(Default)]
pub struct FrameContextStore {
    slots: [Option<Box<CdfContext>>; NUM_REF_SLOTS],
}

impl FrameContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `ctx` in every slot selected by `refresh_frame_flags`.
    pub fn save(&mut self, refresh_frame_flags: u8, ctx: &CdfContext) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if refresh_frame_flags & (1 << i) != 0 {
                let mut saved = Box::new(ctx.clone());
                saved.reset_counts();
                *slot = Some(saved);
            }
        }
    }

    /// Context for a frame whose primary reference is `slot`, or defaults.
    pub fn load(&self, slot: Option<usize>, base_q_idx: u8) -> CdfContext {
        match slot.and_then(|s| self.slots.get(s)).and_then(|s| s.as_deref()) {
            Some(ctx) => ctx.clone(),
            None => CdfContext::for_qidx(base_q_idx),
        }
    }

    pub fn reset(&mut self) {
        self.slots = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_tables_are_valid() {
        for n in 2..=MAX_CDF_SYMBOLS {
            let cdf = Cdf::uniform(n);
            assert!(cdf.is_valid(), "n={n}");
            let total: u32 = (0..n).map(|s| cdf.probability(s) as u32).sum();
            assert_eq!(total, 32768);
        }
    }

    #[test]
    fn adapt_raises_observed_symbol() {
        let mut cdf = Cdf::uniform(4);
        let before = cdf.probability(2);
        cdf.adapt(2);
        assert!(cdf.probability(2) > before);
        assert_eq!(cdf.count, 1);
        assert!(cdf.is_valid());
    }

    #[test]
    fn counter_saturates_at_32() {
        let mut cdf = Cdf::uniform(2);
        for _ in 0..100 {
            cdf.adapt(1);
        }
        assert_eq!(cdf.count, 32);
        assert!(cdf.is_valid());
    }

    #[test]
    fn binary_update_matches_reference_rate() {
        // count 0, two symbols: rate 4
        let mut cdf = Cdf::from_icdf(&[16384]);
        cdf.adapt(0);
        assert_eq!(cdf.icdf[0], 16384 - (16384 >> 4));
        cdf.adapt(1);
        let p = 16384 - (16384 >> 4);
        assert_eq!(cdf.icdf[0], p + ((32768 - p) >> 4));
    }

    #[test]
    fn q_ctx_thresholds() {
        assert_eq!(coef_q_ctx(20), 0);
        assert_eq!(coef_q_ctx(21), 1);
        assert_eq!(coef_q_ctx(60), 1);
        assert_eq!(coef_q_ctx(120), 2);
        assert_eq!(coef_q_ctx(121), 3);
        assert_eq!(CdfContext::for_qidx(100).coef_q_ctx, 2);
    }

    #[test]
    fn partition_tables_follow_size_class() {
        let ctx = CdfContext::new();
        assert_eq!(ctx.partition[0].symbols(), 4);
        assert_eq!(ctx.partition[4].symbols(), 10);
        assert_eq!(ctx.partition[16].symbols(), 8);
    }

    #[test]
    fn every_table_starts_valid() {
        let mut ctx = CdfContext::new();
        let mut n = 0;
        ctx.for_each_cdf_mut(&mut |cdf| {
            assert!(cdf.is_valid());
            n += 1;
        });
        assert!(n > 1000);
    }

    #[test]
    fn store_round_trips_saved_context() {
        let mut ctx = CdfContext::new();
        ctx.skip[1].adapt(1);
        let mut store = FrameContextStore::new();
        store.save(0b0000_0100, &ctx);
        let loaded = store.load(Some(2), 0);
        assert_eq!(loaded.skip[1].icdf, ctx.skip[1].icdf);
        assert_eq!(loaded.skip[1].count, 0);
        assert_eq!(store.load(Some(3), 0).skip[1], CdfContext::new().skip[1]);
        assert_eq!(store.load(None, 200).coeff_base, CdfContext::for_qidx(200).coeff_base);
    }

    #[test]
    fn defaults_match_the_reference_tables() {
        let ctx = CdfContext::new();
        assert_eq!(ctx.skip[0].icdf[0], 32768 - 31671);
        assert_eq!(ctx.skip[2].icdf[0], 32768 - 4576);
        assert_eq!(ctx.kf_y_mode[0][0].icdf[0], 32768 - 15588);
        assert_ne!(ctx.kf_y_mode[0][0], Cdf::uniform(INTRA_MODES));
        assert_eq!(ctx.uv_mode[0][0].icdf[0], 32768 - 22631);
        assert_eq!(ctx.uv_mode[1][0].symbols(), UV_INTRA_MODES_CFL);
        assert_eq!(ctx.partition[12].icdf[0], 32768 - 20137);
        assert_eq!(ctx.intrabc.icdf[0], 32768 - 30531);
        assert_eq!(ctx.nmv.comps[0].classes.symbols(), MV_CLASSES);
    }

    #[test]
    fn coefficient_defaults_follow_the_quantizer_bucket() {
        let low = CdfContext::for_qidx(0);
        let high = CdfContext::for_qidx(255);
        assert_eq!(high.coef_q_ctx, 3);
        assert_ne!(low.txb_skip, high.txb_skip);
        assert_ne!(low.coeff_base, high.coeff_base);
        assert_ne!(low.coeff_br, high.coeff_br);
        assert_ne!(low.eob_flag256, high.eob_flag256);
        // mode tables do not depend on the quantizer
        assert_eq!(low.skip, high.skip);
        assert_eq!(low.kf_y_mode, high.kf_y_mode);
        assert_eq!(low.dc_sign, high.dc_sign);

        let buckets: Vec<_> = [0u8, 40, 100, 200].iter().map(|&q| CdfContext::for_qidx(q).txb_skip).collect();
        for (i, a) in buckets.iter().enumerate() {
            for b in &buckets[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn cumulative_values_convert_to_inverse() {
        let cdf = Cdf::from_cdf(&[8192, 16384, 24576]);
        assert_eq!(cdf, Cdf::uniform(4));
        assert!(Cdf::from_cdf(&[31671]).is_valid());
    }
}
