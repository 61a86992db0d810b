//! Coefficient coding for one transform block.

use crate::cdf::CdfContext;
use crate::error::{BlockLocation, EntropyError, Result, SyntaxElement};
use crate::mode::{IntraMode, TxClass, TxSetType, TxType};
use crate::msac::MsacEncoder;
use crate::scan::{
    BASE_POS_CTX_OFFSET, EOB_GROUP_START, base_ctx_offset, br_ref_offsets, eob_offset_bits,
    eob_pos_token, scan_order, sig_ref_offsets,
};
use crate::size::{BlockSize, TxSize};

pub const COEFF_CONTEXT_BITS: u32 = 3;
pub const COEFF_CONTEXT_MASK: u8 = (1 << COEFF_CONTEXT_BITS) - 1;

const NUM_BASE_LEVELS: u32 = 2;
const COEFF_BASE_RANGE: u32 = 12;
const BR_CDF_SIZE: u32 = 4;
const MAX_BASE_BR_RANGE: u32 = COEFF_BASE_RANGE + NUM_BASE_LEVELS + 1;

#[rustfmt::skip]
const SKIP_CONTEXTS: [[u8; 5]; 5] = [
    [1, 2, 2, 2, 3],
    [2, 4, 4, 4, 5],
    [2, 4, 4, 4, 5],
    [2, 4, 4, 4, 5],
    [3, 5, 5, 5, 6],
];

/// Contexts derived from the neighbouring blocks' coded levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxbContext {
    pub skip_ctx: usize,
    pub dc_sign_ctx: usize,
}

/// Computes the all-zero and DC-sign contexts of a transform block from the
/// entropy-context bytes spanning its top edge (`above`) and left edge
/// (`left`), one byte per 4-sample unit.
pub fn txb_context(
    plane_bsize: BlockSize,
    tx_size: TxSize,
    plane: usize,
    above: &[u8],
    left: &[u8],
) -> TxbContext {
    let mut dc_sign = 0i32;
    for &v in above.iter().chain(left.iter()) {
        match v >> COEFF_CONTEXT_BITS {
            1 => dc_sign -= 1,
            2 => dc_sign += 1,
            _ => {}
        }
    }
    let dc_sign_ctx = match dc_sign.signum() {
        -1 => 1,
        1 => 2,
        _ => 0,
    };

    let skip_ctx = if plane == 0 {
        if plane_bsize == tx_size.to_block_size() {
            0
        } else {
            let top = above.iter().fold(0u8, |acc, &v| acc | v) & COEFF_CONTEXT_MASK;
            let lft = left.iter().fold(0u8, |acc, &v| acc | v) & COEFF_CONTEXT_MASK;
            SKIP_CONTEXTS[top.min(4) as usize][lft.min(4) as usize] as usize
        }
    } else {
        let base = above.iter().any(|&v| v != 0) as usize + left.iter().any(|&v| v != 0) as usize;
        let offset = if plane_bsize.pels_log2() > tx_size.to_block_size().pels_log2() {
            10
        } else {
            7
        };
        base + offset
    };

    TxbContext {
        skip_ctx,
        dc_sign_ctx,
    }
}

/// How the transform type of a luma block is signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxTypeSignal {
    pub set: TxSetType,
    pub is_inter: bool,
    pub intra_dir: IntraMode,
}

/// One transform block ready for coding.
#[derive(Debug, Clone, Copy)]
pub struct TxbCoding<'a> {
    pub tx_size: TxSize,
    pub tx_type: TxType,
    pub plane_type: usize,
    pub ctx: TxbContext,
    /// Row-major coefficients of the coded area.
    pub coeffs: &'a [i32],
    /// Present when the transform type is coded with the block.
    pub signal: Option<TxTypeSignal>,
    pub location: BlockLocation,
}

/// Index of the last non-zero coefficient in scan order plus one.
pub fn end_of_block(coeffs: &[i32], scan: &[u16]) -> usize {
    scan.iter()
        .rposition(|&p| coeffs.get(p as usize).is_some_and(|&c| c != 0))
        .map_or(0, |i| i + 1)
}

pub(crate) fn coeff_base_ctx(
    levels: &[u8],
    tx_size: TxSize,
    class: TxClass,
    w: usize,
    h: usize,
    pos: usize,
) -> usize {
    let (row, col) = (pos / w, pos % w);
    let mag: usize = sig_ref_offsets(class)
        .iter()
        .filter(|&&(dr, dc)| row + dr < h && col + dc < w)
        .map(|&(dr, dc)| levels[(row + dr) * w + col + dc].min(3) as usize)
        .sum();
    let ctx = ((mag + 1) >> 1).min(4);
    match class {
        TxClass::TwoD if pos == 0 => 0,
        TxClass::TwoD => ctx + base_ctx_offset(tx_size, row, col),
        TxClass::Vert => ctx + BASE_POS_CTX_OFFSET[row.min(2)],
        TxClass::Horiz => ctx + BASE_POS_CTX_OFFSET[col.min(2)],
    }
}

pub(crate) fn coeff_base_eob_ctx(scan_idx: usize, w: usize, h: usize) -> usize {
    let area = w * h;
    if scan_idx == 0 {
        0
    } else if scan_idx <= area / 8 {
        1
    } else if scan_idx <= area / 4 {
        2
    } else {
        3
    }
}

pub(crate) fn coeff_br_ctx(levels: &[u8], class: TxClass, w: usize, h: usize, pos: usize) -> usize {
    let (row, col) = (pos / w, pos % w);
    let mag: usize = br_ref_offsets(class)
        .iter()
        .filter(|&&(dr, dc)| row + dr < h && col + dc < w)
        .map(|&(dr, dc)| levels[(row + dr) * w + col + dc] as usize)
        .sum();
    let mag = ((mag + 1) >> 1).min(6);
    if pos == 0 {
        return mag;
    }
    let near = match class {
        TxClass::TwoD => row < 2 && col < 2,
        TxClass::Horiz => col == 0,
        TxClass::Vert => row == 0,
    };
    if near { mag + 7 } else { mag + 14 }
}

fn write_tx_type(
    enc: &mut MsacEncoder,
    cdfs: &mut CdfContext,
    signal: &TxTypeSignal,
    tx_size: TxSize,
    tx_type: TxType,
    location: BlockLocation,
) -> Result<()> {
    if !signal.set.contains(tx_type) {
        return Err(EntropyError::invariant(
            SyntaxElement::TxType,
            location,
            format!("{tx_type:?} is not in set {:?}", signal.set),
        ));
    }
    let Some(idx) = signal.set.table_index(signal.is_inter) else {
        return Ok(());
    };
    let symbol = signal.set.symbol(tx_type);
    let sqr = tx_size.sqr() as usize;
    let cdf = if signal.is_inter {
        &mut cdfs.inter_ext_tx[idx - 1][sqr]
    } else {
        &mut cdfs.intra_ext_tx[idx - 1][sqr][signal.intra_dir as usize]
    };
    enc.encode_symbol(symbol, cdf);
    Ok(())
}

/// Writes the coefficients of one transform block and returns the
/// entropy-context byte the neighbours will see: the clamped level sum in
/// the low bits and the DC sign category above them.
pub fn write_coeffs(enc: &mut MsacEncoder, cdfs: &mut CdfContext, txb: &TxbCoding<'_>) -> Result<u8> {
    let adj = txb.tx_size.adjusted();
    let (w, h) = (adj.width() as usize, adj.height() as usize);
    if txb.coeffs.len() != w * h {
        return Err(EntropyError::invariant(
            SyntaxElement::Coefficients,
            txb.location,
            format!("{:?} needs {} coefficients, got {}", txb.tx_size, w * h, txb.coeffs.len()),
        ));
    }
    let txs_ctx = txb.tx_size.txs_ctx();
    let pt = txb.plane_type;
    let scan = scan_order(txb.tx_size, txb.tx_type);
    let eob = end_of_block(txb.coeffs, scan);

    enc.encode_bool(eob == 0, &mut cdfs.txb_skip[txs_ctx][txb.ctx.skip_ctx]);
    if eob == 0 {
        return Ok(0);
    }

    if let Some(signal) = &txb.signal {
        write_tx_type(enc, cdfs, signal, txb.tx_size, txb.tx_type, txb.location)?;
    }

    let class = txb.tx_type.class();
    let eob_multi_size = (w * h).ilog2() as usize - 4;
    let eob_ctx = usize::from(class != TxClass::TwoD);
    let token = eob_pos_token(eob as u16);
    enc.encode_symbol(token - 1, cdfs.eob_flag_mut(eob_multi_size, pt, eob_ctx));

    let offset_bits = eob_offset_bits(token);
    if offset_bits > 0 {
        let extra = eob as u32 - EOB_GROUP_START[token] as u32;
        let msb = offset_bits - 1;
        enc.encode_bool(
            (extra >> msb) & 1 == 1,
            &mut cdfs.eob_extra[txs_ctx][pt][token - 3],
        );
        for bit in (0..msb).rev() {
            enc.encode_bool_equi((extra >> bit) & 1 == 1);
        }
    }

    let levels: Vec<u8> = txb
        .coeffs
        .iter()
        .map(|c| c.unsigned_abs().min(MAX_BASE_BR_RANGE) as u8)
        .collect();

    let br_set = txs_ctx.min(3);
    for c in (0..eob).rev() {
        let pos = scan[c] as usize;
        let level = txb.coeffs[pos].unsigned_abs();
        if c == eob - 1 {
            let ctx = coeff_base_eob_ctx(c, w, h);
            enc.encode_symbol(
                (level.min(3) - 1) as usize,
                &mut cdfs.coeff_base_eob[txs_ctx][pt][ctx],
            );
        } else {
            let ctx = coeff_base_ctx(&levels, txb.tx_size, class, w, h, pos);
            enc.encode_symbol(level.min(3) as usize, &mut cdfs.coeff_base[txs_ctx][pt][ctx]);
        }
        if level > NUM_BASE_LEVELS {
            let base_range = level - NUM_BASE_LEVELS - 1;
            let ctx = coeff_br_ctx(&levels, class, w, h, pos);
            let mut idx = 0;
            while idx < COEFF_BASE_RANGE {
                let k = (base_range - idx).min(BR_CDF_SIZE - 1);
                enc.encode_symbol(k as usize, &mut cdfs.coeff_br[br_set][pt][ctx]);
                if k < BR_CDF_SIZE - 1 {
                    break;
                }
                idx += BR_CDF_SIZE - 1;
            }
        }
    }

    let mut cul_level = 0u32;
    for c in 0..eob {
        let pos = scan[c] as usize;
        let v = txb.coeffs[pos];
        if v == 0 {
            continue;
        }
        let level = v.unsigned_abs();
        if c == 0 {
            enc.encode_bool(v < 0, &mut cdfs.dc_sign[pt][txb.ctx.dc_sign_ctx]);
        } else {
            enc.encode_bool_equi(v < 0);
        }
        if level >= MAX_BASE_BR_RANGE {
            enc.encode_golomb(level - MAX_BASE_BR_RANGE);
        }
        cul_level = cul_level.saturating_add(level);
    }

    let mut ctx = cul_level.min(COEFF_CONTEXT_MASK as u32) as u8;
    match txb.coeffs[0].signum() {
        -1 => ctx |= 1 << COEFF_CONTEXT_BITS,
        1 => ctx += 2 << COEFF_CONTEXT_BITS,
        _ => {}
    }
    Ok(ctx)
}
