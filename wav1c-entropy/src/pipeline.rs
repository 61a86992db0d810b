//! Frame driver: schedules superblock rows or tiles through the tile coder
//! and assembles the frame's OBUs.

use parking_lot::{Condvar, Mutex};
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::debug;

use crate::block::FrameSyntax;
use crate::cdf::{CdfContext, FrameContextStore};
use crate::config::EntropyConfig;
use crate::error::{EntropyError, Result};
use crate::frame::{FrameHeader, FrameType, PRIMARY_REF_NONE, TileBounds, TileLayout};
use crate::header::{TILE_SIZE_BYTES, encode_frame_header};
use crate::obu::{ObuType, frame_payload, obu_wrap};
use crate::sequence::SequenceHeader;
use crate::tile::{FrameState, TileEncoder, TileOutput};

#[derive(Debug)]
struct RowState {
    available: Vec<bool>,
    /// Rows below this index are all available.
    current_available: u32,
    /// Next row to code.
    current_row: u32,
    in_progress: bool,
    done: bool,
}

/// Hands out superblock rows one at a time, in order, as their input
/// arrives. At most one row is in progress at any moment.
#[derive(Debug)]
pub struct RowScheduler {
    rows: u32,
    state: Mutex<RowState>,
    finished: Condvar,
}

impl RowScheduler {
    pub fn new(rows: u32) -> Self {
        Self {
            rows,
            state: Mutex::new(RowState {
                available: vec![false; rows as usize],
                current_available: 0,
                current_row: 0,
                in_progress: false,
                done: rows == 0,
            }),
            finished: Condvar::new(),
        }
    }

    /// Records that the input for `count` rows from `start` is ready.
    pub fn mark_available(&self, start: u32, count: u32) {
        let mut state = self.state.lock();
        let end = start.saturating_add(count).min(self.rows);
        for row in start..end {
            state.available[row as usize] = true;
        }
        while state.current_available < self.rows && state.available[state.current_available as usize] {
            state.current_available += 1;
        }
    }

    /// Claims the next row if it is ready and no other row is in progress.
    /// `initial` is false when the caller is coming back from a row it
    /// claimed and completed, which releases the in-progress slot.
    pub fn next_row(&self, initial: bool) -> Option<u32> {
        let mut state = self.state.lock();
        if !initial {
            state.in_progress = false;
        }
        if state.in_progress || state.current_row >= state.current_available {
            return None;
        }
        state.in_progress = true;
        Some(state.current_row)
    }

    /// Marks `row` coded. Returns true for the call that completes the
    /// frame and never again.
    pub fn complete_row(&self, row: u32) -> bool {
        let mut state = self.state.lock();
        debug_assert_eq!(row, state.current_row);
        state.current_row += 1;
        if state.current_row == self.rows && !state.done {
            state.done = true;
            self.finished.notify_all();
            return true;
        }
        false
    }

    /// Blocks until every row has been coded.
    pub fn wait_done(&self) {
        let mut state = self.state.lock();
        while !state.done {
            self.finished.wait(&mut state);
        }
    }
}

/// One frame's OBUs and what rate control needs to know about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub obus: Vec<u8>,
    /// Tile data bytes, size prefixes included.
    pub tile_bytes: usize,
    /// Bits spent per superblock row, summed across tile columns.
    pub row_bits: Vec<usize>,
}

/// Tile data plus per-row bits of one tile.
struct CodedTile {
    output: TileOutput,
    row_bits: Vec<(u32, usize)>,
}

/// Codes the tile's share of superblock row `sb_row` and returns its bits.
fn code_sb_row(
    tile: &mut TileEncoder<'_>,
    layout: &TileLayout,
    syntax: &FrameSyntax,
    sb_row: u32,
) -> Result<usize> {
    let bounds = tile.bounds();
    let sb_cols = layout.mi_cols.div_ceil(1 << layout.sb_shift);
    let mi_row = sb_row << layout.sb_shift;
    let mut bits = 0;
    for mi_col in (bounds.mi_col_start..bounds.mi_col_end).step_by(1 << layout.sb_shift) {
        let index = (sb_row * sb_cols + (mi_col >> layout.sb_shift)) as usize;
        bits += tile.encode_superblock(mi_row, mi_col, &syntax.superblocks[index], &syntax.restoration)?;
    }
    Ok(bits)
}

fn sb_rows_of(bounds: TileBounds, sb_shift: u32) -> std::ops::Range<u32> {
    let first = bounds.mi_row_start >> sb_shift;
    let last = bounds.mi_row_end.div_ceil(1 << sb_shift);
    first..last
}

pub struct FrameEncoder {
    config: EntropyConfig,
    seq: SequenceHeader,
    layout: TileLayout,
    contexts: FrameContextStore,
    pool: Option<ThreadPool>,
}

impl FrameEncoder {
    pub fn new(seq: SequenceHeader, config: EntropyConfig) -> Result<Self> {
        config.validate()?;
        seq.validate()?;
        let layout = TileLayout::new(&seq, config.tile_cols_log2, config.tile_rows_log2);
        let pool = match config.worker_threads {
            0 => None,
            n => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|idx| format!("entropy-{idx}"))
                    .build()
                    .map_err(|e| EntropyError::InvalidConfig(format!("thread pool: {e}")))?,
            ),
        };
        debug!(
            tiles = layout.num_tiles(),
            sb_rows = layout.sb_rows(),
            "frame encoder ready"
        );
        Ok(Self {
            config,
            seq,
            layout,
            contexts: FrameContextStore::new(),
            pool,
        })
    }

    pub fn sequence_header(&self) -> &SequenceHeader {
        &self.seq
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    /// Temporal delimiter and sequence header OBUs.
    pub fn headers(&self) -> Result<Vec<u8>> {
        let mut out = obu_wrap(ObuType::TemporalDelimiter, &[]);
        out.extend_from_slice(&obu_wrap(ObuType::SequenceHeader, &self.seq.encode()?));
        Ok(out)
    }

    /// Drops every saved context, as after a sequence restart.
    pub fn reset(&mut self) {
        self.contexts.reset();
    }

    fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    /// Repeats an already decoded frame through a frame header OBU.
    pub fn show_existing(&self, fh: &FrameHeader) -> Result<Vec<u8>> {
        if !fh.show_existing_frame {
            return Err(EntropyError::InvalidConfig("show_existing_frame is not set".into()));
        }
        let mut out = obu_wrap(ObuType::TemporalDelimiter, &[]);
        let header = encode_frame_header(&self.seq, fh, &self.layout)?;
        out.extend_from_slice(&obu_wrap(ObuType::FrameHeader, &header));
        Ok(out)
    }

    fn check_syntax(&self, state: &FrameState<'_>, syntax: &FrameSyntax) -> Result<()> {
        let sb_cols = self.layout.mi_cols.div_ceil(1 << self.layout.sb_shift);
        let expected = (sb_cols * self.layout.sb_rows()) as usize;
        if syntax.superblocks.len() != expected {
            return Err(EntropyError::InvalidConfig(format!(
                "{} superblock trees for a frame of {expected}",
                syntax.superblocks.len()
            )));
        }
        for (plane, units) in syntax.restoration.iter().enumerate() {
            let count = if state.restoration.coded {
                state.restoration.unit_count(plane)
            } else {
                0
            };
            if units.len() != count {
                return Err(EntropyError::InvalidConfig(format!(
                    "plane {plane} has {} restoration units, frame codes {count}",
                    units.len()
                )));
            }
        }
        Ok(())
    }

    /// Codes one frame and returns its temporal unit: a temporal delimiter,
    /// the sequence header on shown key frames, and the frame OBU.
    pub fn encode_frame(&mut self, fh: &FrameHeader, syntax: &FrameSyntax) -> Result<EncodedFrame> {
        if fh.show_existing_frame {
            return Err(EntropyError::InvalidConfig(
                "frames shown from a slot go through show_existing".into(),
            ));
        }
        fh.validate(&self.seq)?;
        let state = FrameState::new(&self.seq, fh, self.layout.mi_rows, self.layout.mi_cols);
        self.check_syntax(&state, syntax)?;

        let slot = (fh.primary_ref_frame != PRIMARY_REF_NONE)
            .then(|| fh.ref_frame_idx[fh.primary_ref_frame as usize] as usize);
        let initial = self.contexts.load(slot, fh.quant.base_q_idx);

        let coded = if self.layout.num_tiles() == 1 {
            vec![self.encode_rows(state, initial.clone(), syntax)?]
        } else {
            self.encode_tiles(state, &initial, syntax)?
        };

        let mut row_bits = vec![0; self.layout.sb_rows() as usize];
        for tile in &coded {
            for &(row, bits) in &tile.row_bits {
                row_bits[row as usize] += bits;
            }
        }
        let tiles: Vec<Vec<u8>> = coded.iter().map(|t| t.output.data.clone()).collect();
        let tile_bytes = tiles.iter().map(Vec::len).sum::<usize>() + TILE_SIZE_BYTES * (tiles.len() - 1);
        let capacity = self.config.capacity(&self.seq);
        if tile_bytes > capacity {
            return Err(EntropyError::BufferOverflow {
                needed: tile_bytes,
                capacity,
            });
        }

        let payload = frame_payload(&self.seq, fh, &self.layout, &tiles)?;

        let end_cdf = if fh.disable_frame_end_update_cdf {
            initial
        } else {
            coded
                .into_iter()
                .nth(fh.context_update_tile_id as usize)
                .map(|t| t.output.cdf)
                .ok_or_else(|| {
                    EntropyError::InvalidConfig(format!(
                        "context_update_tile_id {} out of range",
                        fh.context_update_tile_id
                    ))
                })?
        };
        self.contexts.save(fh.refresh_frame_flags, &end_cdf);

        let mut obus = obu_wrap(ObuType::TemporalDelimiter, &[]);
        if fh.frame_type == FrameType::Key && fh.show_frame {
            obus.extend_from_slice(&obu_wrap(ObuType::SequenceHeader, &self.seq.encode()?));
        }
        obus.extend_from_slice(&obu_wrap(ObuType::Frame, &payload));
        debug!(bytes = obus.len(), tile_bytes, "frame assembled");
        Ok(EncodedFrame {
            obus,
            tile_bytes,
            row_bits,
        })
    }

    /// Single-tile path: superblock rows arrive from independent producers
    /// in any order and are coded strictly in order through one coder.
    fn encode_rows(&self, state: FrameState<'_>, initial: CdfContext, syntax: &FrameSyntax) -> Result<CodedTile> {
        let bounds = self.layout.tile(0);
        let rows = sb_rows_of(bounds, self.layout.sb_shift);
        let scheduler = RowScheduler::new(rows.len() as u32);
        let tile = Mutex::new(TileEncoder::new(state, bounds, initial));
        let row_bits = Mutex::new(Vec::with_capacity(rows.len()));
        let failure = Mutex::new(None);

        let work = |first: Option<u32>| {
            let mut claim = first;
            while let Some(row) = claim {
                debug!(row, "coding superblock row");
                if failure.lock().is_none() {
                    match code_sb_row(&mut tile.lock(), &self.layout, syntax, row) {
                        Ok(bits) => row_bits.lock().push((row, bits)),
                        Err(e) => *failure.lock() = Some(e),
                    }
                }
                scheduler.complete_row(row);
                claim = scheduler.next_row(false);
            }
        };

        self.install(|| {
            rayon::scope(|s| {
                for row in rows.clone().rev() {
                    let scheduler = &scheduler;
                    let work = &work;
                    s.spawn(move |_| {
                        scheduler.mark_available(row, 1);
                        work(scheduler.next_row(true));
                    });
                }
            })
        });
        scheduler.wait_done();

        if let Some(e) = failure.into_inner() {
            return Err(e);
        }
        let mut row_bits = row_bits.into_inner();
        row_bits.sort_unstable();
        Ok(CodedTile {
            output: tile.into_inner().finish(),
            row_bits,
        })
    }

    /// Multi-tile path: every tile gets its own coder and context copy.
    fn encode_tiles(&self, state: FrameState<'_>, initial: &CdfContext, syntax: &FrameSyntax) -> Result<Vec<CodedTile>> {
        let layout = &self.layout;
        self.install(|| {
            (0..layout.num_tiles())
                .into_par_iter()
                .map(|idx| -> Result<CodedTile> {
                    let bounds = layout.tile(idx);
                    let mut tile = TileEncoder::new(state, bounds, initial.clone());
                    let mut row_bits = Vec::new();
                    for row in sb_rows_of(bounds, layout.sb_shift) {
                        row_bits.push((row, code_sb_row(&mut tile, layout, syntax, row)?));
                    }
                    let output = tile.finish();
                    debug!(tile = idx, bytes = output.data.len(), "tile coded");
                    Ok(CodedTile { output, row_bits })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn rows_are_handed_out_in_order() {
        let s = RowScheduler::new(3);
        assert_eq!(s.next_row(true), None);
        s.mark_available(1, 2);
        assert_eq!(s.next_row(true), None);
        s.mark_available(0, 1);
        assert_eq!(s.next_row(true), Some(0));
        assert_eq!(s.next_row(true), None, "one row at a time");
        assert!(!s.complete_row(0));
        assert_eq!(s.next_row(false), Some(1));
        assert!(!s.complete_row(1));
        assert_eq!(s.next_row(false), Some(2));
        assert!(s.complete_row(2));
        assert_eq!(s.next_row(false), None);
        s.wait_done();
    }

    #[test]
    fn completion_is_reported_once_across_threads() {
        let s = Arc::new(RowScheduler::new(16));
        let completions = Arc::new(AtomicUsize::new(0));
        let coded = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16u32)
            .rev()
            .map(|row| {
                let s = Arc::clone(&s);
                let completions = Arc::clone(&completions);
                let coded = Arc::clone(&coded);
                std::thread::spawn(move || {
                    s.mark_available(row, 1);
                    let mut claim = s.next_row(true);
                    while let Some(r) = claim {
                        assert_eq!(coded.fetch_add(1, Ordering::SeqCst), r as usize);
                        if s.complete_row(r) {
                            completions.fetch_add(1, Ordering::SeqCst);
                        }
                        claim = s.next_row(false);
                    }
                })
            })
            .collect();
        s.wait_done();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(coded.load(Ordering::SeqCst), 16);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_schedule_is_done() {
        let s = RowScheduler::new(0);
        s.wait_done();
        assert_eq!(s.next_row(true), None);
    }
}
