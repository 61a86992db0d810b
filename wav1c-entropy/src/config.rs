use crate::error::{EntropyError, Result};
use crate::sequence::SequenceHeader;

/// Largest tile-column or tile-row log2 the codec can express.
pub const MAX_TILE_LOG2: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntropyConfig {
    pub tile_cols_log2: u32,
    pub tile_rows_log2: u32,
    /// Threads for the tile path. 0 uses the global rayon pool.
    pub worker_threads: usize,
    /// Byte budget for one frame's tile data. `None` derives a worst-case
    /// bound from the frame size.
    pub output_capacity: Option<usize>,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            tile_cols_log2: 0,
            tile_rows_log2: 0,
            worker_threads: 0,
            output_capacity: None,
        }
    }
}

impl EntropyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tile_cols_log2 > MAX_TILE_LOG2 || self.tile_rows_log2 > MAX_TILE_LOG2 {
            return Err(EntropyError::InvalidConfig(format!(
                "tile log2 {}x{} above {MAX_TILE_LOG2}",
                self.tile_cols_log2, self.tile_rows_log2
            )));
        }
        if self.output_capacity == Some(0) {
            return Err(EntropyError::InvalidConfig("zero output capacity".into()));
        }
        Ok(())
    }

    /// Byte budget for tile data of a frame coded under `seq`.
    pub fn capacity(&self, seq: &SequenceHeader) -> usize {
        self.output_capacity.unwrap_or_else(|| worst_case_tile_bytes(seq))
    }
}

/// Generous upper bound on the tile data of one frame: four bytes per
/// sample plus slack for headers and range-coder flushes.
pub fn worst_case_tile_bytes(seq: &SequenceHeader) -> usize {
    let luma = seq.max_frame_width as usize * seq.max_frame_height as usize;
    let chroma = if seq.num_planes() > 1 {
        2 * (luma >> (seq.ssx() + seq.ssy()))
    } else {
        0
    };
    (luma + chroma) * 4 + 4096
}
