use std::fmt;

use crate::size::BlockSize;

/// Syntax element being written when an invariant check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxElement {
    Partition,
    SegmentId,
    Skip,
    SkipMode,
    Cdef,
    DeltaQ,
    IntraBc,
    IntraMode,
    UvMode,
    CflAlpha,
    Palette,
    FilterIntra,
    IsInter,
    RefFrames,
    InterMode,
    Drl,
    MotionVector,
    MotionMode,
    InterpFilter,
    TxSize,
    TxType,
    Coefficients,
    Restoration,
    FrameHeader,
    TileInfo,
}

/// Position of the block that triggered an error, in 4x4 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockLocation {
    pub mi_row: u32,
    pub mi_col: u32,
    pub bsize: Option<BlockSize>,
}

impl BlockLocation {
    pub fn new(mi_row: u32, mi_col: u32, bsize: BlockSize) -> Self {
        Self {
            mi_row,
            mi_col,
            bsize: Some(bsize),
        }
    }

    pub fn frame() -> Self {
        Self::default()
    }
}

impl fmt::Display for BlockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bsize {
            Some(bsize) => write!(f, "mi ({}, {}) {:?}", self.mi_row, self.mi_col, bsize),
            None => write!(f, "frame level"),
        }
    }
}

/// Coding tools the back end refuses rather than approximating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    NonUniformTileSpacing,
    DeltaLoopFilter,
    TemporalSegmentationUpdate,
    Monochrome,
    ReducedStillPictureHeader,
    TimingInfo,
    DecoderModelInfo,
    FrameSizeOverride,
    Superres,
    FrameIdNumbers,
    AllLossless,
    HighBitDepthProfile2,
    MaskedCompound,
    JointCompound,
    InterIntra,
    PaletteColors,
    SegmentReferenceFeatures,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::NonUniformTileSpacing => "non-uniform tile spacing",
            Feature::DeltaLoopFilter => "delta loop filter",
            Feature::TemporalSegmentationUpdate => "temporal segmentation update",
            Feature::Monochrome => "monochrome colour config",
            Feature::ReducedStillPictureHeader => "reduced still picture header",
            Feature::TimingInfo => "timing info",
            Feature::DecoderModelInfo => "decoder model info",
            Feature::FrameSizeOverride => "frame size override",
            Feature::Superres => "superres",
            Feature::FrameIdNumbers => "frame id numbers",
            Feature::AllLossless => "all-lossless frames",
            Feature::HighBitDepthProfile2 => "profile 2 high bit depth",
            Feature::MaskedCompound => "masked compound prediction",
            Feature::JointCompound => "distance-weighted compound prediction",
            Feature::InterIntra => "inter-intra prediction",
            Feature::PaletteColors => "palette colour coding",
            Feature::SegmentReferenceFeatures => "segment reference, skip or global-motion features",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EntropyError {
    #[error("invariant violated in {element:?} at {location}: {reason}")]
    InvariantViolation {
        element: SyntaxElement,
        location: BlockLocation,
        reason: String,
    },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(Feature),

    #[error("output buffer overflow: needed {needed} bytes, capacity {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EntropyError {
    pub fn invariant(
        element: SyntaxElement,
        location: BlockLocation,
        reason: impl Into<String>,
    ) -> Self {
        EntropyError::InvariantViolation {
            element,
            location,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EntropyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_message_names_element_and_block() {
        let err = EntropyError::invariant(
            SyntaxElement::Partition,
            BlockLocation::new(4, 8, BlockSize::Block16x16),
            "split below 8x8",
        );
        let msg = err.to_string();
        assert!(msg.contains("Partition"));
        assert!(msg.contains("mi (4, 8)"));
        assert!(msg.contains("split below 8x8"));
    }

    #[test]
    fn unsupported_feature_message() {
        let err = EntropyError::UnsupportedFeature(Feature::DeltaLoopFilter);
        assert_eq!(err.to_string(), "unsupported feature: delta loop filter");
    }

    #[test]
    fn overflow_message_has_both_sizes() {
        let err = EntropyError::BufferOverflow {
            needed: 120,
            capacity: 64,
        };
        assert_eq!(
            err.to_string(),
            "output buffer overflow: needed 120 bytes, capacity 64"
        );
    }
}
