#![forbid(unsafe_code)]

pub mod bitwriter;
pub mod block;
pub mod cdf;
pub mod config;
pub mod context;
mod default_cdf;
mod default_coef_cdf;
pub mod error;
pub mod frame;
pub mod header;
pub mod inter;
pub mod intra;
pub mod mode;
pub mod msac;
pub mod mv;
pub mod neighbor;
pub mod obu;
pub mod partition;
pub mod pipeline;
pub mod primitive;
pub mod restoration;
pub mod scan;
pub mod segment;
pub mod sequence;
pub mod size;
pub mod tile;
pub mod txb;
pub mod txsize;

#[doc(hidden)]
pub mod testutil;

pub use block::{CodingBlock, FrameSyntax, PartitionTree};
pub use config::EntropyConfig;
pub use error::{EntropyError, Result};
pub use frame::FrameHeader;
pub use pipeline::{EncodedFrame, FrameEncoder};
pub use sequence::SequenceHeader;
