use byteorder::{ByteOrder, LittleEndian};

use crate::bitwriter::BitWriter;
use crate::error::{EntropyError, Result};
use crate::frame::{FrameHeader, TileLayout};
use crate::header::{TILE_SIZE_BYTES, write_frame_header};
use crate::sequence::SequenceHeader;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObuType {
    SequenceHeader = 1,
    TemporalDelimiter = 2,
    FrameHeader = 3,
    Frame = 6,
}

pub fn leb128_encode(mut value: u64) -> Vec<u8> {
    let mut result = Vec::new();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        result.push(byte);
        if value == 0 {
            break;
        }
    }
    result
}

/// Wraps `payload` with `obu_has_size_field` set and no extension byte.
pub fn obu_wrap(obu_type: ObuType, payload: &[u8]) -> Vec<u8> {
    let size_bytes = leb128_encode(payload.len() as u64);
    let mut result = Vec::with_capacity(1 + size_bytes.len() + payload.len());
    result.push((obu_type as u8) << 3 | 1 << 1);
    result.extend_from_slice(&size_bytes);
    result.extend_from_slice(payload);
    result
}

/// Appends coded tiles in tile raster order. Every tile but the last is
/// preceded by its size minus one in `TILE_SIZE_BYTES` little-endian bytes.
pub fn write_tiles(out: &mut Vec<u8>, tiles: &[Vec<u8>]) -> Result<()> {
    let last = tiles.len().saturating_sub(1);
    for (i, tile) in tiles.iter().enumerate() {
        if i < last {
            let size = u32::try_from(tile.len())
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| EntropyError::InvalidConfig(format!("tile {i} has {} bytes", tile.len())))?;
            let mut prefix = [0u8; TILE_SIZE_BYTES];
            LittleEndian::write_u32(&mut prefix, size);
            out.extend_from_slice(&prefix);
        }
        out.extend_from_slice(tile);
    }
    Ok(())
}

/// Payload of a frame OBU: the uncompressed header, a tile group header
/// covering every tile, then the tiles.
pub fn frame_payload(
    seq: &SequenceHeader,
    fh: &FrameHeader,
    layout: &TileLayout,
    tiles: &[Vec<u8>],
) -> Result<Vec<u8>> {
    let mut w = BitWriter::new();
    write_frame_header(&mut w, seq, fh, layout)?;
    w.byte_align();
    if tiles.len() > 1 {
        w.write_bit(false); // tile_start_and_end_present_flag
    }
    let mut payload = w.finalize();
    let tile_bytes: usize = tiles.iter().map(Vec::len).sum();
    payload.reserve(tile_bytes + TILE_SIZE_BYTES * tiles.len());
    write_tiles(&mut payload, tiles)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leb128_zero() {
        assert_eq!(leb128_encode(0), vec![0x00]);
    }

    #[test]
    fn leb128_127() {
        assert_eq!(leb128_encode(127), vec![0x7F]);
    }

    #[test]
    fn leb128_300() {
        assert_eq!(leb128_encode(300), vec![0xAC, 0x02]);
    }

    #[test]
    fn obu_temporal_delimiter() {
        let result = obu_wrap(ObuType::TemporalDelimiter, &[]);
        assert_eq!(result, vec![0x12, 0x00]);
    }

    #[test]
    fn frame_header_obu_type() {
        let result = obu_wrap(ObuType::FrameHeader, &[0x10]);
        assert_eq!(result, vec![0x1A, 0x01, 0x10]);
    }

    #[test]
    fn size_field_counts_long_payloads() {
        let result = obu_wrap(ObuType::Frame, &[0xAA; 200]);
        assert_eq!(&result[..3], &[0x32, 0xC8, 0x01]);
        assert_eq!(result.len(), 203);
    }

    #[test]
    fn non_final_tiles_carry_size_prefixes() {
        let tiles = vec![vec![1u8; 3], vec![2u8; 300], vec![3u8; 5]];
        let mut out = Vec::new();
        write_tiles(&mut out, &tiles).unwrap();
        assert_eq!(&out[..4], &[2, 0, 0, 0]);
        assert_eq!(&out[4..7], &[1, 1, 1]);
        assert_eq!(&out[7..11], &[0x2B, 0x01, 0, 0]);
        assert_eq!(out.len(), 4 + 3 + 4 + 300 + 5);
        assert_eq!(&out[out.len() - 5..], &[3; 5]);
    }

    #[test]
    fn single_tile_has_no_prefix() {
        let mut out = Vec::new();
        write_tiles(&mut out, &[vec![9u8; 7]]).unwrap();
        assert_eq!(out, vec![9u8; 7]);
    }

    #[test]
    fn empty_tiles_are_rejected() {
        let mut out = Vec::new();
        assert!(write_tiles(&mut out, &[Vec::new(), vec![1]]).is_err());
    }
}
