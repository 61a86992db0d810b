use proptest::prelude::*;

use wav1c_entropy::cdf::{Cdf, CdfContext, PARTITION_CONTEXTS};
use wav1c_entropy::context::Neighbors;
use wav1c_entropy::mode::{InterpFilter, IntraMode, RefFrame};
use wav1c_entropy::msac::MsacEncoder;
use wav1c_entropy::neighbor::NeighborInfo;
use wav1c_entropy::primitive::{write_refsubexpfin, write_signed_refsubexpfin};
use wav1c_entropy::size::{BlockSize, PartitionType};
use wav1c_entropy::testutil::{MsacDecoder, read_refsubexpfin, read_signed_refsubexpfin};
use wav1c_entropy::{
    CodingBlock, EntropyConfig, EntropyError, FrameEncoder, FrameHeader, FrameSyntax, PartitionTree,
    SequenceHeader,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn skipped_frame(superblocks: usize) -> FrameSyntax {
    FrameSyntax {
        superblocks: (0..superblocks)
            .map(|_| PartitionTree::single(CodingBlock::skipped(BlockSize::Block64x64)))
            .collect(),
        restoration: Default::default(),
    }
}

fn read_leb128(data: &[u8]) -> (usize, usize) {
    let mut value = 0;
    for (i, &b) in data.iter().enumerate() {
        value |= ((b & 0x7F) as usize) << (7 * i);
        if b & 0x80 == 0 {
            return (value, i + 1);
        }
    }
    panic!("unterminated leb128");
}

/// Splits a temporal unit into (header byte, payload) pairs.
fn split_obus(mut data: &[u8]) -> Vec<(u8, &[u8])> {
    let mut obus = Vec::new();
    while !data.is_empty() {
        let header = data[0];
        assert_eq!(header & 0x02, 0x02, "size field always present");
        let (size, len) = read_leb128(&data[1..]);
        let start = 1 + len;
        obus.push((header, &data[start..start + size]));
        data = &data[start + size..];
    }
    obus
}

/// Checks the first symbols of a tile holding one skipped 64x64 DC block.
fn assert_skipped_superblock(tile: &[u8], base_q_idx: u8) {
    let mut cdfs = CdfContext::for_qidx(base_q_idx);
    let mut dec = MsacDecoder::new(tile, true);
    assert_eq!(dec.decode_symbol(&mut cdfs.partition[12]), PartitionType::None as usize);
    assert!(dec.decode_bool(&mut cdfs.skip[0]));
    assert_eq!(dec.decode_symbol(&mut cdfs.kf_y_mode[0][0]), IntraMode::Dc as usize);
}

#[test]
fn key_frame_temporal_unit_layout() {
    init_tracing();
    let mut enc = FrameEncoder::new(SequenceHeader::new(64, 64), EntropyConfig::default()).unwrap();
    let fh = FrameHeader::key_frame(100);
    let frame = enc.encode_frame(&fh, &skipped_frame(1)).unwrap();

    let obus = split_obus(&frame.obus);
    let headers: Vec<u8> = obus.iter().map(|(h, _)| *h).collect();
    assert_eq!(headers, vec![0x12, 0x0A, 0x32]);
    assert!(obus[0].1.is_empty());
    assert_eq!(obus[1].1, &enc.sequence_header().encode().unwrap()[..]);

    assert_eq!(frame.row_bits.len(), 1);
    assert!(frame.row_bits[0] > 0);
    let payload = obus[2].1;
    assert!(frame.tile_bytes > 0 && frame.tile_bytes < payload.len());
    assert_skipped_superblock(&payload[payload.len() - frame.tile_bytes..], 100);
}

#[test]
fn key_frames_restart_from_default_contexts() {
    let mut enc = FrameEncoder::new(SequenceHeader::new(64, 64), EntropyConfig::default()).unwrap();
    let fh = FrameHeader::key_frame(60);
    let first = enc.encode_frame(&fh, &skipped_frame(1)).unwrap();
    let second = enc.encode_frame(&fh, &skipped_frame(1)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn tiles_are_size_prefixed_in_raster_order() {
    init_tracing();
    let config = EntropyConfig {
        tile_cols_log2: 1,
        tile_rows_log2: 1,
        worker_threads: 2,
        ..Default::default()
    };
    let mut enc = FrameEncoder::new(SequenceHeader::new(128, 128), config).unwrap();
    assert_eq!(enc.layout().num_tiles(), 4);
    let frame = enc.encode_frame(&FrameHeader::key_frame(100), &skipped_frame(4)).unwrap();
    assert_eq!(frame.row_bits.len(), 2);
    assert!(frame.row_bits.iter().all(|&b| b > 0));

    let obus = split_obus(&frame.obus);
    let payload = obus.last().unwrap().1;
    let mut data = &payload[payload.len() - frame.tile_bytes..];
    let mut tiles = Vec::new();
    for _ in 0..3 {
        let size = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize + 1;
        tiles.push(&data[4..4 + size]);
        data = &data[4 + size..];
    }
    tiles.push(data);

    // Identical content and fresh contexts per tile give identical tiles.
    for tile in &tiles {
        assert_eq!(*tile, tiles[0]);
        assert_skipped_superblock(tile, 100);
    }
}

#[test]
fn row_path_output_is_independent_of_thread_count() {
    init_tracing();
    let seq = SequenceHeader::new(64, 256);
    let syntax = skipped_frame(4);
    let fh = FrameHeader::key_frame(120);
    let mut reference = None;
    for threads in [0, 1, 2, 4] {
        let config = EntropyConfig {
            worker_threads: threads,
            ..Default::default()
        };
        let mut enc = FrameEncoder::new(seq.clone(), config).unwrap();
        let frame = enc.encode_frame(&fh, &syntax).unwrap();
        assert_eq!(frame.row_bits.len(), 4);
        assert!(frame.row_bits.iter().all(|&b| b > 0));
        match &reference {
            None => reference = Some(frame),
            Some(r) => assert_eq!(r, &frame, "{threads} threads"),
        }
    }
}

#[test]
fn superblock_count_must_cover_the_frame() {
    let mut enc = FrameEncoder::new(SequenceHeader::new(128, 64), EntropyConfig::default()).unwrap();
    let err = enc.encode_frame(&FrameHeader::key_frame(100), &skipped_frame(1)).unwrap_err();
    assert!(matches!(err, EntropyError::InvalidConfig(_)));
}

#[test]
fn tile_data_beyond_capacity_overflows() {
    let config = EntropyConfig {
        output_capacity: Some(1),
        ..Default::default()
    };
    let mut enc = FrameEncoder::new(SequenceHeader::new(256, 256), config).unwrap();
    let err = enc.encode_frame(&FrameHeader::key_frame(100), &skipped_frame(16)).unwrap_err();
    assert!(matches!(err, EntropyError::BufferOverflow { capacity: 1, .. }));
}

#[test]
fn shown_existing_frames_are_a_bare_frame_header() {
    let enc = FrameEncoder::new(SequenceHeader::new(64, 64), EntropyConfig::default()).unwrap();
    let mut fh = FrameHeader::key_frame(100);
    assert!(enc.show_existing(&fh).is_err());
    fh.show_existing_frame = true;
    fh.frame_to_show_map_idx = 5;
    let obus = enc.show_existing(&fh).unwrap();
    let obus = split_obus(&obus);
    assert_eq!(obus.len(), 2);
    assert_eq!(obus[1].0, 0x1A);
    // show_existing_frame, then the 3-bit slot index.
    assert_eq!(obus[1].1[0] >> 4, 0b1101);
}

#[test]
fn superblock_grid_follows_the_sequence_header() {
    let mut seq = SequenceHeader::new(256, 128);
    seq.use_128x128_superblock = true;
    let mut enc = FrameEncoder::new(seq, EntropyConfig::default()).unwrap();
    assert_eq!(enc.layout().sb_shift, 5);
    assert_eq!(enc.layout().sb_rows(), 1);
    // eight 64x64 trees would cover the frame, but it holds two superblocks
    let err = enc.encode_frame(&FrameHeader::key_frame(100), &skipped_frame(8)).unwrap_err();
    assert!(matches!(err, EntropyError::InvalidConfig(_)));
}

fn neighbor() -> impl Strategy<Value = Option<NeighborInfo>> {
    let modes = vec![
        IntraMode::Dc,
        IntraMode::V,
        IntraMode::H,
        IntraMode::D45,
        IntraMode::D135,
        IntraMode::D113,
        IntraMode::D157,
        IntraMode::D203,
        IntraMode::D67,
        IntraMode::Smooth,
        IntraMode::SmoothV,
        IntraMode::SmoothH,
        IntraMode::Paeth,
    ];
    let filters = vec![InterpFilter::Regular, InterpFilter::Smooth, InterpFilter::Sharp];
    let second = prop_oneof![Just(RefFrame::Intra), prop::sample::select(RefFrame::INTER.to_vec())];
    prop::option::of(
        (
            prop::sample::select(BlockSize::all().to_vec()),
            any::<(bool, bool, bool)>(),
            prop::sample::select(RefFrame::INTER.to_vec()),
            second,
            prop::sample::select(modes),
            prop::sample::select(filters),
            0u8..8,
        )
            .prop_map(|(bsize, (is_inter, skip, skip_mode), first, second, y_mode, filter, segment_id)| {
                NeighborInfo {
                    bsize,
                    is_inter,
                    skip,
                    skip_mode: skip_mode && is_inter,
                    ref_frames: if is_inter { [first, second] } else { [RefFrame::Intra; 2] },
                    y_mode: if is_inter { IntraMode::Dc } else { y_mode },
                    interp: [filter; 2],
                    segment_id,
                }
            }),
    )
}

proptest! {
    #[test]
    fn neighbour_contexts_stay_in_range(
        above in neighbor(),
        left in neighbor(),
        compound in any::<bool>(),
        dir in 0usize..2,
    ) {
        let nb = Neighbors::new(above, left);
        prop_assert!(nb.skip_ctx() < 3);
        prop_assert!(nb.skip_mode_ctx() < 3);
        prop_assert!(nb.intra_inter_ctx() < 4);
        prop_assert!(nb.comp_inter_ctx() < 5);
        prop_assert!(nb.comp_ref_type_ctx() < 5);
        let (a, l) = nb.kf_y_mode_ctx();
        prop_assert!(a < 5 && l < 5);
        let refs = if compound { [RefFrame::Last, RefFrame::Alt] } else { [RefFrame::Golden, RefFrame::Intra] };
        prop_assert!(nb.interp_ctx(dir, refs) < 16);
        for bsize in [
            BlockSize::Block8x8,
            BlockSize::Block16x16,
            BlockSize::Block32x32,
            BlockSize::Block64x64,
            BlockSize::Block128x128,
        ] {
            prop_assert!(nb.partition_ctx(bsize) < PARTITION_CONTEXTS);
        }
    }

    #[test]
    fn adaptation_keeps_tables_valid(n in 2usize..=16, symbols in prop::collection::vec(0usize..16, 1..200)) {
        let mut cdf = Cdf::uniform(n);
        for s in symbols {
            let s = s % n;
            let before = cdf.probability(s);
            cdf.adapt(s);
            prop_assert!(cdf.is_valid());
            prop_assert!(cdf.probability(s) >= before);
        }
    }

    #[test]
    fn symbols_survive_the_range_coder(
        n in 2usize..=16,
        symbols in prop::collection::vec(0usize..16, 1..300),
        allow_update in any::<bool>(),
    ) {
        let mut enc = MsacEncoder::new();
        enc.allow_update_cdf = allow_update;
        let mut cdf = Cdf::uniform(n);
        for &s in &symbols {
            enc.encode_symbol(s % n, &mut cdf);
        }
        let bytes = enc.finalize();

        let mut dec = MsacDecoder::new(&bytes, allow_update);
        let mut dec_cdf = Cdf::uniform(n);
        for &s in &symbols {
            prop_assert_eq!(dec.decode_symbol(&mut dec_cdf), s % n);
        }
        prop_assert_eq!(cdf, dec_cdf);
    }

    #[test]
    fn golomb_and_literals_interleave(values in prop::collection::vec((0u32..5000, 0u32..256), 1..64)) {
        let mut enc = MsacEncoder::new();
        for &(g, lit) in &values {
            enc.encode_golomb(g);
            enc.encode_literal(lit, 8);
        }
        let bytes = enc.finalize();
        let mut dec = MsacDecoder::new(&bytes, true);
        for &(g, lit) in &values {
            prop_assert_eq!(dec.decode_golomb(), g);
            prop_assert_eq!(dec.decode_literal(8), lit);
        }
    }

    #[test]
    fn reference_subexp_codes_decode(n in 1u32..300, k in 0u32..4, seed in any::<(u32, u32)>()) {
        let reference = seed.0 % n;
        let v = seed.1 % n;
        let mut enc = MsacEncoder::new();
        write_refsubexpfin(&mut enc, n, k, reference, v);
        let bytes = enc.finalize();
        let mut dec = MsacDecoder::new(&bytes, true);
        prop_assert_eq!(read_refsubexpfin(&mut dec, n, k, reference), v);
    }

    #[test]
    fn signed_subexp_codes_decode(n in 2u32..200, k in 0u32..4, reference in -199i32..200, v in -199i32..200) {
        let max = n as i32 - 1;
        let reference = reference.clamp(-max, max);
        let v = v.clamp(-max, max);
        let mut enc = MsacEncoder::new();
        write_signed_refsubexpfin(&mut enc, n, k, reference, v);
        let bytes = enc.finalize();
        let mut dec = MsacDecoder::new(&bytes, true);
        prop_assert_eq!(read_signed_refsubexpfin(&mut dec, n, k, reference), v);
    }
}
