//! Property-based checks (§8's P2-P6; P1 is approximated in-crate since
//! there is no decompressor to round-trip against). Each property
//! drives the public `compress` entry point over synthetic packet
//! streams rather than reaching into internals, except where the
//! property is explicitly about an internal data structure (P6).

use core::net::Ipv4Addr;

use proptest::prelude::*;
use rohc_tcp_compress::builder::compress;
use rohc_tcp_compress::context::{Context, IpIdBehavior, IpStackEntry, Ipv4ContextFields, TcpContext};
use rohc_tcp_compress::crc::CrcWidth;

const ACK: u8 = 0x10;

fn fresh_context(initial_ip_id: u16, initial_msn: u16) -> Context {
    Context::new(
        vec![IpStackEntry::V4(Ipv4ContextFields {
            src_addr: Ipv4Addr::new(192, 168, 1, 10),
            dst_addr: Ipv4Addr::new(203, 0, 113, 5),
            protocol: 6,
            dscp: 0,
            df: true,
            ttl: 64,
            last_ip_id: initial_ip_id,
            ip_id_behavior: IpIdBehavior::Unknown,
            last_ip_id_behavior: IpIdBehavior::Unknown,
        })],
        TcpContext::new(51000, 443, 1_000_000, 2_000_000),
        initial_msn,
    )
}

fn build_packet(ip_id: u16, seq: u32, ack: u32, flags: u8, payload_len: usize) -> Vec<u8> {
    let tcp_len = 20;
    let total_len = tcp_len + payload_len;
    let mut v = vec![
        0x45,
        0x00,
        (total_len >> 8) as u8,
        total_len as u8,
        (ip_id >> 8) as u8,
        ip_id as u8,
        0x40,
        0x00,
        64,
        6,
        0x00,
        0x00,
        192,
        168,
        1,
        10,
        203,
        0,
        113,
        5,
    ];
    let mut tcp = vec![0u8; 20];
    tcp[0..2].copy_from_slice(&51000u16.to_be_bytes());
    tcp[2..4].copy_from_slice(&443u16.to_be_bytes());
    tcp[4..8].copy_from_slice(&seq.to_be_bytes());
    tcp[8..12].copy_from_slice(&ack.to_be_bytes());
    tcp[12] = 5 << 4;
    tcp[13] = flags;
    tcp[14..16].copy_from_slice(&65535u16.to_be_bytes());
    v.extend_from_slice(&tcp);
    v.extend(core::iter::repeat(0xAB).take(payload_len));
    v
}

proptest! {
    /// P3: the MSN advances by exactly one per successfully compressed
    /// packet, wrapping mod 2^16, regardless of how each packet was
    /// classified.
    #[test]
    fn msn_is_monotonic_mod_2_16(
        initial_msn in any::<u16>(),
        deltas in proptest::collection::vec(1u32..2000, 1..40),
    ) {
        let mut ctx = fresh_context(1000, initial_msn);
        let mut dest = [0u8; 512];
        let mut seq = 1_000_000u32;
        let mut ip_id = 1000u16;

        for (i, delta) in deltas.iter().enumerate() {
            seq = seq.wrapping_add(*delta);
            ip_id = ip_id.wrapping_add(1);
            compress(&mut ctx, &build_packet(ip_id, seq, 2_000_000, ACK, 100), &mut dest).unwrap();
            let expected = initial_msn.wrapping_add(i as u16 + 1);
            prop_assert_eq!(ctx.msn, expected);
        }
    }

    /// P2: compressing the same packet from the same starting context
    /// twice (two independent clones) produces the same bytes and
    /// leaves both contexts in the same resulting state.
    #[test]
    fn compress_is_idempotent_given_the_same_start(
        ip_id in any::<u16>(),
        seq in any::<u32>(),
        ack in any::<u32>(),
        payload_len in 0usize..200,
    ) {
        let base = fresh_context(500, 7);
        let packet = build_packet(ip_id, seq, ack, ACK, payload_len);

        let mut ctx_a = base.clone();
        let mut ctx_b = base.clone();
        let mut dest_a = [0u8; 512];
        let mut dest_b = [0u8; 512];

        let out_a = compress(&mut ctx_a, &packet, &mut dest_a).unwrap();
        let out_b = compress(&mut ctx_b, &packet, &mut dest_b).unwrap();

        prop_assert_eq!(out_a, out_b);
        prop_assert_eq!(&dest_a[..out_a.header_len], &dest_b[..out_b.header_len]);
        prop_assert_eq!(ctx_a, ctx_b);
    }

    /// P4: recomputing an IR/IR-DYN packet's CRC-8 with the CRC byte
    /// (offset 2) zeroed reproduces the byte actually emitted there.
    #[test]
    fn ir_and_ir_dyn_crc_is_recoverable(
        ip_id_2 in any::<u16>(),
        seq_2 in any::<u32>(),
    ) {
        let mut ctx = fresh_context(1000, 3);
        let mut dest = [0u8; 512];

        let out1 = compress(&mut ctx, &build_packet(1000, 1_000_000, 2_000_000, ACK, 50), &mut dest).unwrap();
        prop_assert!(out1.forced_ir);
        let mut recomputed = dest[..out1.header_len].to_vec();
        let emitted_crc = recomputed[2];
        recomputed[2] = 0;
        prop_assert_eq!(CrcWidth::Crc8.compute(&recomputed), emitted_crc);

        // Second packet reaches FO and is built as IR-DYN; same CRC
        // offset and width.
        let out2 = compress(
            &mut ctx,
            &build_packet(ip_id_2, seq_2, 2_000_000, ACK, 50),
            &mut dest,
        )
        .unwrap();
        if !out2.forced_ir {
            let mut recomputed2 = dest[..out2.header_len].to_vec();
            let emitted_crc2 = recomputed2[2];
            recomputed2[2] = 0;
            prop_assert_eq!(CrcWidth::Crc8.compute(&recomputed2), emitted_crc2);
        }
    }

    /// P5: whatever format the classifier picks once `SO` is reached,
    /// its LSB window must cover the real seq/ack delta against the
    /// context as it stood before this packet. `classifier::classify`
    /// already asserts this internally in debug builds; driving many
    /// small-delta streams here exercises that assertion under varied
    /// input without ever tripping it.
    #[test]
    fn reaching_so_with_small_deltas_never_trips_format_self_consistency(
        deltas in proptest::collection::vec(1u32..50, 5..30),
    ) {
        let mut ctx = fresh_context(2000, 11);
        let mut dest = [0u8; 512];
        let mut seq = 5000u32;
        let mut ip_id = 2000u16;

        for delta in deltas {
            seq = seq.wrapping_add(delta);
            ip_id = ip_id.wrapping_add(1);
            compress(&mut ctx, &build_packet(ip_id, seq, 2_000_000, ACK, 40), &mut dest).unwrap();
        }
    }
}

/// P6: once a stable, already-established option kind set is in use,
/// later packets carrying the exact same options only ever reuse the
/// index (no value bytes) except for Timestamp/SACK, which this crate
/// always carries a fresh value for (§4.3). Exercised directly against
/// the option table rather than via bit-level decoding of the emitted
/// stream.
#[test]
fn stable_option_set_reuses_established_indices() {
    use rohc_tcp_compress::tcp::options::{OptionTable, INDEX_MSS, INDEX_WS};

    let mut table = OptionTable::new();
    assert!(!table.is_established(INDEX_MSS));
    assert!(!table.is_established(INDEX_WS));

    // First occurrence: both get allocated (already indexed) but not
    // yet established.
    let mss_idx = table.index_for(2).unwrap();
    let ws_idx = table.index_for(3).unwrap();
    assert_eq!(mss_idx, INDEX_MSS);
    assert_eq!(ws_idx, INDEX_WS);
    let mss_established_before_first = table.is_established(mss_idx);
    table.mark_established(mss_idx);
    table.mark_established(ws_idx);
    assert!(!mss_established_before_first);

    // Every later occurrence of the same kinds: already established,
    // no reallocation, same index.
    for _ in 0..5 {
        let idx = table.index_for(2).unwrap();
        assert_eq!(idx, mss_idx);
        assert!(table.is_established(idx));
    }
}
