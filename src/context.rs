//! The per-flow compression context (§3): the single piece of mutable
//! state `compress()` reads and updates on every packet.
//!
//! All fields are host byte order (invariant I1) — conversion to wire
//! byte order happens only in `builder`/`ip`/`bitstream` when bytes are
//! actually written out.

use core::net::{Ipv4Addr, Ipv6Addr};

use crate::tcp::options::OptionTable;
use crate::tcp::TcpHeaderSnapshot;

/// How an IPv4 header's Identification field is observed to behave
/// across packets (§3 invariant I3). `Unknown` is a transient,
/// first-packet-only state: once any other variant is observed the
/// context never returns to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpIdBehavior {
    Unknown,
    Zero,
    Sequential,
    SequentialSwapped,
    Random,
}

/// The compressor's coarse state machine (§4.5, §7): `IR` sends a full
/// header, `FO` a dynamic-chain-refresh header, `SO` the smallest
/// compressed-only formats. Any unsafe-for-decompressor change resets
/// to `IR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressorState {
    #[default]
    Ir,
    Fo,
    So,
}

impl CompressorState {
    /// Advances `IR -> FO -> SO`, staying at `SO` once reached. Call
    /// after every successful, non-forced-IR `compress()`.
    pub fn advance(self) -> Self {
        match self {
            CompressorState::Ir => CompressorState::Fo,
            CompressorState::Fo | CompressorState::So => CompressorState::So,
        }
    }
}

/// Per-flow IPv4 header context fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4ContextFields {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub protocol: u8,
    pub dscp: u8,
    pub df: bool,
    pub ttl: u8,
    pub last_ip_id: u16,
    pub ip_id_behavior: IpIdBehavior,
    pub last_ip_id_behavior: IpIdBehavior,
}

/// Per-flow IPv6 header context fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6ContextFields {
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
    pub next_header: u8,
    pub dscp: u8,
    pub flow_label: u32,
    pub ttl: u8,
    /// Extension sub-contexts for this header's tunnel chain, in wire
    /// order (§4.2): each tracks the static fields and, for GRE/AH, the
    /// last sequence number seen.
    pub extensions: Vec<crate::ip::ext::ExtContext>,
}

/// One entry in the context's IP header stack, outer to inner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpStackEntry {
    V4(Ipv4ContextFields),
    V6(Ipv6ContextFields),
}

impl IpStackEntry {
    pub fn ttl(&self) -> u8 {
        match self {
            IpStackEntry::V4(f) => f.ttl,
            IpStackEntry::V6(f) => f.ttl,
        }
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        match self {
            IpStackEntry::V4(f) => f.ttl = ttl,
            IpStackEntry::V6(f) => f.ttl = ttl,
        }
    }
}

/// Per-flow TCP context fields (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpContext {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub old_tcp_header: TcpHeaderSnapshot,
    pub ecn_used: bool,
    pub ack_stride: u16,
    pub seq_scaled: u32,
    pub seq_residue: u32,
    pub ack_scaled: u32,
    pub ack_residue: u32,
    pub tcp_last_seq_number: u32,
    pub tcp_seq_number_change_count: u32,
    /// TSval/TSecr last seen on the Timestamp option, if any (§4.3):
    /// the reference each side's next `ts_lsb` call is encoded against.
    pub last_ts_val: u32,
    pub last_ts_ecr: u32,
}

impl TcpContext {
    pub fn new(src_port: u16, dst_port: u16, seq_number: u32, ack_number: u32) -> Self {
        Self {
            src_port,
            dst_port,
            seq_number,
            ack_number,
            old_tcp_header: TcpHeaderSnapshot::default(),
            ecn_used: false,
            ack_stride: 0,
            seq_scaled: 0,
            seq_residue: 0,
            ack_scaled: 0,
            ack_residue: 0,
            tcp_last_seq_number: seq_number,
            tcp_seq_number_change_count: 0,
            last_ts_val: 0,
            last_ts_ecr: 0,
        }
    }
}

/// The full per-flow compression context (§3). Owns its IP stack and
/// TCP option table exclusively; no back-references, no shared
/// ownership — see the crate-level design notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub ip_stack: Vec<IpStackEntry>,
    pub tcp: TcpContext,
    pub msn: u16,
    pub state: CompressorState,
    pub options: OptionTable,
    pub ttl_irregular_chain_flag: bool,
}

impl Context {
    /// Builds a fresh context from the first packet's IP stack shape
    /// and TCP header, seeding the MSN from `initial_msn` (the host
    /// supplies this via `iface::RandomSource`, §6).
    pub fn new(ip_stack: Vec<IpStackEntry>, tcp: TcpContext, initial_msn: u16) -> Self {
        Self {
            ip_stack,
            tcp,
            msn: initial_msn,
            state: CompressorState::Ir,
            options: OptionTable::new(),
            ttl_irregular_chain_flag: false,
        }
    }

    /// Folds one successfully compressed packet's fields back into the
    /// context (§4.5 "Commit", invariant I2): `old_tcp_header` becomes
    /// the packet just sent, each IP entry's `last_ip_id`/`ttl`/
    /// `last_ip_id_behavior` are updated, the scaled residues are
    /// recomputed from `payload_len` (the seq stride) and the observed
    /// ack delta (the ack stride), and the MSN advances by one
    /// (mod 2^16, property P3).
    pub fn commit(
        &mut self,
        new_ip_headers: &[crate::ip::IpHeaderView],
        new_tcp: &crate::tcp::TcpHeaderFields,
        payload_len: usize,
    ) {
        debug_assert_eq!(new_ip_headers.len(), self.ip_stack.len());

        for (entry, header) in self.ip_stack.iter_mut().zip(new_ip_headers) {
            match (entry, header) {
                (IpStackEntry::V4(ctx), crate::ip::IpHeaderView::V4(h)) => {
                    ctx.last_ip_id_behavior = ctx.ip_id_behavior;
                    ctx.ip_id_behavior = crate::ip::classify_ip_id(h.id, ctx.last_ip_id);
                    ctx.last_ip_id = h.id;
                    ctx.ttl = h.ttl;
                    ctx.df = h.df;
                    ctx.dscp = h.dscp;
                }
                (IpStackEntry::V6(ctx), crate::ip::IpHeaderView::V6(h)) => {
                    ctx.ttl = h.hop_limit;
                    ctx.dscp = h.dscp;
                    ctx.flow_label = h.flow_label;
                }
                _ => {}
            }
        }

        let ecn_seen = new_ip_headers.iter().any(|h| match h {
            crate::ip::IpHeaderView::V4(h) => h.ecn != 0,
            crate::ip::IpHeaderView::V6(h) => h.ecn != 0,
        }) || new_tcp.flags.ece
            || new_tcp.flags.cwr;
        self.tcp.ecn_used = self.tcp.ecn_used || ecn_seen;

        let seq_scaled = crate::codec::ScaledValue::compute(new_tcp.seq_number, payload_len as u32);
        self.tcp.seq_scaled = seq_scaled.scaled;
        self.tcp.seq_residue = seq_scaled.residue;

        let stride_delta = crate::codec::observed_stride(self.tcp.ack_number, new_tcp.ack_number);
        if stride_delta != 0 {
            self.tcp.ack_stride = stride_delta;
        }
        let ack_scaled =
            crate::codec::ScaledValue::compute(new_tcp.ack_number, self.tcp.ack_stride as u32);
        self.tcp.ack_scaled = ack_scaled.scaled;
        self.tcp.ack_residue = ack_scaled.residue;

        self.tcp.old_tcp_header = new_tcp.snapshot();
        if new_tcp.seq_number != self.tcp.tcp_last_seq_number {
            self.tcp.tcp_seq_number_change_count += 1;
            self.tcp.tcp_last_seq_number = new_tcp.seq_number;
        }
        self.tcp.seq_number = new_tcp.seq_number;
        self.tcp.ack_number = new_tcp.ack_number;
        if let Some(crate::tcp::options::TcpOptionElement::Timestamp { val, ecr }) = new_tcp
            .options
            .iter()
            .find(|o| matches!(o, crate::tcp::options::TcpOptionElement::Timestamp { .. }))
        {
            self.tcp.last_ts_val = *val;
            self.tcp.last_ts_ecr = *ecr;
        }

        self.msn = self.msn.wrapping_add(1);
        self.state = self.state.advance();
    }

    /// Forces the next `compress()` call to emit a full `IR` packet,
    /// per §7's unsafe-for-decompressor-change rule.
    pub fn force_ir(&mut self) {
        self.state = CompressorState::Ir;
    }
}
