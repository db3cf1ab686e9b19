//! Packet-format classifier (component C4, §4.4): decides which of
//! the ~20 compressed shapes a given packet can use against the
//! current context, without yet emitting any bytes.

use crate::codec::lsb_window_covers;
use crate::context::{Context, IpIdBehavior, IpStackEntry};
use crate::format::{self, PacketFormat};
use crate::ip::IpHeaderView;
use crate::tcp::TcpHeaderFields;

/// Everything the classifier needs to see about one packet, already
/// parsed (`packet::parse_packet`'s output plus the context it would
/// compress against).
pub struct ClassifyInput<'a> {
    pub ip_headers: &'a [IpHeaderView],
    pub tcp: &'a TcpHeaderFields,
    pub ctx: &'a Context,
    /// TCP payload length of this packet, the scaling factor
    /// `seq_scaled` fields are computed against (§4.1).
    pub payload_len: usize,
}

fn innermost_ipv4_behavior(ctx: &Context) -> Option<IpIdBehavior> {
    match ctx.ip_stack.last() {
        Some(IpStackEntry::V4(f)) => Some(f.ip_id_behavior),
        _ => None,
    }
}

fn innermost_ipv4_last_id(ctx: &Context) -> Option<u16> {
    match ctx.ip_stack.last() {
        Some(IpStackEntry::V4(f)) => Some(f.last_ip_id),
        _ => None,
    }
}

fn innermost_ipv4_new(ip_headers: &[IpHeaderView]) -> Option<&crate::ip::v4::Ipv4Fields> {
    match ip_headers.last() {
        Some(IpHeaderView::V4(h)) => Some(h),
        _ => None,
    }
}

/// Whether any of §4.4's "must use `co_common`" conditions hold.
fn forces_co_common(input: &ClassifyInput) -> bool {
    let old = input.ctx.tcp.old_tcp_header;
    let new = input.tcp;

    if new.flags.ack != old.flags.ack || new.flags.urg != old.flags.urg {
        return true;
    }
    if new.flags.urg {
        return true;
    }
    if new.flags.ece != old.flags.ece || new.flags.cwr != old.flags.cwr {
        return true;
    }
    if input.ctx.ttl_irregular_chain_flag {
        return true;
    }
    if let (Some(new_v4), Some(old_behavior), Some(last_id)) = (
        innermost_ipv4_new(input.ip_headers),
        innermost_ipv4_behavior(input.ctx),
        innermost_ipv4_last_id(input.ctx),
    ) {
        let observed = crate::ip::classify_ip_id(new_v4.id, last_id);
        if observed != old_behavior {
            return true;
        }
        if let Some(IpStackEntry::V4(prev)) = input.ctx.ip_stack.last() {
            if new_v4.df != prev.df {
                return true;
            }
        }
    }
    if (new.seq_number >> 16) != (old.seq_number >> 16) {
        return true;
    }
    if (new.ack_number >> 16) != (old.ack_number >> 16) {
        return true;
    }
    false
}

/// Whether this packet is unsafe to describe with anything but a full
/// `IR` resync (§7): a new tunneled header appeared, the innermost
/// IPv4's IP-ID behavior changed from what the context last saw, or
/// the URG flag was raised (a rare-enough event that losing sync over
/// it is not worth risking).
pub fn requires_ir_resync(ctx: &Context, ip_headers: &[IpHeaderView], tcp: &TcpHeaderFields) -> bool {
    if ip_headers.len() != ctx.ip_stack.len() {
        return true;
    }
    if tcp.flags.urg {
        return true;
    }
    if let (Some(new_v4), Some(old_behavior), Some(last_id)) = (
        innermost_ipv4_new(ip_headers),
        innermost_ipv4_behavior(ctx),
        innermost_ipv4_last_id(ctx),
    ) {
        let observed = crate::ip::classify_ip_id(new_v4.id, last_id);
        if observed != old_behavior && old_behavior != IpIdBehavior::Unknown {
            return true;
        }
    }
    false
}

/// Picks the packet family (`seq_*` vs `rnd_*`) the innermost IP
/// header's observed IP-ID behavior selects.
fn family_priority(input: &ClassifyInput) -> [PacketFormat; 8] {
    match innermost_ipv4_behavior(input.ctx) {
        Some(IpIdBehavior::Sequential) | Some(IpIdBehavior::SequentialSwapped) => {
            format::SEQ_PRIORITY
        }
        Some(IpIdBehavior::Zero) | Some(IpIdBehavior::Random) => format::RND_PRIORITY,
        // IPv6-only (or not-yet-classified) flows have no IP-ID to
        // desynchronize on; treat them like a sequential IPv4 flow.
        Some(IpIdBehavior::Unknown) | None => format::SEQ_PRIORITY,
    }
}

/// Runs component C4 end to end: returns the first format (in
/// priority order) whose LSB windows actually cover this packet's
/// real seq/ack deltas, or `CoCommon` if a forcing condition applies
/// or nothing in the family fits.
pub fn classify(input: ClassifyInput) -> PacketFormat {
    if forces_co_common(&input) {
        return PacketFormat::CoCommon;
    }

    let seq_reference = input.ctx.tcp.seq_number;
    let ack_reference = input.ctx.tcp.ack_number;
    let seq_stride = input.payload_len as u32;
    let ack_stride = input.ctx.tcp.ack_stride as u32;

    for format in family_priority(&input) {
        let seq_ok = if format::seq_is_scaled(format) {
            scaled_field_covers(
                format::seq_field_spec(format),
                seq_stride,
                input.ctx.tcp.seq_scaled,
                input.tcp.seq_number,
            )
        } else {
            match format::seq_field_spec(format) {
                Some(spec) => {
                    lsb_window_covers(spec.k, spec.p, seq_reference, input.tcp.seq_number, 32)
                }
                None => input.tcp.seq_number == seq_reference,
            }
        };
        if !seq_ok {
            continue;
        }

        let ack_ok = if format::ack_is_scaled(format) {
            scaled_field_covers(
                format::ack_field_spec(format),
                ack_stride,
                input.ctx.tcp.ack_scaled,
                input.tcp.ack_number,
            )
        } else {
            match format::ack_field_spec(format) {
                Some(spec) => {
                    lsb_window_covers(spec.k, spec.p, ack_reference, input.tcp.ack_number, 32)
                }
                None => input.tcp.ack_number == ack_reference,
            }
        };
        if !ack_ok {
            continue;
        }

        if !ip_id_field_covers(format::ip_id_field_spec(format), &input) {
            continue;
        }

        debug_assert!(
            format_self_consistent(format, &input, seq_stride),
            "classifier picked a format whose window does not cover the real delta"
        );
        return format;
    }

    PacketFormat::CoCommon
}

/// Checks a `seq_*` format's `ip_id` field window (`rnd_*`'s `None`
/// spec, and a non-IPv4 innermost header, both trivially pass — there
/// is no field to check). The offset an encoder/decoder agree on is
/// `ip_id - msn` (or the byte-swapped variant), which stays constant
/// packet to packet while IP-ID tracks MSN; the window just needs to
/// cover this packet's offset against the one implied by the last
/// committed IP-ID and MSN.
fn ip_id_field_covers(spec: Option<format::FieldSpec>, input: &ClassifyInput) -> bool {
    let Some(spec) = spec else { return true };
    let (behavior, last_id) = match input.ctx.ip_stack.last() {
        Some(IpStackEntry::V4(f)) => (f.ip_id_behavior, f.last_ip_id),
        _ => return true,
    };
    let new_id = match input.ip_headers.last() {
        Some(IpHeaderView::V4(h)) => h.id,
        _ => return true,
    };
    let reference = crate::codec::ip_id_lsb(behavior, 32, last_id, input.ctx.msn.wrapping_sub(1));
    let actual = crate::codec::ip_id_lsb(behavior, 32, new_id, input.ctx.msn);
    lsb_window_covers(spec.k, spec.p, reference, actual, 16)
}

/// Checks a scaled field's window: the stride must be established
/// (nonzero) and the candidate's `(k, p)` window must cover this
/// packet's scaled quotient, referenced against the context's last
/// committed quotient.
fn scaled_field_covers(spec: Option<format::FieldSpec>, stride: u32, reference: u32, raw: u32) -> bool {
    if stride == 0 {
        return false;
    }
    let Some(spec) = spec else { return false };
    let scaled = raw / stride;
    lsb_window_covers(spec.k, spec.p, reference, scaled, 32)
}

/// Property P5 (format self-consistency), checked as a debug
/// assertion right where the classifier makes its choice.
fn format_self_consistent(format: PacketFormat, input: &ClassifyInput, seq_stride: u32) -> bool {
    match format::seq_field_spec(format) {
        Some(spec) if format::seq_is_scaled(format) => {
            let scaled = input.tcp.seq_number / seq_stride.max(1);
            lsb_window_covers(spec.k, spec.p, input.ctx.tcp.seq_scaled, scaled, 32)
        }
        Some(spec) => lsb_window_covers(spec.k, spec.p, input.ctx.tcp.seq_number, input.tcp.seq_number, 32),
        None => input.tcp.seq_number == input.ctx.tcp.seq_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CompressorState, Ipv4ContextFields, TcpContext};
    use crate::tcp::options::OptionTable;
    use core::net::Ipv4Addr;

    fn base_context(seq: u32, ack: u32) -> Context {
        Context {
            ip_stack: vec![IpStackEntry::V4(Ipv4ContextFields {
                src_addr: Ipv4Addr::new(10, 0, 0, 1),
                dst_addr: Ipv4Addr::new(10, 0, 0, 2),
                protocol: 6,
                dscp: 0,
                df: true,
                ttl: 64,
                last_ip_id: 100,
                ip_id_behavior: IpIdBehavior::Sequential,
                last_ip_id_behavior: IpIdBehavior::Sequential,
            })],
            tcp: TcpContext::new(1000, 2000, seq, ack),
            msn: 10,
            state: CompressorState::So,
            options: OptionTable::new(),
            ttl_irregular_chain_flag: false,
        }
    }

    fn sample_tcp(seq: u32, ack: u32) -> TcpHeaderFields {
        TcpHeaderFields {
            src_port: 1000,
            dst_port: 2000,
            seq_number: seq,
            ack_number: ack,
            data_offset: 5,
            flags: crate::tcp::TcpFlags { ack: true, ..Default::default() },
            window: 0,
            checksum: 0,
            urgent_ptr: 0,
            options: Vec::new(),
        }
    }

    fn sample_ip(id: u16) -> Vec<IpHeaderView> {
        vec![IpHeaderView::V4(crate::ip::v4::Ipv4Fields {
            ihl: 5,
            dscp: 0,
            ecn: 0,
            total_len: 40,
            id,
            df: true,
            mf: false,
            fragment_offset: 0,
            ttl: 64,
            protocol: 6,
            checksum: 0,
            src_addr: Ipv4Addr::new(10, 0, 0, 1),
            dst_addr: Ipv4Addr::new(10, 0, 0, 2),
        })]
    }

    #[test]
    fn small_forward_delta_picks_a_seq_format_not_co_common() {
        let mut ctx = base_context(1_000_000, 500);
        ctx.tcp.old_tcp_header = crate::tcp::TcpHeaderSnapshot {
            ack_number: 500,
            flags: crate::tcp::TcpFlags { ack: true, ..Default::default() },
            ..Default::default()
        };
        let tcp = sample_tcp(1_000_010, 500);
        let ip = sample_ip(101);
        let format = classify(ClassifyInput { ip_headers: &ip, tcp: &tcp, ctx: &ctx, payload_len: 10 });
        assert_ne!(format, PacketFormat::CoCommon);
    }

    #[test]
    fn urg_flag_forces_co_common() {
        let ctx = base_context(1000, 500);
        let mut tcp = sample_tcp(1000, 500);
        tcp.flags.urg = true;
        let ip = sample_ip(101);
        let format = classify(ClassifyInput { ip_headers: &ip, tcp: &tcp, ctx: &ctx, payload_len: 10 });
        assert_eq!(format, PacketFormat::CoCommon);
    }

    #[test]
    fn huge_seq_jump_forces_co_common() {
        let ctx = base_context(1000, 500);
        let tcp = sample_tcp(1000 + 1_000_000, 500);
        let ip = sample_ip(101);
        let format = classify(ClassifyInput { ip_headers: &ip, tcp: &tcp, ctx: &ctx, payload_len: 10 });
        assert_eq!(format, PacketFormat::CoCommon);
    }

    #[test]
    fn ip_id_jump_outside_every_seq_window_falls_back_to_co_common() {
        let ctx = base_context(1000, 500);
        let tcp = sample_tcp(1000, 500);
        // seq_8's ip_id(4,3) is the widest window in the family (other
        // than rnd_*, which this Sequential flow never selects); a
        // jump far past it exhausts every seq_* candidate.
        let ip = sample_ip(100u16.wrapping_add(5000));
        let format = classify(ClassifyInput { ip_headers: &ip, tcp: &tcp, ctx: &ctx, payload_len: 10 });
        assert_eq!(format, PacketFormat::CoCommon);
    }
}
