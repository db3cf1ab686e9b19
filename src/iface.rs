//! External interfaces (§6): the narrow seams through which the host
//! multiplexer, CID framing, randomness, and diagnostics plug into the
//! engine. Everything here is a trait, not a global function or a
//! required concrete type, so a host can supply whatever
//! implementation fits its runtime.

use crate::context::Context;
use crate::error::ContextMatch;
use crate::ip::IpHeaderView;
use crate::tcp::TcpHeaderFields;

/// Supplies the one random value the engine ever needs: the initial
/// MSN seed for a brand-new context (§3, §6). Must never fail — the
/// error-handling table in §7 lists "Random callback failure" as
/// `never fails per contract`.
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;
}

/// A `rand`-backed `RandomSource` for hosts that don't need to bring
/// their own RNG: seeded from the OS on construction, reseedable for
/// tests.
#[derive(Debug, Clone)]
pub struct StdRngSource(rand::rngs::StdRng);

impl StdRngSource {
    pub fn from_os_entropy() -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::from_entropy())
    }

    pub fn from_seed(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for StdRngSource {
    fn next_u32(&mut self) -> u32 {
        use rand::RngCore;
        self.0.next_u32()
    }
}

/// Small/large-CID framing is an external concern (§6); the engine
/// only ever reserves its first-byte discriminator bits for it. A
/// `CidEmitter` writes the CID bytes a host's framing scheme needs
/// ahead of the compressed header this crate produces.
pub trait CidEmitter {
    fn write_cid(&mut self, cid: u16, buf: &mut [u8]) -> usize;
}

/// A side-effect-only diagnostic hook for per-packet hex dumps or
/// similar tooling; it cannot fail compression (§6, §7).
pub trait Tracer {
    fn trace_compressed(&mut self, format_name: &str, bytes: &[u8]);
}

/// A `Tracer` that does nothing, for hosts that don't need one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracer;

impl Tracer for NullTracer {
    fn trace_compressed(&mut self, _format_name: &str, _bytes: &[u8]) {}
}

/// Whether this profile can even be considered for a packet, before
/// any per-flow context exists (§6): must be a TCP segment, optionally
/// tunneled through IP-in-IP/IPv6-in-IPv4, with no fragmentation.
pub fn check_profile(ip_headers: &[IpHeaderView], transport_protocol: u8) -> bool {
    if transport_protocol != crate::ip::IpProto::Tcp as u8 {
        return false;
    }
    ip_headers.iter().all(|h| match h {
        IpHeaderView::V4(v4) => v4.ihl == 5 && !v4.is_fragment(),
        IpHeaderView::V6(_) => true,
    })
}

/// Whether a packet that already passed `check_profile` belongs to
/// `ctx`'s flow, and if so whether this profile can actually compress
/// it (§3 invariant I5, §6, §7's "Ineligible packet" row).
pub fn check_context(
    ctx: &Context,
    ip_headers: &[IpHeaderView],
    tcp: &TcpHeaderFields,
) -> ContextMatch {
    if ip_headers.len() != ctx.ip_stack.len() {
        return ContextMatch::NotBelongs;
    }
    for (header, entry) in ip_headers.iter().zip(ctx.ip_stack.iter()) {
        match (header, entry) {
            (IpHeaderView::V4(h), crate::context::IpStackEntry::V4(c)) => {
                if h.src_addr != c.src_addr || h.dst_addr != c.dst_addr {
                    return ContextMatch::NotBelongs;
                }
                if h.ihl != 5 || h.is_fragment() {
                    return ContextMatch::CannotCompress;
                }
            }
            (IpHeaderView::V6(h), crate::context::IpStackEntry::V6(c)) => {
                if h.src_addr != c.src_addr
                    || h.dst_addr != c.dst_addr
                    || h.flow_label != c.flow_label
                {
                    return ContextMatch::NotBelongs;
                }
            }
            _ => return ContextMatch::NotBelongs,
        }
    }
    if tcp.src_port != ctx.tcp.src_port || tcp.dst_port != ctx.tcp.dst_port {
        return ContextMatch::NotBelongs;
    }
    if tcp
        .options
        .iter()
        .any(|o| !crate::tcp::options::is_compressible(o))
    {
        return ContextMatch::CannotCompress;
    }
    ContextMatch::Belongs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CompressorState, IpIdBehavior, Ipv4ContextFields, TcpContext};
    use crate::tcp::options::OptionTable;
    use core::net::Ipv4Addr;

    fn sample_context() -> Context {
        Context {
            ip_stack: vec![crate::context::IpStackEntry::V4(Ipv4ContextFields {
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
            tcp: TcpContext::new(1000, 2000, 0, 0),
            msn: 1,
            state: CompressorState::Ir,
            options: OptionTable::new(),
            ttl_irregular_chain_flag: false,
        }
    }

    fn sample_tcp() -> TcpHeaderFields {
        TcpHeaderFields {
            src_port: 1000,
            dst_port: 2000,
            seq_number: 0,
            ack_number: 0,
            data_offset: 5,
            flags: Default::default(),
            window: 0,
            checksum: 0,
            urgent_ptr: 0,
            options: Vec::new(),
        }
    }

    fn sample_ip() -> Vec<IpHeaderView> {
        vec![IpHeaderView::V4(crate::ip::v4::Ipv4Fields {
            ihl: 5,
            dscp: 0,
            ecn: 0,
            total_len: 40,
            id: 1,
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
    fn matching_flow_belongs() {
        let ctx = sample_context();
        assert_eq!(
            check_context(&ctx, &sample_ip(), &sample_tcp()),
            ContextMatch::Belongs
        );
    }

    #[test]
    fn different_port_does_not_belong() {
        let ctx = sample_context();
        let mut tcp = sample_tcp();
        tcp.dst_port = 9999;
        assert_eq!(
            check_context(&ctx, &sample_ip(), &tcp),
            ContextMatch::NotBelongs
        );
    }

    #[test]
    fn profile_rejects_fragments() {
        let mut ip = sample_ip();
        if let IpHeaderView::V4(h) = &mut ip[0] {
            h.mf = true;
        }
        assert!(!check_profile(&ip, crate::ip::IpProto::Tcp as u8));
    }

    #[test]
    fn std_rng_source_is_deterministic_from_a_fixed_seed() {
        let mut a = StdRngSource::from_seed(42);
        let mut b = StdRngSource::from_seed(42);
        assert_eq!(a.next_u32(), b.next_u32());
    }
}
