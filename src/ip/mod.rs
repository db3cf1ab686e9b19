pub mod ext;
pub mod v4;
pub mod v6;

use crate::bitstream::BitWriter;
use crate::context::{IpIdBehavior, IpStackEntry, Ipv4ContextFields, Ipv6ContextFields};
use v4::Ipv4Fields;
use v6::Ipv6Fields;

/// One parsed header in the IP stack the walker found, outer to inner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpHeaderView {
    V4(Ipv4Fields),
    V6(Ipv6Fields),
}

/// The full parsed IP header stack for one packet plus where its
/// transport header starts (component C2's primary output).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpStack {
    pub headers: Vec<IpHeaderView>,
    pub extensions: Vec<Vec<ext::ExtensionHeader>>,
    pub transport_protocol: u8,
    pub transport_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IpWalkError {
    #[error("IPv4 header: {0}")]
    V4(v4::Ipv4ParseError),
    #[error("IPv6 header: {0}")]
    V6(v6::Ipv6ParseError),
    #[error("unrecognized IP version nibble {0}")]
    UnknownVersion(u8),
    #[error("stack ends without reaching a transport header")]
    NoTransportHeader,
}

/// Walks a (possibly tunneled) IP header stack until it reaches a
/// non-tunneling next-header value (TCP), per §4.2. IPv6 extension
/// headers belonging to the innermost IPv6 header are parsed and
/// returned alongside it.
pub fn walk(data: &[u8]) -> Result<IpStack, IpWalkError> {
    let mut headers = Vec::new();
    let mut extensions = Vec::new();
    let mut offset = 0usize;
    let mut next_protocol;

    loop {
        if data.len() <= offset {
            return Err(IpWalkError::NoTransportHeader);
        }
        let version = data[offset] >> 4;
        match version {
            4 => {
                let (hdr, len) = Ipv4Fields::parse(&data[offset..]).map_err(IpWalkError::V4)?;
                next_protocol = hdr.protocol;
                offset += len;
                headers.push(IpHeaderView::V4(hdr));
                extensions.push(Vec::new());
            }
            6 => {
                let (hdr, len) = Ipv6Fields::parse(&data[offset..]).map_err(IpWalkError::V6)?;
                offset += len;
                let mut exts = Vec::new();
                let mut kind = hdr.next_header;
                loop {
                    match ext::parse_one(kind, &data[offset..]) {
                        Some((header, ext_len)) => {
                            kind = match &header {
                                ext::ExtensionHeader::HopByHop { next_header, .. }
                                | ext::ExtensionHeader::Destination { next_header, .. }
                                | ext::ExtensionHeader::Routing { next_header, .. }
                                | ext::ExtensionHeader::Mime { next_header } => *next_header,
                                ext::ExtensionHeader::Gre(_) => IpProto::Tcp as u8,
                                ext::ExtensionHeader::Ah(_) => IpProto::Tcp as u8,
                            };
                            exts.push(header);
                            offset += ext_len;
                        }
                        None => break,
                    }
                }
                next_protocol = kind;
                headers.push(IpHeaderView::V6(hdr));
                extensions.push(exts);
            }
            other => return Err(IpWalkError::UnknownVersion(other)),
        }

        if next_protocol != IpProto::Ipv4 as u8 && next_protocol != IpProto::Ipv6 as u8 {
            return Ok(IpStack {
                headers,
                extensions,
                transport_protocol: next_protocol,
                transport_offset: offset,
            });
        }
    }
}

/// Writes the static chain for one IP header (§4.2): identifying
/// fields fixed for the flow's lifetime.
pub fn write_static_chain(header: &IpHeaderView, w: &mut BitWriter) {
    match header {
        IpHeaderView::V4(h) => {
            w.write_u8(4 << 4);
            w.write_u8(h.protocol);
            w.write_bytes(&h.src_addr.octets());
            w.write_bytes(&h.dst_addr.octets());
        }
        IpHeaderView::V6(h) => {
            if h.uses_static1() {
                w.write_u8(6 << 4);
            } else {
                w.write_u8((6 << 4) | 0x01);
                w.write_bits(h.flow_label as u64, 20);
                w.align_to_byte();
            }
            w.write_u8(h.next_header);
            w.write_bytes(&h.src_addr.octets());
            w.write_bytes(&h.dst_addr.octets());
        }
    }
}

/// Writes the dynamic chain for one IP header (§4.2): DSCP/ECN, TTL,
/// and (IPv4) IP-ID behavior/value. `is_innermost` headers never carry
/// an IP-ID here — that lives in the base header instead.
pub fn write_dynamic_chain(
    header: &IpHeaderView,
    entry: &IpStackEntry,
    is_innermost: bool,
    w: &mut BitWriter,
) {
    match (header, entry) {
        (IpHeaderView::V4(h), IpStackEntry::V4(ctx)) => {
            w.write_u8((h.dscp << 2) | h.ecn);
            w.write_bit(h.df);
            w.write_bit(false); // reserved
            w.write_bits(0, 6);
            w.write_u8(h.ttl);
            let behavior = match ctx.ip_id_behavior {
                IpIdBehavior::Zero => 0u8,
                _ => 1u8, // non-innermost/tunneled IPv4 is restricted to {Random, Zero}
            };
            w.write_bits(behavior as u64, 2);
            w.write_bits(0, 6);
            if !is_innermost {
                w.write_u16_be(h.id);
            }
        }
        (IpHeaderView::V6(h), IpStackEntry::V6(ctx)) => {
            w.write_u8((h.dscp << 2) | h.ecn);
            w.write_u8(h.hop_limit);
            let _ = ctx;
        }
        _ => {}
    }
}

/// Writes one header's extension static chain (§4.2): a count byte
/// followed by each extension's kind tag (its IP protocol number) and
/// static bytes, so a decompressor knows how many sub-contexts to
/// expect and of which kind.
pub fn write_extensions_static(extensions: &[ext::ExtensionHeader], w: &mut BitWriter) {
    w.write_u8(extensions.len() as u8);
    for e in extensions {
        w.write_u8(ext_kind_tag(e));
        ext::ExtContext::from_header(e).write_static(w);
    }
}

/// Writes one header's extension irregular chain fragment (§4.2):
/// GRE/AH sequence numbers LSB-encoded against each sub-context's
/// cached last value, which is updated in place as a side effect.
pub fn write_extensions_irregular(
    current: &[ext::ExtensionHeader],
    contexts: &mut [ext::ExtContext],
    w: &mut BitWriter,
) {
    for (header, ctx) in current.iter().zip(contexts.iter_mut()) {
        let seq = match header {
            ext::ExtensionHeader::Gre(g) => g.sequence,
            ext::ExtensionHeader::Ah(ah) => Some(ah.sequence),
            _ => None,
        };
        ctx.write_irregular(w, seq);
    }
}

fn ext_kind_tag(e: &ext::ExtensionHeader) -> u8 {
    match e {
        ext::ExtensionHeader::HopByHop { .. } => IpProto::HopOpt as u8,
        ext::ExtensionHeader::Destination { .. } => IpProto::Ipv6Opts as u8,
        ext::ExtensionHeader::Routing { .. } => IpProto::Ipv6Route as u8,
        ext::ExtensionHeader::Gre(_) => IpProto::Gre as u8,
        // Never produced by `ext::parse_one` today; tagged for when a
        // MIME/minimal-encapsulation parser lands.
        ext::ExtensionHeader::Mime { .. } => IpProto::Mobile as u8,
        ext::ExtensionHeader::Ah(_) => IpProto::Ah as u8,
    }
}

/// Writes the irregular chain fragment for one IP header (§4.2): only
/// what the base header can't already recover.
///
/// The innermost header carries no DSCP/ECN/TTL here (those live in
/// the dynamic/base header instead) but, when it's IPv4 with `Random`
/// IP-ID behavior, emits the full 16-bit IP-ID — the one case the
/// base header itself has no field for (`rnd_*` formats carry no
/// `ip_id` field at all, §4.4). Non-innermost headers carry the
/// opposite split: DSCP/ECN (iff `ecn_used`) and TTL (iff
/// `ttl_irregular_chain_flag`), never an IP-ID.
pub fn write_irregular_chain(
    header: &IpHeaderView,
    is_innermost: bool,
    ecn_used: bool,
    ttl_irregular_chain_flag: bool,
    w: &mut BitWriter,
) {
    if is_innermost {
        if let IpHeaderView::V4(h) = header {
            if matches!(ip_id_behavior_of(h), IpIdBehavior::Random) {
                w.write_u16_be(h.id);
            }
        }
        return;
    }
    let (dscp, ecn, ttl) = match header {
        IpHeaderView::V4(h) => (h.dscp, h.ecn, h.ttl),
        IpHeaderView::V6(h) => (h.dscp, h.ecn, h.hop_limit),
    };
    if ecn_used {
        w.write_u8((dscp << 2) | ecn);
    }
    if ttl_irregular_chain_flag {
        w.write_u8(ttl);
    }
}

fn ip_id_behavior_of(h: &Ipv4Fields) -> IpIdBehavior {
    if h.id == 0 {
        IpIdBehavior::Zero
    } else {
        IpIdBehavior::Random
    }
}

impl IpHeaderView {
    /// Seeds a brand-new context entry from this packet's fields. With
    /// no prior IP-ID to compare against, behavior starts `Unknown`
    /// (invariant I3's transient state) and is refined once a second
    /// packet lets `classify_ip_id` compare a real delta.
    pub fn as_context_entry(&self) -> IpStackEntry {
        match self {
            IpHeaderView::V4(h) => IpStackEntry::V4(Ipv4ContextFields {
                src_addr: h.src_addr,
                dst_addr: h.dst_addr,
                protocol: h.protocol,
                dscp: h.dscp,
                df: h.df,
                ttl: h.ttl,
                last_ip_id: h.id,
                ip_id_behavior: IpIdBehavior::Unknown,
                last_ip_id_behavior: IpIdBehavior::Unknown,
            }),
            IpHeaderView::V6(h) => IpStackEntry::V6(Ipv6ContextFields {
                src_addr: h.src_addr,
                dst_addr: h.dst_addr,
                next_header: h.next_header,
                dscp: h.dscp,
                flow_label: h.flow_label,
                ttl: h.hop_limit,
                extensions: Vec::new(),
            }),
        }
    }
}

/// Seeds a brand-new context's full IP stack from a walked packet,
/// including each IPv6 header's extension sub-contexts (§4.2) — the
/// counterpart to `IpHeaderView::as_context_entry` for a whole `IpStack`
/// rather than one header at a time.
pub fn seed_context_stack(stack: &IpStack) -> Vec<IpStackEntry> {
    stack
        .headers
        .iter()
        .zip(stack.extensions.iter())
        .map(|(header, exts)| {
            let mut entry = header.as_context_entry();
            if let IpStackEntry::V6(fields) = &mut entry {
                fields.extensions = exts.iter().map(ext::ExtContext::from_header).collect();
            }
            entry
        })
        .collect()
}

/// Classifies an IP-ID's apparent behavior by comparing it against the
/// last IP-ID this context committed (invariant I3): a small forward
/// delta (0..=16, covering typical per-packet increments even past a
/// few reordered or dropped packets) means `Sequential`; the same
/// check against the byte-swapped values means `SequentialSwapped`
/// (some stacks increment the ID in the wrong half); an ID of zero
/// means `Zero`; anything else is `Random`. `Unknown` is only ever
/// returned by a brand-new context entry, never by this function.
pub fn classify_ip_id(new_ip_id: u16, last_ip_id: u16) -> IpIdBehavior {
    const MAX_FORWARD_DELTA: i32 = 16;
    if new_ip_id == 0 {
        return IpIdBehavior::Zero;
    }
    let delta = (new_ip_id as i32 - last_ip_id as i32).rem_euclid(1 << 16);
    if (0..=MAX_FORWARD_DELTA).contains(&delta) {
        return IpIdBehavior::Sequential;
    }
    let swapped_delta =
        (new_ip_id.swap_bytes() as i32 - last_ip_id.swap_bytes() as i32).rem_euclid(1 << 16);
    if (0..=MAX_FORWARD_DELTA).contains(&swapped_delta) {
        return IpIdBehavior::SequentialSwapped;
    }
    IpIdBehavior::Random
}

/// Protocol which is encapsulated in the IPv4 packet.
/// <https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml>
#[repr(u8)]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum IpProto {
    /// IPv6 Hop-by-Hop Option
    HopOpt = 0,
    /// Internet Control Message
    Icmp = 1,
    /// Internet Group Management
    Igmp = 2,
    /// Gateway-to-Gateway
    Ggp = 3,
    /// IPv4 encapsulation
    Ipv4 = 4,
    /// Stream
    Stream = 5,
    /// Transmission Control
    Tcp = 6,
    /// CBT
    Cbt = 7,
    /// Exterior Gateway Protocol
    Egp = 8,
    /// Any private interior gateway (used by Cisco for their IGRP)
    Igp = 9,
    /// BBN RCC Monitoring
    BbnRccMon = 10,
    /// Network Voice Protocol
    NvpII = 11,
    /// PUP
    Pup = 12,
    /// ARGUS
    Argus = 13,
    /// EMCON
    Emcon = 14,
    /// Cross Net Debugger
    Xnet = 15,
    /// Chaos
    Chaos = 16,
    /// User Datagram
    Udp = 17,
    /// Multiplexing
    Mux = 18,
    /// DCN Measurement Subsystems
    DcnMeas = 19,
    /// Host Monitoring
    Hmp = 20,
    /// Packet Radio Measurement
    Prm = 21,
    /// XEROX NS IDP
    Idp = 22,
    /// Trunk-1
    Trunk1 = 23,
    /// Trunk-2
    Trunk2 = 24,
    /// Leaf-1
    Leaf1 = 25,
    /// Leaf-2
    Leaf2 = 26,
    /// Reliable Data Protocol
    Rdp = 27,
    /// Internet Reliable Transaction
    Irtp = 28,
    /// ISO Transport Protocol Class 4
    Tp4 = 29,
    /// Bulk Data Transfer Protocol
    Netblt = 30,
    /// MFE Network Services Protocol
    MfeNsp = 31,
    /// MERIT Internodal Protocol
    MeritInp = 32,
    /// Datagram Congestion Control Protocol
    Dccp = 33,
    /// Third Party Connect Protocol
    ThirdPartyConnect = 34,
    /// Inter-Domain Policy Routing Protocol
    Idpr = 35,
    /// XTP
    Xtp = 36,
    /// Datagram Delivery Protocol
    Ddp = 37,
    /// IDPR Control Message Transport Proto
    IdprCmtp = 38,
    /// TP++ Transport Protocol
    TpPlusPlus = 39,
    /// IL Transport Protocol
    Il = 40,
    /// IPv6 encapsulation
    Ipv6 = 41,
    /// Source Demand Routing Protocol
    Sdrp = 42,
    /// Routing Header for IPv6
    Ipv6Route = 43,
    /// Fragment Header for IPv6
    Ipv6Frag = 44,
    /// Inter-Domain Routing Protocol
    Idrp = 45,
    /// Reservation Protocol
    Rsvp = 46,
    /// General Routing Encapsulation
    Gre = 47,
    /// Dynamic Source Routing Protocol
    Dsr = 48,
    /// BNA
    Bna = 49,
    /// Encap Security Payload
    Esp = 50,
    /// Authentication Header
    Ah = 51,
    /// Integrated Net Layer Security TUBA
    Inlsp = 52,
    /// IP with Encryption
    Swipe = 53,
    /// NBMA Address Resolution Protocol
    Narp = 54,
    /// IP Mobility
    Mobile = 55,
    /// Transport Layer Security Protocol using Kryptonet key management
    Tlsp = 56,
    /// SKIP
    Skip = 57,
    /// Internet Control Message Protocol for IPv6
    Ipv6Icmp = 58,
    /// No Next Header for IPv6
    Ipv6NoNxt = 59,
    /// Destination Options for IPv6
    Ipv6Opts = 60,
    /// Any host internal protocol
    AnyHostInternal = 61,
    /// CFTP
    Cftp = 62,
    /// Any local network
    AnyLocalNetwork = 63,
    /// SATNET and Backroom EXPAK
    SatExpak = 64,
    /// Kryptolan
    Kryptolan = 65,
    /// MIT Remote Virtual Disk Protocol
    Rvd = 66,
    /// Internet Pluribus Packet Core
    Ippc = 67,
    /// Any distributed file system
    AnyDistributedFileSystem = 68,
    /// SATNET Monitoring
    SatMon = 69,
    /// VISA Protocol
    Visa = 70,
    /// Internet Packet Core Utility
    Ipcv = 71,
    /// Computer Protocol Network Executive
    Cpnx = 72,
    /// Computer Protocol Heart Beat
    Cphb = 73,
    /// Wang Span Network
    Wsn = 74,
    /// Packet Video Protocol
    Pvp = 75,
    /// Backroom SATNET Monitoring
    BrSatMon = 76,
    /// SUN ND PROTOCOL-Temporary
    SunNd = 77,
    /// WIDEBAND Monitoring
    WbMon = 78,
    /// WIDEBAND EXPAK
    WbExpak = 79,
    /// ISO Internet Protocol
    IsoIp = 80,
    /// VMTP
    Vmtp = 81,
    /// SECURE-VMTP
    SecureVmtp = 82,
    /// VINES
    Vines = 83,
    /// Transaction Transport Protocol
    Ttp = 84,
    /// NSFNET-IGP
    NsfnetIgp = 85,
    /// Dissimilar Gateway Protocol
    Dgp = 86,
    /// TCF
    Tcf = 87,
    /// EIGRP
    Eigrp = 88,
    /// OSPFIGP
    Ospfigp = 89,
    /// Sprite RPC Protocol
    SpriteRpc = 90,
    /// Locus Address Resolution Protocol
    Larp = 91,
    /// Multicast Transport Protocol
    Mtp = 92,
    /// AX.25 Frames
    Ax25 = 93,
    /// IP-within-IP Encapsulation Protocol
    Ipip = 94,
    /// Mobile Internetworking Control Pro.
    Micp = 95,
    /// Semaphore Communications Sec. Pro.
    SccSp = 96,
    /// Ethernet-within-IP Encapsulation
    Etherip = 97,
    /// Encapsulation Header
    Encap = 98,
    /// Any private encryption scheme
    AnyPrivateEncryptionScheme = 99,
    /// GMTP
    Gmtp = 100,
    /// Ipsilon Flow Management Protocol
    Ifmp = 101,
    /// PNNI over IP
    Pnni = 102,
    /// Protocol Independent Multicast
    Pim = 103,
    /// ARIS
    Aris = 104,
    /// SCPS
    Scps = 105,
    /// QNX
    Qnx = 106,
    /// Active Networks
    ActiveNetworks = 107,
    /// IP Payload Compression Protocol
    IpComp = 108,
    /// Sitara Networks Protocol
    Snp = 109,
    /// Compaq Peer Protocol
    CompaqPeer = 110,
    /// IPX in IP
    IpxInIp = 111,
    /// Virtual Router Redundancy Protocol
    Vrrp = 112,
    /// PGM Reliable Transport Protocol
    Pgm = 113,
    /// Any 0-hop protocol
    AnyZeroHopProtocol = 114,
    /// Layer Two Tunneling Protocol
    L2tp = 115,
    /// D-II Data Exchange (DDX)
    Ddx = 116,
    /// Interactive Agent Transfer Protocol
    Iatp = 117,
    /// Schedule Transfer Protocol
    Stp = 118,
    /// SpectraLink Radio Protocol
    Srp = 119,
    /// UTI
    Uti = 120,
    /// Simple Message Protocol
    Smp = 121,
    /// Simple Multicast Protocol
    Sm = 122,
    /// Performance Transparency Protocol
    Ptp = 123,
    /// ISIS over IPv4
    IsisOverIpv4 = 124,
    /// FIRE
    Fire = 125,
    /// Combat Radio Transport Protocol
    Crtp = 126,
    /// Combat Radio User Datagram
    Crudp = 127,
    /// SSCOPMCE
    Sscopmce = 128,
    /// IPLT
    Iplt = 129,
    /// Secure Packet Shield
    Sps = 130,
    /// Private IP Encapsulation within IP
    Pipe = 131,
    /// Stream Control Transmission Protocol
    Sctp = 132,
    /// Fibre Channel
    Fc = 133,
    /// RSVP-E2E-IGNORE
    RsvpE2eIgnore = 134,
    /// Mobility Header
    MobilityHeader = 135,
    /// Lightweight User Datagram Protocol
    UdpLite = 136,
    /// MPLS-in-IP
    Mpls = 137,
    /// MANET Protocols
    Manet = 138,
    /// Host Identity Protocol
    Hip = 139,
    /// Shim6 Protocol
    Shim6 = 140,
    /// Wrapped Encapsulating Security Payload
    Wesp = 141,
    /// Robust Header Compression
    Rohc = 142,
    /// Ethernet in IPv4
    EthernetInIpv4 = 143,
    /// AGGFRAG encapsulation payload for ESP
    Aggfrag = 144,
    /// Use for experimentation and testing
    Test1 = 253,
    /// Use for experimentation and testing
    Test2 = 254,
    /// Reserved
    Reserved = 255,
}

impl TryFrom<u8> for IpProto {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use IpProto::*;
        Ok(match value {
            0 => HopOpt,
            1 => Icmp,
            2 => Igmp,
            3 => Ggp,
            4 => Ipv4,
            5 => Stream,
            6 => Tcp,
            7 => Cbt,
            8 => Egp,
            9 => Igp,
            10 => BbnRccMon,
            11 => NvpII,
            12 => Pup,
            13 => Argus,
            14 => Emcon,
            15 => Xnet,
            16 => Chaos,
            17 => Udp,
            18 => Mux,
            19 => DcnMeas,
            20 => Hmp,
            21 => Prm,
            22 => Idp,
            23 => Trunk1,
            24 => Trunk2,
            25 => Leaf1,
            26 => Leaf2,
            27 => Rdp,
            28 => Irtp,
            29 => Tp4,
            30 => Netblt,
            31 => MfeNsp,
            32 => MeritInp,
            33 => Dccp,
            34 => ThirdPartyConnect,
            35 => Idpr,
            36 => Xtp,
            37 => Ddp,
            38 => IdprCmtp,
            39 => TpPlusPlus,
            40 => Il,
            41 => Ipv6,
            42 => Sdrp,
            43 => Ipv6Route,
            44 => Ipv6Frag,
            45 => Idrp,
            46 => Rsvp,
            47 => Gre,
            48 => Dsr,
            49 => Bna,
            50 => Esp,
            51 => Ah,
            52 => Inlsp,
            53 => Swipe,
            54 => Narp,
            55 => Mobile,
            56 => Tlsp,
            57 => Skip,
            58 => Ipv6Icmp,
            59 => Ipv6NoNxt,
            60 => Ipv6Opts,
            61 => AnyHostInternal,
            62 => Cftp,
            63 => AnyLocalNetwork,
            64 => SatExpak,
            65 => Kryptolan,
            66 => Rvd,
            67 => Ippc,
            68 => AnyDistributedFileSystem,
            69 => SatMon,
            70 => Visa,
            71 => Ipcv,
            72 => Cpnx,
            73 => Cphb,
            74 => Wsn,
            75 => Pvp,
            76 => BrSatMon,
            77 => SunNd,
            78 => WbMon,
            79 => WbExpak,
            80 => IsoIp,
            81 => Vmtp,
            82 => SecureVmtp,
            83 => Vines,
            84 => Ttp,
            85 => NsfnetIgp,
            86 => Dgp,
            87 => Tcf,
            88 => Eigrp,
            89 => Ospfigp,
            90 => SpriteRpc,
            91 => Larp,
            92 => Mtp,
            93 => Ax25,
            94 => Ipip,
            95 => Micp,
            96 => SccSp,
            97 => Etherip,
            98 => Encap,
            99 => AnyPrivateEncryptionScheme,
            100 => Gmtp,
            101 => Ifmp,
            102 => Pnni,
            103 => Pim,
            104 => Aris,
            105 => Scps,
            106 => Qnx,
            107 => ActiveNetworks,
            108 => IpComp,
            109 => Snp,
            110 => CompaqPeer,
            111 => IpxInIp,
            112 => Vrrp,
            113 => Pgm,
            114 => AnyZeroHopProtocol,
            115 => L2tp,
            116 => Ddx,
            117 => Iatp,
            118 => Stp,
            119 => Srp,
            120 => Uti,
            121 => Smp,
            122 => Sm,
            123 => Ptp,
            124 => IsisOverIpv4,
            125 => Fire,
            126 => Crtp,
            127 => Crudp,
            128 => Sscopmce,
            129 => Iplt,
            130 => Sps,
            131 => Pipe,
            132 => Sctp,
            133 => Fc,
            134 => RsvpE2eIgnore,
            135 => MobilityHeader,
            136 => UdpLite,
            137 => Mpls,
            138 => Manet,
            139 => Hip,
            140 => Shim6,
            141 => Wesp,
            142 => Rohc,
            143 => EthernetInIpv4,
            144 => Aggfrag,
            253 => Test1,
            254 => Test2,
            255 => Reserved,
            other => return Err(other),
        })
    }
}