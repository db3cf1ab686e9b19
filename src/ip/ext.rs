//! IPv6 extension header sub-contexts and their static/dynamic/
//! irregular chain fragments (§4.2).
//!
//! Only the kinds the profile actually compresses are modeled; an
//! extension header outside this set makes the packet ineligible
//! (`ContextMatch::CannotCompress`, see `crate::ip::walk`).

use crate::bitstream::BitWriter;
use crate::codec::lsb;

/// One parsed IPv6 extension header, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionHeader {
    HopByHop { next_header: u8, options: Vec<u8> },
    Routing { next_header: u8, routing_type: u8, segments_left: u8, data: Vec<u8> },
    Destination { next_header: u8, options: Vec<u8> },
    Gre(GreHeader),
    Mime { next_header: u8 },
    Ah(AhHeader),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreHeader {
    pub c_flag: bool,
    pub k_flag: bool,
    pub s_flag: bool,
    pub key: Option<u32>,
    pub sequence: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AhHeader {
    pub spi: u32,
    pub sequence: u32,
}

/// Per-extension-header context state the compressor remembers across
/// packets, mirroring `context::IpStackEntry`'s role for the fixed
/// IPv4/IPv6 headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtContext {
    HopByHop,
    Routing,
    Destination,
    Gre { c_flag: bool, k_flag: bool, s_flag: bool, last_sequence: u32 },
    Mime,
    Ah { spi: u32, last_sequence: u32 },
}

impl ExtContext {
    pub fn from_header(header: &ExtensionHeader) -> Self {
        match header {
            ExtensionHeader::HopByHop { .. } => ExtContext::HopByHop,
            ExtensionHeader::Routing { .. } => ExtContext::Routing,
            ExtensionHeader::Destination { .. } => ExtContext::Destination,
            ExtensionHeader::Gre(gre) => ExtContext::Gre {
                c_flag: gre.c_flag,
                k_flag: gre.k_flag,
                s_flag: gre.s_flag,
                last_sequence: gre.sequence.unwrap_or(0),
            },
            ExtensionHeader::Mime { .. } => ExtContext::Mime,
            ExtensionHeader::Ah(ah) => ExtContext::Ah { spi: ah.spi, last_sequence: ah.sequence },
        }
    }

    /// Static chain bytes: identifying fields that never change for
    /// the life of the flow (GRE's c/k/s flags, AH's SPI).
    pub fn write_static(&self, w: &mut BitWriter) {
        match self {
            ExtContext::Gre { c_flag, k_flag, s_flag, .. } => {
                w.write_bit(*c_flag);
                w.write_bit(*k_flag);
                w.write_bit(*s_flag);
                w.write_bits(0, 5); // reserved padding to a byte boundary
            }
            ExtContext::Ah { spi, .. } => w.write_u32_be(*spi),
            ExtContext::HopByHop | ExtContext::Routing | ExtContext::Destination | ExtContext::Mime => {}
        }
    }

    /// Irregular chain bytes: GRE/AH sequence numbers, encoded with a
    /// 1-bit discriminator choosing between a 7-bit and 31-bit LSB
    /// against the cached last sequence (§4.2).
    pub fn write_irregular(&mut self, w: &mut BitWriter, current_sequence: Option<u32>) {
        let Some(seq) = current_sequence else { return };
        let last = match self {
            ExtContext::Gre { last_sequence, .. } | ExtContext::Ah { last_sequence, .. } => {
                *last_sequence
            }
            _ => return,
        };
        let delta = seq.wrapping_sub(last) & 0x7FFF_FFFF;
        if delta < (1 << 7) {
            w.write_bit(false);
            w.write_bits(lsb(7, seq) as u64, 7);
        } else {
            w.write_bit(true);
            w.write_bits((seq & 0x7FFF_FFFF) as u64, 31);
        }
        match self {
            ExtContext::Gre { last_sequence, .. } | ExtContext::Ah { last_sequence, .. } => {
                *last_sequence = seq;
            }
            _ => {}
        }
    }
}

/// Parses one extension header from the front of `data`, given the
/// `next_header` value that named it. Returns the header and the
/// number of bytes it occupies, or `None` if `kind` isn't one of the
/// recognized extension kinds (caller treats that as chain end).
pub fn parse_one(kind: u8, data: &[u8]) -> Option<(ExtensionHeader, usize)> {
    match kind {
        0 => parse_generic_ext(data, |next_header, options| ExtensionHeader::HopByHop {
            next_header,
            options,
        }),
        60 => parse_generic_ext(data, |next_header, options| ExtensionHeader::Destination {
            next_header,
            options,
        }),
        43 => {
            if data.len() < 4 {
                return None;
            }
            let next_header = data[0];
            let hdr_ext_len = data[1] as usize;
            let len = (hdr_ext_len + 1) * 8;
            if data.len() < len {
                return None;
            }
            let routing_type = data[2];
            let segments_left = data[3];
            Some((
                ExtensionHeader::Routing {
                    next_header,
                    routing_type,
                    segments_left,
                    data: data[4..len].to_vec(),
                },
                len,
            ))
        }
        47 => parse_gre(data),
        51 => parse_ah(data),
        _ => None,
    }
}

fn parse_generic_ext(
    data: &[u8],
    make: impl Fn(u8, Vec<u8>) -> ExtensionHeader,
) -> Option<(ExtensionHeader, usize)> {
    if data.len() < 8 {
        return None;
    }
    let next_header = data[0];
    let hdr_ext_len = data[1] as usize;
    let len = (hdr_ext_len + 1) * 8;
    if data.len() < len {
        return None;
    }
    Some((make(next_header, data[2..len].to_vec()), len))
}

fn parse_gre(data: &[u8]) -> Option<(ExtensionHeader, usize)> {
    if data.len() < 4 {
        return None;
    }
    let c_flag = data[0] & 0x80 != 0;
    let k_flag = data[0] & 0x20 != 0;
    let s_flag = data[0] & 0x10 != 0;
    let mut offset = 4;
    if c_flag {
        offset += 4;
    }
    let key = if k_flag {
        if data.len() < offset + 4 {
            return None;
        }
        let v = u32::from_be_bytes(data[offset..offset + 4].try_into().ok()?);
        offset += 4;
        Some(v)
    } else {
        None
    };
    let sequence = if s_flag {
        if data.len() < offset + 4 {
            return None;
        }
        let v = u32::from_be_bytes(data[offset..offset + 4].try_into().ok()?);
        offset += 4;
        Some(v)
    } else {
        None
    };
    Some((ExtensionHeader::Gre(GreHeader { c_flag, k_flag, s_flag, key, sequence }), offset))
}

fn parse_ah(data: &[u8]) -> Option<(ExtensionHeader, usize)> {
    if data.len() < 12 {
        return None;
    }
    let payload_len = data[1] as usize;
    let len = (payload_len + 2) * 4;
    if data.len() < len {
        return None;
    }
    let spi = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    let sequence = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    Some((ExtensionHeader::Ah(AhHeader { spi, sequence }), len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gre_with_key_and_sequence() {
        let mut data = vec![0x30, 0x00, 0x08, 0x00]; // K and S flags set
        data.extend_from_slice(&0xAABBCCDDu32.to_be_bytes());
        data.extend_from_slice(&42u32.to_be_bytes());
        let (hdr, len) = parse_gre(&data).unwrap();
        assert_eq!(len, 12);
        match hdr {
            ExtensionHeader::Gre(g) => {
                assert_eq!(g.key, Some(0xAABBCCDD));
                assert_eq!(g.sequence, Some(42));
            }
            _ => panic!("expected GRE"),
        }
    }

    #[test]
    fn parses_ah_header() {
        let mut data = vec![6, 4, 0, 0];
        data.extend_from_slice(&0x1234u32.to_be_bytes());
        data.extend_from_slice(&7u32.to_be_bytes());
        data.extend_from_slice(&[0u8; 12]);
        let (hdr, len) = parse_ah(&data).unwrap();
        assert_eq!(len, 24);
        match hdr {
            ExtensionHeader::Ah(ah) => {
                assert_eq!(ah.spi, 0x1234);
                assert_eq!(ah.sequence, 7);
            }
            _ => panic!("expected AH"),
        }
    }

    #[test]
    fn irregular_sequence_picks_short_form_for_small_delta() {
        let mut ctx = ExtContext::Ah { spi: 1, last_sequence: 100 };
        let mut w = BitWriter::new();
        ctx.write_irregular(&mut w, Some(105));
        w.align_to_byte();
        assert_eq!(w.into_vec()[0] & 0x80, 0);
    }
}
