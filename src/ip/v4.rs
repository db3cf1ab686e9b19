//! IPv4 header parsing and the static/dynamic/irregular chain builders
//! for component C2.
//!
//! Field layout per RFC 791:
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Version|  IHL  |Type of Service|          Total Length         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Identification        |Flags|      Fragment Offset    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Time to Live |    Protocol   |         Header Checksum       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Source Address                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Destination Address                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Parsing reads each field explicitly rather than overlaying a struct
//! on the wire bytes: an IPv4 header carries no enum-valued byte that
//! would make an overlay unsound here, but doing it field-by-field
//! keeps this module and the compressed-format writers in `builder`
//! using the same style, per the crate's bit-writer convention.

use core::net::Ipv4Addr;

use super::IpProto;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ipv4ParseError {
    #[error("IPv4 header truncated: need at least 20 bytes, have {0}")]
    Truncated(usize),
    #[error("IPv4 IHL {0} is smaller than the minimum header size")]
    IhlTooSmall(u8),
    #[error("IPv4 IHL {0} claims more bytes than the slice contains")]
    IhlTooLarge(u8),
    #[error("IPv4 version field is {0}, expected 4")]
    WrongVersion(u8),
}

/// A parsed IPv4 header, host byte order throughout (invariant I1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Fields {
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub total_len: u16,
    pub id: u16,
    pub df: bool,
    pub mf: bool,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
}

impl Ipv4Fields {
    pub const MIN_LEN: usize = 20;

    pub fn parse(data: &[u8]) -> Result<(Self, usize), Ipv4ParseError> {
        if data.len() < Self::MIN_LEN {
            return Err(Ipv4ParseError::Truncated(data.len()));
        }
        let version = data[0] >> 4;
        if version != 4 {
            return Err(Ipv4ParseError::WrongVersion(version));
        }
        let ihl = data[0] & 0x0F;
        if ihl < 5 {
            return Err(Ipv4ParseError::IhlTooSmall(ihl));
        }
        let header_len = ihl as usize * 4;
        if data.len() < header_len {
            return Err(Ipv4ParseError::IhlTooLarge(ihl));
        }
        let tos = data[1];
        let total_len = u16::from_be_bytes([data[2], data[3]]);
        let id = u16::from_be_bytes([data[4], data[5]]);
        let flags_fragment = u16::from_be_bytes([data[6], data[7]]);
        let ttl = data[8];
        let protocol = data[9];
        let checksum = u16::from_be_bytes([data[10], data[11]]);
        let src_addr = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let dst_addr = Ipv4Addr::new(data[16], data[17], data[18], data[19]);

        Ok((
            Self {
                ihl,
                dscp: tos >> 2,
                ecn: tos & 0x03,
                total_len,
                id,
                df: flags_fragment & 0x4000 != 0,
                mf: flags_fragment & 0x2000 != 0,
                fragment_offset: flags_fragment & 0x1FFF,
                ttl,
                protocol,
                checksum,
                src_addr,
                dst_addr,
            },
            header_len,
        ))
    }

    pub fn is_fragment(&self) -> bool {
        self.mf || self.fragment_offset != 0
    }

    pub fn protocol_enum(&self) -> Option<IpProto> {
        IpProto::try_from(self.protocol).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        vec![
            0x45, 0x00, 0x00, 0x3C, 0x1C, 0x46, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 192, 168, 1,
            1, 192, 168, 1, 2,
        ]
    }

    #[test]
    fn parses_minimal_header() {
        let data = sample();
        let (hdr, len) = Ipv4Fields::parse(&data).unwrap();
        assert_eq!(len, 20);
        assert_eq!(hdr.ihl, 5);
        assert_eq!(hdr.protocol, 6);
        assert!(hdr.df);
        assert!(!hdr.is_fragment());
        assert_eq!(hdr.src_addr, Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut data = sample();
        data[0] = 0x65;
        assert!(matches!(
            Ipv4Fields::parse(&data),
            Err(Ipv4ParseError::WrongVersion(6))
        ));
    }

    #[test]
    fn rejects_truncated() {
        let data = sample();
        assert!(matches!(
            Ipv4Fields::parse(&data[..10]),
            Err(Ipv4ParseError::Truncated(10))
        ));
    }
}
