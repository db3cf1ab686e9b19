//! IPv6 header parsing for component C2's chain walker.
//!
//! Field layout per RFC 8200; parsed explicitly into host-order fields
//! rather than an overlay struct (see the note in `v4.rs`).

use core::net::Ipv6Addr;

use super::IpProto;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ipv6ParseError {
    #[error("IPv6 header truncated: need at least 40 bytes, have {0}")]
    Truncated(usize),
    #[error("IPv6 version field is {0}, expected 6")]
    WrongVersion(u8),
}

/// A parsed IPv6 fixed header, host byte order throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Fields {
    pub dscp: u8,
    pub ecn: u8,
    pub flow_label: u32,
    pub payload_len: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
}

impl Ipv6Fields {
    pub const LEN: usize = 40;

    pub fn parse(data: &[u8]) -> Result<(Self, usize), Ipv6ParseError> {
        if data.len() < Self::LEN {
            return Err(Ipv6ParseError::Truncated(data.len()));
        }
        let version = data[0] >> 4;
        if version != 6 {
            return Err(Ipv6ParseError::WrongVersion(version));
        }
        let traffic_class = ((data[0] & 0x0F) << 4) | (data[1] >> 4);
        let flow_label = (((data[1] & 0x0F) as u32) << 16)
            | ((data[2] as u32) << 8)
            | (data[3] as u32);
        let payload_len = u16::from_be_bytes([data[4], data[5]]);
        let next_header = data[6];
        let hop_limit = data[7];
        let mut src = [0u8; 16];
        src.copy_from_slice(&data[8..24]);
        let mut dst = [0u8; 16];
        dst.copy_from_slice(&data[24..40]);

        Ok((
            Self {
                dscp: traffic_class >> 2,
                ecn: traffic_class & 0x03,
                flow_label,
                payload_len,
                next_header,
                hop_limit,
                src_addr: Ipv6Addr::from(src),
                dst_addr: Ipv6Addr::from(dst),
            },
            Self::LEN,
        ))
    }

    pub fn next_header_enum(&self) -> Option<IpProto> {
        IpProto::try_from(self.next_header).ok()
    }

    /// Which IPv6 static chain variant applies, per §4.2: `static1` is
    /// used when the flow label is zero (it's then omitted from the
    /// dynamic chain as well), `static2` otherwise.
    pub fn uses_static1(&self) -> bool {
        self.flow_label == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut v = vec![0u8; 40];
        v[0] = 0x60;
        v[4..6].copy_from_slice(&100u16.to_be_bytes());
        v[6] = 6; // TCP
        v[7] = 64;
        v[8..24].copy_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        v[24..40].copy_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        v
    }

    #[test]
    fn parses_fixed_header() {
        let data = sample();
        let (hdr, len) = Ipv6Fields::parse(&data).unwrap();
        assert_eq!(len, 40);
        assert_eq!(hdr.next_header, 6);
        assert_eq!(hdr.hop_limit, 64);
        assert!(hdr.uses_static1());
        assert_eq!(hdr.src_addr, Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1));
    }

    #[test]
    fn flow_label_disables_static1() {
        let mut data = sample();
        data[1] = 0x0A;
        let (hdr, _) = Ipv6Fields::parse(&data).unwrap();
        assert!(!hdr.uses_static1());
        assert_eq!(hdr.flow_label, 0x0A_00);
    }

    #[test]
    fn rejects_wrong_version() {
        let mut data = sample();
        data[0] = 0x40;
        assert!(matches!(
            Ipv6Fields::parse(&data),
            Err(Ipv6ParseError::WrongVersion(4))
        ));
    }
}
