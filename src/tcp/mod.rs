//! TCP header parsing and the flag/snapshot types used throughout the
//! context and classifier.
//!
//! Field descriptions adapted from RFC 793; the wire layout matches
//! what the teacher crate documents for IPv4/IPv6 headers (§3).

pub mod options;

use options::TcpOptionElement;

/// The nine one-bit control flags of a TCP header (RFC 793 + the
/// ECN-nonce `ns` bit from RFC 3540 and ECE/CWR from RFC 3168).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    pub ns: bool,
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,
}

impl TcpFlags {
    fn from_bytes(data_offset_byte: u8, flags_byte: u8) -> Self {
        Self {
            ns: data_offset_byte & 1 != 0,
            fin: flags_byte & 0x01 != 0,
            syn: flags_byte & 0x02 != 0,
            rst: flags_byte & 0x04 != 0,
            psh: flags_byte & 0x08 != 0,
            ack: flags_byte & 0x10 != 0,
            urg: flags_byte & 0x20 != 0,
            ece: flags_byte & 0x40 != 0,
            cwr: flags_byte & 0x80 != 0,
        }
    }

    fn rsf_byte(&self) -> u8 {
        (self.rst as u8) | ((self.syn as u8) << 1) | ((self.fin as u8) << 2)
    }
}

/// The subset of a TCP header the classifier diffs against on every
/// packet (§3 `old_tcp_header`). Deliberately excludes options and the
/// checksum, which are handled by the option table and recomputed by
/// the decompressor respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpHeaderSnapshot {
    pub seq_number: u32,
    pub ack_number: u32,
    pub window: u16,
    pub urgent_ptr: u16,
    pub flags: TcpFlags,
}

/// A fully parsed TCP header, host byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeaderFields {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub data_offset: u8,
    pub flags: TcpFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
    pub options: Vec<TcpOptionElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TcpParseError {
    #[error("TCP header truncated: need at least 20 bytes, have {0}")]
    Truncated(usize),
    #[error("TCP data offset {0} is smaller than the minimum header size")]
    DataOffsetTooSmall(u8),
    #[error("TCP data offset {0} claims more bytes than the slice contains")]
    DataOffsetTooLarge(u8),
}

impl TcpHeaderFields {
    pub const MIN_LEN: usize = 20;

    /// Parses a TCP header (and its options) from the start of `data`,
    /// returning the header and the byte offset of the payload.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), TcpParseError> {
        if data.len() < Self::MIN_LEN {
            return Err(TcpParseError::Truncated(data.len()));
        }
        let src_port = u16::from_be_bytes([data[0], data[1]]);
        let dst_port = u16::from_be_bytes([data[2], data[3]]);
        let seq_number = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let ack_number = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        let data_offset = (data[12] & 0xF0) >> 4;
        if data_offset < 5 {
            return Err(TcpParseError::DataOffsetTooSmall(data_offset));
        }
        let header_len = data_offset as usize * 4;
        if data.len() < header_len {
            return Err(TcpParseError::DataOffsetTooLarge(data_offset));
        }
        let flags = TcpFlags::from_bytes(data[12], data[13]);
        let window = u16::from_be_bytes([data[14], data[15]]);
        let checksum = u16::from_be_bytes([data[16], data[17]]);
        let urgent_ptr = u16::from_be_bytes([data[18], data[19]]);
        let options = options::parse_options(&data[20..header_len]);

        Ok((
            Self {
                src_port,
                dst_port,
                seq_number,
                ack_number,
                data_offset,
                flags,
                window,
                checksum,
                urgent_ptr,
                options,
            },
            header_len,
        ))
    }

    pub fn snapshot(&self) -> TcpHeaderSnapshot {
        TcpHeaderSnapshot {
            seq_number: self.seq_number,
            ack_number: self.ack_number,
            window: self.window,
            urgent_ptr: self.urgent_ptr,
            flags: self.flags,
        }
    }

    pub fn rsf_byte(&self) -> u8 {
        self.flags.rsf_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header_bytes() -> Vec<u8> {
        let mut v = vec![0u8; 20];
        v[0..2].copy_from_slice(&5001u16.to_be_bytes());
        v[2..4].copy_from_slice(&44100u16.to_be_bytes());
        v[4..8].copy_from_slice(&1000u32.to_be_bytes());
        v[8..12].copy_from_slice(&2000u32.to_be_bytes());
        v[12] = 5 << 4; // data offset 5, no options
        v[13] = 0x18; // PSH + ACK
        v[14..16].copy_from_slice(&65535u16.to_be_bytes());
        v
    }

    #[test]
    fn parses_minimal_header() {
        let bytes = sample_header_bytes();
        let (hdr, len) = TcpHeaderFields::parse(&bytes).unwrap();
        assert_eq!(len, 20);
        assert_eq!(hdr.src_port, 5001);
        assert_eq!(hdr.dst_port, 44100);
        assert!(hdr.flags.psh && hdr.flags.ack);
        assert!(!hdr.flags.syn);
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = sample_header_bytes();
        assert!(matches!(
            TcpHeaderFields::parse(&bytes[..10]),
            Err(TcpParseError::Truncated(10))
        ));
    }

    #[test]
    fn rejects_data_offset_too_small() {
        let mut bytes = sample_header_bytes();
        bytes[12] = 4 << 4;
        assert!(matches!(
            TcpHeaderFields::parse(&bytes),
            Err(TcpParseError::DataOffsetTooSmall(4))
        ));
    }
}
