//! Whole-packet parsing: glues the IP chain walker (`ip::walk`) to the
//! TCP header parser, producing the single view the classifier and
//! builder both work from.

use crate::ip::{self, IpStack};
use crate::tcp::{TcpHeaderFields, TcpParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PacketParseError {
    #[error("IP stack: {0}")]
    Ip(ip::IpWalkError),
    #[error("transport protocol {0} is not TCP")]
    NotTcp(u8),
    #[error("TCP header: {0}")]
    Tcp(TcpParseError),
}

/// A fully parsed packet: the IP header stack plus the TCP header and
/// its payload offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPacket {
    pub ip_stack: IpStack,
    pub tcp: TcpHeaderFields,
    pub payload_offset: usize,
}

pub fn parse_packet(data: &[u8]) -> Result<ParsedPacket, PacketParseError> {
    let ip_stack = ip::walk(data).map_err(PacketParseError::Ip)?;
    if ip_stack.transport_protocol != ip::IpProto::Tcp as u8 {
        return Err(PacketParseError::NotTcp(ip_stack.transport_protocol));
    }
    let (tcp, tcp_len) =
        TcpHeaderFields::parse(&data[ip_stack.transport_offset..]).map_err(PacketParseError::Tcp)?;
    Ok(ParsedPacket {
        payload_offset: ip_stack.transport_offset + tcp_len,
        ip_stack,
        tcp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ipv4_tcp() -> Vec<u8> {
        let mut v = vec![
            0x45, 0x00, 0x00, 0x28, 0x00, 0x00, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 10, 0, 0, 1,
            10, 0, 0, 2,
        ];
        let mut tcp = vec![0u8; 20];
        tcp[0..2].copy_from_slice(&1234u16.to_be_bytes());
        tcp[2..4].copy_from_slice(&80u16.to_be_bytes());
        tcp[12] = 5 << 4;
        v.extend_from_slice(&tcp);
        v
    }

    #[test]
    fn parses_plain_ipv4_tcp_packet() {
        let data = sample_ipv4_tcp();
        let parsed = parse_packet(&data).unwrap();
        assert_eq!(parsed.tcp.dst_port, 80);
        assert_eq!(parsed.payload_offset, 40);
    }

    #[test]
    fn rejects_non_tcp_transport() {
        let mut data = sample_ipv4_tcp();
        data[9] = 17; // UDP
        assert!(matches!(
            parse_packet(&data),
            Err(PacketParseError::NotTcp(17))
        ));
    }
}
