//! IPv4 and IPv6 header decoding.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Minimum IPv4 header length.
pub const IPV4_MIN_HEADER_LEN: usize = 20;
/// Fixed IPv6 header length.
pub const IPV6_HEADER_LEN: usize = 40;
/// IPv6 fragment extension header length.
pub const IPV6_FRAGMENT_HEADER_LEN: usize = 8;
/// IPv6 next-header value for the fragment extension header.
pub const IPV6_NEXT_FRAGMENT: u8 = 44;

/// IP protocol numbers handled downstream.
pub mod protocol {
    /// ICMP for IPv4.
    pub const ICMP: u8 = 1;
    /// TCP.
    pub const TCP: u8 = 6;
    /// UDP.
    pub const UDP: u8 = 17;
    /// ICMP for IPv6.
    pub const ICMPV6: u8 = 58;
}

/// Fragmentation fields of a fragmented datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentInfo {
    /// Payload offset in bytes.
    pub offset: usize,
    /// More fragments follow.
    pub more: bool,
}

impl FragmentInfo {
    /// Returns true for the fragment that completes a datagram.
    #[inline]
    pub fn is_last(&self) -> bool {
        !self.more && self.offset != 0
    }
}

/// A decoded IP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpHeader {
    /// 4 or 6.
    pub version: u8,
    /// Header length, including an IPv6 fragment header.
    pub header_len: usize,
    /// Datagram length declared by the header.
    pub total_len: usize,
    /// TTL or hop limit.
    pub ttl: u8,
    /// Upper-layer protocol.
    pub protocol: u8,
    /// Source address.
    pub src: IpAddr,
    /// Destination address.
    pub dst: IpAddr,
    /// Identification, widened to 32 bits for IPv6.
    pub id: u32,
    /// Present when the datagram is a fragment.
    pub fragment: Option<FragmentInfo>,
}

impl IpHeader {
    /// Parses the header at the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let first = *buf.first().ok_or(Error::truncated("ip", 1, 0))?;
        match first >> 4 {
            4 => Self::parse_v4(buf),
            6 => Self::parse_v6(buf),
            v => Err(Error::UnsupportedIpVersion(v)),
        }
    }

    fn parse_v4(buf: &[u8]) -> Result<Self> {
        if buf.len() < IPV4_MIN_HEADER_LEN {
            return Err(Error::truncated("ipv4", IPV4_MIN_HEADER_LEN, buf.len()));
        }
        let header_len = usize::from(buf[0] & 0x0F) * 4;
        if header_len < IPV4_MIN_HEADER_LEN || header_len > buf.len() {
            return Err(Error::truncated("ipv4", header_len.max(IPV4_MIN_HEADER_LEN), buf.len()));
        }

        let flags_offset = be_u16(buf, 6);
        let offset = usize::from(flags_offset & 0x1FFF) * 8;
        let more = buf[6] & 0x20 != 0;
        let fragment = (more || offset != 0).then_some(FragmentInfo { offset, more });

        Ok(Self {
            version: 4,
            header_len,
            total_len: usize::from(be_u16(buf, 2)),
            ttl: buf[8],
            protocol: buf[9],
            src: IpAddr::V4(Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15])),
            dst: IpAddr::V4(Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19])),
            id: u32::from(be_u16(buf, 4)),
            fragment,
        })
    }

    fn parse_v6(buf: &[u8]) -> Result<Self> {
        if buf.len() < IPV6_HEADER_LEN {
            return Err(Error::truncated("ipv6", IPV6_HEADER_LEN, buf.len()));
        }
        let mut header = Self {
            version: 6,
            header_len: IPV6_HEADER_LEN,
            total_len: IPV6_HEADER_LEN + usize::from(be_u16(buf, 4)),
            ttl: buf[7],
            protocol: buf[6],
            src: IpAddr::V6(Ipv6Addr::from(addr16(buf, 8))),
            dst: IpAddr::V6(Ipv6Addr::from(addr16(buf, 24))),
            id: 0,
            fragment: None,
        };

        if header.protocol == IPV6_NEXT_FRAGMENT {
            let end = IPV6_HEADER_LEN + IPV6_FRAGMENT_HEADER_LEN;
            if buf.len() < end {
                return Err(Error::truncated("ipv6 fragment", end, buf.len()));
            }
            let ext = &buf[IPV6_HEADER_LEN..end];
            header.protocol = ext[0];
            header.header_len = end;
            header.id = u32::from_be_bytes([ext[4], ext[5], ext[6], ext[7]]);
            let offset = usize::from(u16::from_be_bytes([ext[2], ext[3]]) & 0xFFF8);
            let more = ext[3] & 0x01 != 0;
            header.fragment = (more || offset != 0).then_some(FragmentInfo { offset, more });
        }

        Ok(header)
    }

    /// Returns the payload following the header, cut to the declared length
    /// so that link-layer padding is dropped.
    pub fn payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        let end = self.total_len.min(buf.len());
        buf.get(self.header_len..end).unwrap_or(&[])
    }

    /// Returns true if the datagram is a fragment of a larger one.
    #[inline]
    pub fn is_fragment(&self) -> bool {
        self.fragment.is_some()
    }
}

#[inline]
fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
fn addr16(buf: &[u8], offset: usize) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&buf[offset..offset + 16]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_header(protocol: u8, payload_len: usize, id: u16, flags_offset: u16) -> Vec<u8> {
        let total = (IPV4_MIN_HEADER_LEN + payload_len) as u16;
        let mut buf = vec![0x45, 0x00];
        buf.extend_from_slice(&total.to_be_bytes());
        buf.extend_from_slice(&id.to_be_bytes());
        buf.extend_from_slice(&flags_offset.to_be_bytes());
        buf.extend_from_slice(&[64, protocol, 0, 0]);
        buf.extend_from_slice(&[192, 0, 2, 1]);
        buf.extend_from_slice(&[192, 0, 2, 53]);
        buf
    }

    #[test]
    fn test_parse_ipv4() {
        let mut buf = ipv4_header(protocol::UDP, 8, 0x1234, 0x4000);
        buf.extend_from_slice(&[0u8; 8]);
        let hdr = IpHeader::parse(&buf).unwrap();
        assert_eq!(hdr.version, 4);
        assert_eq!(hdr.header_len, 20);
        assert_eq!(hdr.total_len, 28);
        assert_eq!(hdr.ttl, 64);
        assert_eq!(hdr.protocol, protocol::UDP);
        assert_eq!(hdr.src, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(hdr.id, 0x1234);
        // DF set, not a fragment
        assert!(!hdr.is_fragment());
        assert_eq!(hdr.payload(&buf).len(), 8);
    }

    #[test]
    fn test_ipv4_fragments() {
        let first = IpHeader::parse(&ipv4_header(protocol::UDP, 0, 7, 0x2000)).unwrap();
        let info = first.fragment.unwrap();
        assert_eq!(info.offset, 0);
        assert!(info.more);
        assert!(!info.is_last());

        let last = IpHeader::parse(&ipv4_header(protocol::UDP, 0, 7, 0x0003)).unwrap();
        let info = last.fragment.unwrap();
        assert_eq!(info.offset, 24);
        assert!(info.is_last());
    }

    #[test]
    fn test_ipv4_padding_trimmed() {
        let mut buf = ipv4_header(protocol::UDP, 8, 1, 0);
        buf.extend_from_slice(&[1u8; 8]);
        buf.extend_from_slice(&[0u8; 6]);
        let hdr = IpHeader::parse(&buf).unwrap();
        assert_eq!(hdr.payload(&buf), &[1u8; 8]);
    }

    #[test]
    fn test_ipv4_bad_ihl() {
        let mut buf = ipv4_header(protocol::UDP, 0, 1, 0);
        buf[0] = 0x44;
        assert!(matches!(IpHeader::parse(&buf), Err(Error::Truncated { .. })));
        buf[0] = 0x4F;
        assert!(matches!(IpHeader::parse(&buf), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_parse_ipv6_fragment_header() {
        let mut buf = vec![0x60, 0, 0, 0];
        buf.extend_from_slice(&16u16.to_be_bytes());
        buf.extend_from_slice(&[IPV6_NEXT_FRAGMENT, 55]);
        buf.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8]);
        buf.extend_from_slice(&[0u8; 11]);
        buf.push(1);
        buf.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8]);
        buf.extend_from_slice(&[0u8; 11]);
        buf.push(2);
        // next header UDP, offset 16 with M set, id 0xdeadbeef
        buf.extend_from_slice(&[protocol::UDP, 0, 0x00, 0x11, 0xde, 0xad, 0xbe, 0xef]);
        buf.extend_from_slice(&[0u8; 8]);

        let hdr = IpHeader::parse(&buf).unwrap();
        assert_eq!(hdr.version, 6);
        assert_eq!(hdr.header_len, 48);
        assert_eq!(hdr.protocol, protocol::UDP);
        assert_eq!(hdr.ttl, 55);
        assert_eq!(hdr.id, 0xdead_beef);
        let info = hdr.fragment.unwrap();
        assert_eq!(info.offset, 16);
        assert!(info.more);
        assert_eq!(hdr.payload(&buf).len(), 8);
        assert_eq!(hdr.dst, "2001:db8::2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_unsupported_version() {
        assert!(matches!(IpHeader::parse(&[0x50; 40]), Err(Error::UnsupportedIpVersion(5))));
        assert!(IpHeader::parse(&[]).is_err());
        assert!(matches!(IpHeader::parse(&[0x60; 20]), Err(Error::Truncated { .. })));
    }
}
