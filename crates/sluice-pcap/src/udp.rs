//! UDP header decoding and checksum.

use crate::error::{Error, Result};
use crate::ip::protocol;
use std::net::IpAddr;

/// UDP header length.
pub const UDP_HEADER_LEN: usize = 8;

/// A decoded UDP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// Length of header plus payload.
    pub length: u16,
    /// Checksum field; zero when absent.
    pub checksum: u16,
}

impl UdpHeader {
    /// Parses the header at the start of `segment`.
    pub fn parse(segment: &[u8]) -> Result<Self> {
        if segment.len() < UDP_HEADER_LEN {
            return Err(Error::truncated("udp", UDP_HEADER_LEN, segment.len()));
        }
        Ok(Self {
            src_port: u16::from_be_bytes([segment[0], segment[1]]),
            dst_port: u16::from_be_bytes([segment[2], segment[3]]),
            length: u16::from_be_bytes([segment[4], segment[5]]),
            checksum: u16::from_be_bytes([segment[6], segment[7]]),
        })
    }

    /// Returns the payload, bounded by both the length field and the bytes
    /// actually captured.
    pub fn payload<'a>(&self, segment: &'a [u8]) -> &'a [u8] {
        let declared = usize::from(self.length).saturating_sub(UDP_HEADER_LEN);
        let available = segment.len().saturating_sub(UDP_HEADER_LEN);
        &segment[UDP_HEADER_LEN..UDP_HEADER_LEN + declared.min(available)]
    }

    /// Returns true if a checksum was transmitted.
    #[inline]
    pub fn has_checksum(&self) -> bool {
        self.checksum != 0
    }
}

/// Computes the UDP checksum of `segment` (header with a zeroed checksum
/// field, plus payload) under the pseudo-header for `src` and `dst`.
pub fn checksum(src: IpAddr, dst: IpAddr, segment: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    match (src, dst) {
        (IpAddr::V4(s), IpAddr::V4(d)) => {
            sum = add_words(sum, &s.octets());
            sum = add_words(sum, &d.octets());
            sum += u32::from(protocol::UDP);
            sum += segment.len() as u32;
        }
        (s, d) => {
            sum = add_words(sum, &v6_octets(s));
            sum = add_words(sum, &v6_octets(d));
            sum = add_words(sum, &(segment.len() as u32).to_be_bytes());
            sum += u32::from(protocol::UDP);
        }
    }
    sum = add_words(sum, segment);
    let folded = !fold(sum);
    // An all-zero result is transmitted as all ones.
    if folded == 0 {
        0xFFFF
    } else {
        folded
    }
}

/// Returns true if the transmitted checksum matches the segment.
pub fn verify(src: IpAddr, dst: IpAddr, segment: &[u8]) -> bool {
    if segment.len() < UDP_HEADER_LEN {
        return false;
    }
    let transmitted = u16::from_be_bytes([segment[6], segment[7]]);
    if transmitted == 0 {
        return true;
    }
    let mut copy = segment.to_vec();
    copy[6] = 0;
    copy[7] = 0;
    checksum(src, dst, &copy) == transmitted
}

fn v6_octets(addr: IpAddr) -> [u8; 16] {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

fn add_words(mut sum: u32, data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum = sum.wrapping_add(u32::from(u16::from_be_bytes([word[0], word[1]])));
    }
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add(u32::from(*last) << 8);
    }
    // Keep headroom for long segments.
    fold(sum) as u32
}

fn fold(mut sum: u32) -> u16 {
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn segment(payload: &[u8]) -> Vec<u8> {
        let mut seg = Vec::new();
        seg.extend_from_slice(&40000u16.to_be_bytes());
        seg.extend_from_slice(&53u16.to_be_bytes());
        seg.extend_from_slice(&((UDP_HEADER_LEN + payload.len()) as u16).to_be_bytes());
        seg.extend_from_slice(&[0, 0]);
        seg.extend_from_slice(payload);
        seg
    }

    #[test]
    fn test_parse() {
        let seg = segment(b"hello");
        let hdr = UdpHeader::parse(&seg).unwrap();
        assert_eq!(hdr.src_port, 40000);
        assert_eq!(hdr.dst_port, 53);
        assert_eq!(hdr.length, 13);
        assert!(!hdr.has_checksum());
        assert_eq!(hdr.payload(&seg), b"hello");
    }

    #[test]
    fn test_payload_bounded_by_capture() {
        let mut seg = segment(b"hello");
        seg.truncate(10);
        let hdr = UdpHeader::parse(&seg).unwrap();
        assert_eq!(hdr.payload(&seg), b"he");

        // Length field shorter than the header
        let mut seg = segment(b"hello");
        seg[4..6].copy_from_slice(&3u16.to_be_bytes());
        let hdr = UdpHeader::parse(&seg).unwrap();
        assert!(hdr.payload(&seg).is_empty());
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            UdpHeader::parse(&[0u8; 5]),
            Err(Error::Truncated { layer: "udp", needed: 8, available: 5 })
        ));
    }

    #[test]
    fn test_checksum_v4_roundtrip() {
        let src = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
        let dst = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 53));
        let mut seg = segment(b"odd");
        let sum = checksum(src, dst, &seg);
        assert_ne!(sum, 0);
        seg[6..8].copy_from_slice(&sum.to_be_bytes());
        assert!(verify(src, dst, &seg));

        seg[8] ^= 0xFF;
        assert!(!verify(src, dst, &seg));
    }

    #[test]
    fn test_checksum_v6_roundtrip() {
        let src = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let dst = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 2));
        let mut seg = segment(b"even");
        let sum = checksum(src, dst, &seg);
        seg[6..8].copy_from_slice(&sum.to_be_bytes());
        assert!(verify(src, dst, &seg));
    }

    #[test]
    fn test_known_checksum() {
        // 10.0.0.1:1024 -> 10.0.0.2:53, payload "ab"
        let src = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let dst = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        let seg = [0x04, 0x00, 0x00, 0x35, 0x00, 0x0A, 0x00, 0x00, b'a', b'b'];
        // 0a00+0001+0a00+0002+0011+000a + 0400+0035+000a+6162 = 0x79bf
        assert_eq!(checksum(src, dst, &seg), !0x79bfu16);
    }

    #[test]
    fn test_zero_checksum_is_absent() {
        let src = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(verify(src, src, &segment(b"x")));
    }
}
