//! ICMP and ICMPv6 header decoding.

use crate::error::{Error, Result};

/// ICMP header length, including the 4-byte rest-of-header field.
pub const ICMP_HEADER_LEN: usize = 8;

/// A decoded ICMP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    /// Message type.
    pub icmp_type: u8,
    /// Message code.
    pub code: u8,
    /// Rest-of-header field.
    pub rest: [u8; 4],
}

impl IcmpHeader {
    /// Parses the header at the start of `message`.
    pub fn parse(message: &[u8]) -> Result<Self> {
        match message {
            [icmp_type, code, _, _, a, b, c, d, ..] => Ok(Self {
                icmp_type: *icmp_type,
                code: *code,
                rest: [*a, *b, *c, *d],
            }),
            _ => Err(Error::truncated("icmp", ICMP_HEADER_LEN, message.len())),
        }
    }

    /// Returns true if this type carries the datagram that triggered it.
    pub fn is_error(&self, ip_version: u8) -> bool {
        match ip_version {
            // Unreachable, source quench, redirect, time exceeded, parameter problem
            4 => matches!(self.icmp_type, 3 | 4 | 5 | 11 | 12),
            // Unreachable, packet too big, time exceeded, parameter problem
            6 => matches!(self.icmp_type, 1..=4),
            _ => false,
        }
    }

    /// Returns the identifier and sequence of an echo request or reply.
    pub fn echo(&self, ip_version: u8) -> Option<(u16, u16)> {
        let is_echo = match ip_version {
            4 => matches!(self.icmp_type, 0 | 8),
            6 => matches!(self.icmp_type, 128 | 129),
            _ => false,
        };
        is_echo.then(|| {
            (
                u16::from_be_bytes([self.rest[0], self.rest[1]]),
                u16::from_be_bytes([self.rest[2], self.rest[3]]),
            )
        })
    }

    /// Returns the data following the header.
    #[inline]
    pub fn data<'a>(&self, message: &'a [u8]) -> &'a [u8] {
        message.get(ICMP_HEADER_LEN..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unreachable() {
        let msg = [3, 3, 0xAB, 0xCD, 0, 0, 0, 0, 0x45, 0x00];
        let hdr = IcmpHeader::parse(&msg).unwrap();
        assert_eq!(hdr.icmp_type, 3);
        assert_eq!(hdr.code, 3);
        assert!(hdr.is_error(4));
        // ICMPv6 type 3 is time exceeded
        assert!(hdr.is_error(6));
        let v6_echo = IcmpHeader::parse(&[128, 0, 0, 0, 0, 1, 0, 1]).unwrap();
        assert!(!v6_echo.is_error(6));
        assert_eq!(hdr.echo(4), None);
        assert_eq!(hdr.data(&msg), &[0x45, 0x00]);
    }

    #[test]
    fn test_echo() {
        let msg = [8, 0, 0, 0, 0x12, 0x34, 0x00, 0x07];
        let hdr = IcmpHeader::parse(&msg).unwrap();
        assert!(!hdr.is_error(4));
        assert_eq!(hdr.echo(4), Some((0x1234, 7)));
        assert!(hdr.data(&msg).is_empty());

        let v6 = IcmpHeader::parse(&[129, 0, 0, 0, 0, 1, 0, 2]).unwrap();
        assert_eq!(v6.echo(6), Some((1, 2)));
    }

    #[test]
    fn test_v6_errors() {
        for icmp_type in 1..=4 {
            let hdr = IcmpHeader::parse(&[icmp_type, 0, 0, 0, 0, 0, 0, 0]).unwrap();
            assert!(hdr.is_error(6));
        }
        let hdr = IcmpHeader::parse(&[135, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(!hdr.is_error(6));
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            IcmpHeader::parse(&[3, 1, 0]),
            Err(Error::Truncated { layer: "icmp", .. })
        ));
    }
}
