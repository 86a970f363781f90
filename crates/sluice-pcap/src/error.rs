//! Capture decoding error types.
//!
//! Only I/O failures and a bad global header end a capture. Every other
//! error is scoped to one frame: the reader counts it by [`ErrorKind`] and
//! moves on.

use std::io;
use thiserror::Error;

/// Result type alias for capture decoding.
pub type Result<T> = std::result::Result<T, Error>;

/// Capture decoding errors.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Capture File Errors
    // =========================================================================
    /// Reading the capture failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file ended before the global header was complete.
    #[error("empty capture: {read} of 24 header bytes present")]
    EmptyCapture {
        /// Header bytes present.
        read: usize,
    },

    /// The global header magic is not a pcap magic in either byte order.
    #[error("not a pcap file: magic {magic:#010x}")]
    NotPcap {
        /// The first four bytes, read big-endian.
        magic: u32,
    },

    /// A frame header declares more bytes than allowed.
    #[error("frame of {caplen} bytes exceeds limit of {limit}")]
    OversizedFrame {
        /// Declared captured length.
        caplen: usize,
        /// Configured maximum.
        limit: usize,
    },

    // =========================================================================
    // Frame Errors
    // =========================================================================
    /// The capture's link type has no IP locator.
    #[error("unsupported link type {0}")]
    UnsupportedLinkType(u32),

    /// An Ethernet frame carries neither IPv4 nor IPv6.
    #[error("unsupported ethertype {0:#06x}")]
    UnsupportedEtherType(u16),

    /// The IP version nibble is neither 4 nor 6.
    #[error("unsupported IP version {0}")]
    UnsupportedIpVersion(u8),

    /// The IP payload is not UDP, TCP or ICMP.
    #[error("unsupported IP protocol {0}")]
    UnsupportedProtocol(u8),

    /// A header is cut short.
    #[error("truncated {layer} header: needed {needed} bytes, {available} available")]
    Truncated {
        /// Layer being decoded.
        layer: &'static str,
        /// Bytes the header needs.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// IP fragments do not form a gapless chain from offset 0.
    #[error("broken fragment chain for datagram {id} at offset {offset}")]
    BrokenFragmentChain {
        /// IP identification.
        id: u32,
        /// Offset where the chain broke.
        offset: usize,
    },

    /// TCP segments do not form a contiguous byte run.
    #[error("broken TCP sequence chain at {seq}")]
    BrokenSegmentChain {
        /// Sequence number where the chain broke.
        seq: u32,
    },

    /// The DNS payload failed to decode.
    #[error("DNS decode error: {0}")]
    Proto(#[from] sluice_proto::Error),
}

impl Error {
    /// Creates a new `Truncated` error.
    #[inline]
    pub fn truncated(layer: &'static str, needed: usize, available: usize) -> Self {
        Self::Truncated {
            layer,
            needed,
            available,
        }
    }

    /// Returns the counter bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::EmptyCapture { .. } | Self::NotPcap { .. } => ErrorKind::Capture,
            Self::OversizedFrame { .. } => ErrorKind::Oversized,
            Self::UnsupportedLinkType(_) | Self::UnsupportedEtherType(_) => ErrorKind::UnsupportedLink,
            Self::UnsupportedIpVersion(_) | Self::UnsupportedProtocol(_) => {
                ErrorKind::UnsupportedProtocol
            }
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::BrokenFragmentChain { .. } => ErrorKind::BrokenFragmentChain,
            Self::BrokenSegmentChain { .. } => ErrorKind::TcpPrefix,
            Self::Proto(_) => ErrorKind::DnsDecode,
        }
    }

    /// Returns true if the error ends the capture rather than one frame.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Capture
    }
}

/// Coarse error classes, one per decode counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The capture file itself is unreadable.
    Capture,
    /// A frame exceeded the size limit.
    Oversized,
    /// Link type or ethertype not handled.
    UnsupportedLink,
    /// IP version or protocol not handled.
    UnsupportedProtocol,
    /// A header was cut short.
    Truncated,
    /// IP reassembly gave up.
    BrokenFragmentChain,
    /// TCP reassembly or length-prefix splitting gave up.
    TcpPrefix,
    /// DNS decoding failed.
    DnsDecode,
}

impl ErrorKind {
    /// Returns a stable label, used for metric dimensions.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Oversized => "oversized",
            Self::UnsupportedLink => "unsupported_link",
            Self::UnsupportedProtocol => "unsupported_protocol",
            Self::Truncated => "truncated",
            Self::BrokenFragmentChain => "broken_fragment_chain",
            Self::TcpPrefix => "tcp_prefix",
            Self::DnsDecode => "dns_decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::UnsupportedLinkType(147).kind(), ErrorKind::UnsupportedLink);
        assert_eq!(Error::UnsupportedProtocol(47).kind(), ErrorKind::UnsupportedProtocol);
        assert_eq!(
            Error::BrokenFragmentChain { id: 1, offset: 8 }.kind(),
            ErrorKind::BrokenFragmentChain
        );
        let dns: Error = sluice_proto::Error::MultipleOptRecords.into();
        assert_eq!(dns.kind(), ErrorKind::DnsDecode);
        assert!(!dns.is_fatal());
        assert!(Error::NotPcap { magic: 0 }.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = Error::truncated("udp", 8, 3);
        assert_eq!(
            err.to_string(),
            "truncated udp header: needed 8 bytes, 3 available"
        );
        assert_eq!(ErrorKind::TcpPrefix.as_str(), "tcp_prefix");
        assert_eq!(
            Error::NotPcap { magic: 0x1234 }.to_string(),
            "not a pcap file: magic 0x00001234"
        );
    }
}
