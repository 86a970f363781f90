//! Per-capture decode counters.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// Counters kept by a Packet Reader over one capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Frames read from the file.
    pub frames: u64,
    /// Packets yielded.
    pub packets: u64,
    /// IPv4 datagrams seen.
    pub ipv4: u64,
    /// IPv6 datagrams seen.
    pub ipv6: u64,
    /// UDP datagrams seen.
    pub udp: u64,
    /// TCP segments seen.
    pub tcp: u64,
    /// ICMP messages seen.
    pub icmp: u64,
    /// IP fragments seen.
    pub fragments: u64,
    /// Datagrams rebuilt from fragments.
    pub reassembled: u64,
    /// Datagrams abandoned because their fragments did not chain.
    pub broken_fragment_chains: u64,
    /// TCP segments buffered for reassembly.
    pub tcp_segments: u64,
    /// TCP runs dropped for sequence holes or bad length prefixes.
    pub tcp_prefix_errors: u64,
    /// DNS payloads that failed to decode, fully or partly.
    pub dns_decode_errors: u64,
    /// Frames with an unhandled link type or ethertype.
    pub unsupported_link: u64,
    /// Datagrams with an unhandled IP version or protocol.
    pub unsupported_protocol: u64,
    /// Frames with a header cut short.
    pub truncated: u64,
    /// Frames exceeding the size limit.
    pub oversized: u64,
    /// UDP and TCP packets on non-DNS ports.
    pub non_dns: u64,
    /// UDP checksum mismatches.
    pub checksum_errors: u64,
    /// TCP flows dropped by purges.
    pub purged_flows: u64,
    /// Incomplete datagrams dropped by purges.
    pub purged_datagrams: u64,
}

impl DecodeStats {
    /// Counts one skipped frame under the bucket for its error.
    pub fn record(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Capture => {}
            ErrorKind::Oversized => self.oversized += 1,
            ErrorKind::UnsupportedLink => self.unsupported_link += 1,
            ErrorKind::UnsupportedProtocol => self.unsupported_protocol += 1,
            ErrorKind::Truncated => self.truncated += 1,
            ErrorKind::BrokenFragmentChain => self.broken_fragment_chains += 1,
            ErrorKind::TcpPrefix => self.tcp_prefix_errors += 1,
            ErrorKind::DnsDecode => self.dns_decode_errors += 1,
        }
    }

    /// Total frames skipped for errors.
    pub fn errors(&self) -> u64 {
        self.oversized
            + self.unsupported_link
            + self.unsupported_protocol
            + self.truncated
            + self.broken_fragment_chains
            + self.tcp_prefix_errors
            + self.dns_decode_errors
    }

    /// Skipped frames per error kind.
    pub fn error_counts(&self) -> [(ErrorKind, u64); 7] {
        [
            (ErrorKind::Oversized, self.oversized),
            (ErrorKind::UnsupportedLink, self.unsupported_link),
            (ErrorKind::UnsupportedProtocol, self.unsupported_protocol),
            (ErrorKind::Truncated, self.truncated),
            (ErrorKind::BrokenFragmentChain, self.broken_fragment_chains),
            (ErrorKind::TcpPrefix, self.tcp_prefix_errors),
            (ErrorKind::DnsDecode, self.dns_decode_errors),
        ]
    }

    /// Adds another reader's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.frames += other.frames;
        self.packets += other.packets;
        self.ipv4 += other.ipv4;
        self.ipv6 += other.ipv6;
        self.udp += other.udp;
        self.tcp += other.tcp;
        self.icmp += other.icmp;
        self.fragments += other.fragments;
        self.reassembled += other.reassembled;
        self.broken_fragment_chains += other.broken_fragment_chains;
        self.tcp_segments += other.tcp_segments;
        self.tcp_prefix_errors += other.tcp_prefix_errors;
        self.dns_decode_errors += other.dns_decode_errors;
        self.unsupported_link += other.unsupported_link;
        self.unsupported_protocol += other.unsupported_protocol;
        self.truncated += other.truncated;
        self.oversized += other.oversized;
        self.non_dns += other.non_dns;
        self.checksum_errors += other.checksum_errors;
        self.purged_flows += other.purged_flows;
        self.purged_datagrams += other.purged_datagrams;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_merge() {
        let mut a = DecodeStats::default();
        a.record(ErrorKind::TcpPrefix);
        a.record(ErrorKind::DnsDecode);
        a.record(ErrorKind::Capture);
        a.frames = 10;
        assert_eq!(a.tcp_prefix_errors, 1);
        assert_eq!(a.errors(), 2);
        let counted: u64 = a.error_counts().iter().map(|(_, n)| n).sum();
        assert_eq!(counted, a.errors());

        let mut total = DecodeStats::default();
        total.merge(&a);
        total.merge(&a);
        assert_eq!(total.frames, 20);
        assert_eq!(total.dns_decode_errors, 2);
    }
}
