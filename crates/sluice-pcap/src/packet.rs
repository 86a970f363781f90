//! Decoded packet model.

use crate::ip::IpHeader;
use crate::tcp::TcpFlags;
use serde::{Deserialize, Serialize};
use sluice_proto::Message;
use std::fmt;
use std::net::IpAddr;

const MICROS_PER_SEC: u64 = 1_000_000;

/// Capture time with microsecond resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub secs: u64,
    /// Microseconds within the second.
    pub micros: u32,
}

impl Timestamp {
    /// Creates a timestamp, carrying excess microseconds into seconds.
    pub fn new(secs: u64, micros: u32) -> Self {
        Self::from_micros(secs * MICROS_PER_SEC + u64::from(micros))
    }

    /// Creates a timestamp from total microseconds.
    pub fn from_micros(total: u64) -> Self {
        Self {
            secs: total / MICROS_PER_SEC,
            micros: (total % MICROS_PER_SEC) as u32,
        }
    }

    /// Returns total microseconds since the epoch.
    #[inline]
    pub fn as_micros(&self) -> u64 {
        self.secs * MICROS_PER_SEC + u64::from(self.micros)
    }

    /// Returns this time plus `secs` seconds.
    #[inline]
    pub fn add_secs(&self, secs: u64) -> Self {
        Self {
            secs: self.secs.saturating_add(secs),
            micros: self.micros,
        }
    }

    /// Returns this time minus `secs` seconds, stopping at zero.
    #[inline]
    pub fn saturating_sub_secs(&self, secs: u64) -> Self {
        Self {
            secs: self.secs.saturating_sub(secs),
            micros: if self.secs >= secs { self.micros } else { 0 },
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

/// Network-layer metadata of a decoded packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpInfo {
    /// 4 or 6.
    pub version: u8,
    /// TTL or hop limit.
    pub ttl: u8,
    /// Header length in bytes.
    pub header_len: usize,
    /// Upper-layer protocol.
    pub protocol: u8,
    /// Source address.
    pub src: IpAddr,
    /// Destination address.
    pub dst: IpAddr,
    /// IP identification.
    pub id: u32,
    /// Fragments the datagram was rebuilt from; zero if it was not fragmented.
    pub fragments: usize,
}

impl IpInfo {
    /// Builds the metadata from a parsed header.
    pub fn new(header: &IpHeader, fragments: usize) -> Self {
        Self {
            version: header.version,
            ttl: header.ttl,
            header_len: header.header_len,
            protocol: header.protocol,
            src: header.src,
            dst: header.dst,
            id: header.id,
            fragments,
        }
    }

    /// Returns true if the datagram was reassembled from fragments.
    #[inline]
    pub fn is_reassembled(&self) -> bool {
        self.fragments > 0
    }
}

/// Transport-layer metadata of a DNS packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum Transport {
    /// A UDP datagram.
    Udp {
        /// Source port.
        src_port: u16,
        /// Destination port.
        dst_port: u16,
        /// Checksum verdict, when checked and present.
        checksum_ok: Option<bool>,
    },
    /// A reassembled TCP byte run.
    Tcp {
        /// Source port.
        src_port: u16,
        /// Destination port.
        dst_port: u16,
        /// Sequence number of the flushing segment.
        seq: u32,
        /// Acknowledgment number of the flushing segment.
        ack: u32,
        /// Flags of the flushing segment.
        flags: TcpFlags,
        /// Window of the flushing segment.
        window: u16,
        /// Segments joined into the run.
        segments: usize,
    },
}

impl Transport {
    /// Source port.
    pub fn src_port(&self) -> u16 {
        match self {
            Self::Udp { src_port, .. } | Self::Tcp { src_port, .. } => *src_port,
        }
    }

    /// Destination port.
    pub fn dst_port(&self) -> u16 {
        match self {
            Self::Udp { dst_port, .. } | Self::Tcp { dst_port, .. } => *dst_port,
        }
    }

    /// Returns true for TCP.
    pub fn is_tcp(&self) -> bool {
        matches!(self, Self::Tcp { .. })
    }
}

/// A UDP datagram or TCP run with its DNS messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsPacket {
    /// Capture time of the frame that completed the packet.
    pub ts: Timestamp,
    /// Network metadata.
    pub ip: IpInfo,
    /// Transport metadata.
    pub transport: Transport,
    /// Decoded messages, in stream order.
    pub messages: Vec<Message>,
}

impl DnsPacket {
    /// Source address and port.
    pub fn source(&self) -> (IpAddr, u16) {
        (self.ip.src, self.transport.src_port())
    }

    /// Destination address and port.
    pub fn destination(&self) -> (IpAddr, u16) {
        (self.ip.dst, self.transport.dst_port())
    }
}

/// An ICMP message, with the DNS datagram it refers to when recoverable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IcmpPacket {
    /// Capture time.
    pub ts: Timestamp,
    /// Network metadata.
    pub ip: IpInfo,
    /// ICMP type.
    pub icmp_type: u8,
    /// ICMP code.
    pub code: u8,
    /// Echo identifier and sequence.
    pub echo: Option<(u16, u16)>,
    /// The triggering datagram of an error message.
    pub embedded: Option<Box<DnsPacket>>,
}

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Packet {
    /// DNS over UDP or TCP.
    Dns(DnsPacket),
    /// ICMP or ICMPv6.
    Icmp(IcmpPacket),
}

impl Packet {
    /// Capture time.
    pub fn ts(&self) -> Timestamp {
        match self {
            Self::Dns(p) => p.ts,
            Self::Icmp(p) => p.ts,
        }
    }

    /// Network metadata.
    pub fn ip(&self) -> &IpInfo {
        match self {
            Self::Dns(p) => &p.ip,
            Self::Icmp(p) => &p.ip,
        }
    }

    /// Returns the DNS packet, if any.
    pub fn as_dns(&self) -> Option<&DnsPacket> {
        match self {
            Self::Dns(p) => Some(p),
            Self::Icmp(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_order_and_carry() {
        let a = Timestamp::new(10, 999_999);
        let b = Timestamp::new(10, 1_000_000);
        assert_eq!(b, Timestamp::new(11, 0));
        assert!(a < b);
        assert_eq!(a.as_micros(), 10_999_999);
        assert_eq!(Timestamp::from_micros(a.as_micros()), a);
        assert_eq!(a.to_string(), "10.999999");
    }

    #[test]
    fn test_timestamp_saturating_sub() {
        let ts = Timestamp::new(100, 250);
        assert_eq!(ts.saturating_sub_secs(30), Timestamp::new(70, 250));
        assert_eq!(ts.saturating_sub_secs(500), Timestamp::default());
        assert_eq!(ts.add_secs(60), Timestamp::new(160, 250));
    }

    #[test]
    fn test_transport_ports() {
        let t = Transport::Udp {
            src_port: 40000,
            dst_port: 53,
            checksum_ok: None,
        };
        assert_eq!(t.src_port(), 40000);
        assert_eq!(t.dst_port(), 53);
        assert!(!t.is_tcp());
    }

    #[test]
    fn test_packet_serializes_tagged() {
        let ip = IpInfo {
            version: 4,
            ttl: 64,
            header_len: 20,
            protocol: 1,
            src: "192.0.2.1".parse().unwrap(),
            dst: "192.0.2.2".parse().unwrap(),
            id: 1,
            fragments: 0,
        };
        let packet = Packet::Icmp(IcmpPacket {
            ts: Timestamp::new(1, 2),
            ip,
            icmp_type: 8,
            code: 0,
            echo: Some((1, 1)),
            embedded: None,
        });
        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["kind"], "icmp");
        assert_eq!(json["ip"]["src"], "192.0.2.1");
        assert_eq!(json["ts"]["micros"], 2);
    }
}
