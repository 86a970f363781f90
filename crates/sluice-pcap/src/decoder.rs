//! Frame decoding from the link layer down to DNS messages.
//!
//! The decoder owns the reassembly state of one capture: IP fragments and
//! TCP flows. Frames must be fed in capture order. Embedded datagrams in
//! ICMP errors are decoded without touching that state.

use crate::config::ReaderConfig;
use crate::error::{Error, Result};
use crate::fragment::{DatagramKey, FragmentCache, Reassembly};
use crate::icmp::IcmpHeader;
use crate::ip::{protocol, IpHeader};
use crate::link::LinkType;
use crate::packet::{DnsPacket, IcmpPacket, IpInfo, Packet, Timestamp, Transport};
use crate::stats::DecodeStats;
use crate::tcp::{self, FlowKey, FlowTable, Stream, TcpFlags, TcpHeader};
use crate::udp::{self, UdpHeader};
use sluice_proto::{DecodeMode, Message};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Reassembly state dropped by one purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Purged {
    /// TCP flows dropped.
    pub flows: usize,
    /// Incomplete datagrams dropped.
    pub datagrams: usize,
}

/// Stateful frame decoder for one capture.
#[derive(Debug)]
pub struct Decoder {
    config: Arc<ReaderConfig>,
    fragments: FragmentCache,
    flows: FlowTable,
    stats: DecodeStats,
}

impl Decoder {
    /// Creates a decoder with empty reassembly state.
    pub fn new(config: Arc<ReaderConfig>) -> Self {
        Self {
            config,
            fragments: FragmentCache::new(),
            flows: FlowTable::new(),
            stats: DecodeStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut DecodeStats {
        &mut self.stats
    }

    /// Decodes one link-layer frame.
    ///
    /// `Ok(None)` means the frame was consumed without producing a packet:
    /// a fragment or segment was buffered, or the traffic is not DNS.
    pub fn decode_frame(&mut self, link: LinkType, ts: Timestamp, frame: &[u8]) -> Result<Option<Packet>> {
        let offset = link.ip_offset(frame)?;
        self.decode_ip(ts, &frame[offset..])
    }

    /// Decodes one IP datagram.
    pub fn decode_ip(&mut self, ts: Timestamp, datagram: &[u8]) -> Result<Option<Packet>> {
        let header = IpHeader::parse(datagram)?;
        match header.version {
            4 => self.stats.ipv4 += 1,
            _ => self.stats.ipv6 += 1,
        }

        let mut fragments = 0;
        let payload = match header.fragment {
            None => Cow::Borrowed(header.payload(datagram)),
            Some(info) => {
                self.stats.fragments += 1;
                let key = DatagramKey::from(&header);
                match self.fragments.insert(key, info, header.payload(datagram), ts) {
                    Reassembly::Pending => return Ok(None),
                    Reassembly::Broken { offset } => {
                        return Err(Error::BrokenFragmentChain { id: header.id, offset });
                    }
                    Reassembly::Complete {
                        payload,
                        fragments: count,
                    } => {
                        self.stats.reassembled += 1;
                        fragments = count;
                        Cow::Owned(payload)
                    }
                }
            }
        };

        let ip = IpInfo::new(&header, fragments);
        match (header.version, header.protocol) {
            (_, protocol::UDP) => self.decode_udp(ts, ip, &payload),
            (_, protocol::TCP) => self.decode_tcp(ts, ip, &payload),
            (4, protocol::ICMP) | (6, protocol::ICMPV6) => {
                if self.config.decode_icmp {
                    self.decode_icmp(ts, ip, &payload)
                } else {
                    Ok(None)
                }
            }
            (_, other) => Err(Error::UnsupportedProtocol(other)),
        }
    }

    fn decode_udp(&mut self, ts: Timestamp, ip: IpInfo, segment: &[u8]) -> Result<Option<Packet>> {
        let header = UdpHeader::parse(segment)?;
        self.stats.udp += 1;
        if !self.config.is_dns(header.src_port, header.dst_port) {
            self.stats.non_dns += 1;
            return Ok(None);
        }

        let checksum_ok = (self.config.verify_udp_checksum && header.has_checksum()).then(|| {
            let end = usize::from(header.length).clamp(udp::UDP_HEADER_LEN, segment.len());
            udp::verify(ip.src, ip.dst, &segment[..end])
        });
        if checksum_ok == Some(false) {
            self.stats.checksum_errors += 1;
        }

        let message = self.decode_message(header.payload(segment))?;
        Ok(Some(Packet::Dns(DnsPacket {
            ts,
            ip,
            transport: Transport::Udp {
                src_port: header.src_port,
                dst_port: header.dst_port,
                checksum_ok,
            },
            messages: vec![message],
        })))
    }

    fn decode_tcp(&mut self, ts: Timestamp, ip: IpInfo, segment: &[u8]) -> Result<Option<Packet>> {
        let header = TcpHeader::parse(segment)?;
        self.stats.tcp += 1;
        if !self.config.is_dns(header.src_port, header.dst_port) {
            self.stats.non_dns += 1;
            return Ok(None);
        }

        let (key, dir) = FlowKey::new(ip.src, header.src_port, ip.dst, header.dst_port);
        if header.flags.contains(TcpFlags::RST) {
            self.flows.remove(&key);
            return Ok(None);
        }

        let payload = header.payload(segment);
        if !payload.is_empty() {
            self.stats.tcp_segments += 1;
        }
        self.flows.push(key, dir, header.seq, payload, ts);
        if !header.flushes() {
            return Ok(None);
        }

        let stream = self.flows.flush(&key, dir);
        if header.flags.contains(TcpFlags::FIN) {
            self.flows.close(&key);
        }
        let (data, segments) = match stream {
            Stream::Empty => return Ok(None),
            Stream::Broken { seq } => return Err(Error::BrokenSegmentChain { seq }),
            Stream::Complete { data, segments } => (data, segments),
        };

        let (parts, bad_prefixes) = tcp::split_messages(&data);
        if bad_prefixes > 0 {
            self.stats.tcp_prefix_errors += bad_prefixes as u64;
            debug!(src = %ip.src, dst = %ip.dst, len = data.len(), "TCP length prefix overruns stream");
        }

        let mut messages = Vec::with_capacity(parts.len());
        for part in parts {
            match self.decode_message(part) {
                Ok(message) => messages.push(message),
                // Counted; the other messages in the run still stand.
                Err(e) => self.stats.record(e.kind()),
            }
        }
        if messages.is_empty() {
            return Ok(None);
        }

        Ok(Some(Packet::Dns(DnsPacket {
            ts,
            ip,
            transport: Transport::Tcp {
                src_port: header.src_port,
                dst_port: header.dst_port,
                seq: header.seq,
                ack: header.ack,
                flags: header.flags,
                window: header.window,
                segments,
            },
            messages,
        })))
    }

    fn decode_icmp(&mut self, ts: Timestamp, ip: IpInfo, message: &[u8]) -> Result<Option<Packet>> {
        let header = IcmpHeader::parse(message)?;
        self.stats.icmp += 1;

        let embedded = if header.is_error(ip.version) {
            self.decode_embedded(ts, header.data(message)).map(Box::new)
        } else {
            None
        };

        Ok(Some(Packet::Icmp(IcmpPacket {
            ts,
            echo: header.echo(ip.version),
            ip,
            icmp_type: header.icmp_type,
            code: header.code,
            embedded,
        })))
    }

    /// Decodes the datagram quoted in an ICMP error.
    ///
    /// The quote is usually cut short, so everything here is best effort:
    /// reassembly state is not consulted and DNS is decoded leniently.
    pub fn decode_embedded(&self, ts: Timestamp, datagram: &[u8]) -> Option<DnsPacket> {
        let header = IpHeader::parse(datagram).ok()?;
        if header.fragment.is_some_and(|f| f.offset != 0) {
            return None;
        }
        let payload = header.payload(datagram);

        let (transport, messages) = match header.protocol {
            protocol::UDP => {
                let udp = UdpHeader::parse(payload).ok()?;
                if !self.config.is_dns(udp.src_port, udp.dst_port) {
                    return None;
                }
                let transport = Transport::Udp {
                    src_port: udp.src_port,
                    dst_port: udp.dst_port,
                    checksum_ok: None,
                };
                (transport, lenient(&[udp.payload(payload)]))
            }
            protocol::TCP => {
                let tcp = TcpHeader::parse(payload).ok()?;
                if !self.config.is_dns(tcp.src_port, tcp.dst_port) {
                    return None;
                }
                let (parts, _) = tcp::split_messages(tcp.payload(payload));
                let transport = Transport::Tcp {
                    src_port: tcp.src_port,
                    dst_port: tcp.dst_port,
                    seq: tcp.seq,
                    ack: tcp.ack,
                    flags: tcp.flags,
                    window: tcp.window,
                    segments: 1,
                };
                (transport, lenient(&parts))
            }
            _ => return None,
        };

        Some(DnsPacket {
            ts,
            ip: IpInfo::new(&header, 0),
            transport,
            messages,
        })
    }

    /// Decodes one DNS payload in the configured mode. A lenient partial
    /// decode is returned but still counted as a decode error.
    fn decode_message(&mut self, payload: &[u8]) -> Result<Message> {
        match Message::decode(payload, self.config.dns_mode) {
            Ok(message) => {
                if message.partial {
                    self.stats.dns_decode_errors += 1;
                    debug!(len = payload.len(), "DNS message decoded partially");
                }
                Ok(message)
            }
            Err(failure) => {
                debug!(section = %failure.section, error = %failure.error, "DNS decode failed");
                Err(failure.into_error().into())
            }
        }
    }

    /// Drops reassembly state older than the configured timeouts,
    /// measured back from capture time `now`.
    pub fn purge(&mut self, now: Timestamp) -> Purged {
        let flows = self
            .flows
            .purge(now.saturating_sub_secs(self.config.flow_timeout_secs));
        let dropped = self
            .fragments
            .purge(now.saturating_sub_secs(self.config.fragment_timeout_secs));

        self.stats.purged_flows += flows as u64;
        self.stats.purged_datagrams += dropped.purged as u64;
        self.stats.broken_fragment_chains += dropped.broken as u64;

        Purged {
            flows,
            datagrams: dropped.purged,
        }
    }

    /// Open TCP flows and pending datagrams.
    pub fn pending(&self) -> (usize, usize) {
        (self.flows.len(), self.fragments.len())
    }
}

fn lenient(parts: &[&[u8]]) -> Vec<Message> {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .filter_map(|part| Message::decode(part, DecodeMode::Lenient).ok())
        .collect()
}
