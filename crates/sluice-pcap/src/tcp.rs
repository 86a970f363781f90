//! TCP header decoding, flow reassembly and DNS length-prefix splitting.
//!
//! Segments are buffered per flow and per direction, keyed by sequence
//! number. A segment carrying PSH or FIN flushes its direction: the
//! buffered segments are ordered, joined along contiguous sequence ranges
//! and handed back as one byte run. Retransmitted bytes keep the copy seen
//! first. A hole in the sequence space abandons the whole run.

use crate::error::{Error, Result};
use crate::packet::Timestamp;
use bitflags::bitflags;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Minimum TCP header length.
pub const TCP_MIN_HEADER_LEN: usize = 20;

bitflags! {
    /// TCP control bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TcpFlags: u16 {
        /// No more data from sender.
        const FIN = 0x001;
        /// Synchronize sequence numbers.
        const SYN = 0x002;
        /// Reset the connection.
        const RST = 0x004;
        /// Push buffered data.
        const PSH = 0x008;
        /// Acknowledgment field is significant.
        const ACK = 0x010;
        /// Urgent pointer is significant.
        const URG = 0x020;
        /// ECN echo.
        const ECE = 0x040;
        /// Congestion window reduced.
        const CWR = 0x080;
        /// ECN nonce.
        const NS = 0x100;
    }
}

/// A decoded TCP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// Sequence number.
    pub seq: u32,
    /// Acknowledgment number.
    pub ack: u32,
    /// Data offset in bytes.
    pub header_len: usize,
    /// Control bits.
    pub flags: TcpFlags,
    /// Receive window.
    pub window: u16,
}

impl TcpHeader {
    /// Parses the header at the start of `segment`.
    pub fn parse(segment: &[u8]) -> Result<Self> {
        if segment.len() < TCP_MIN_HEADER_LEN {
            return Err(Error::truncated("tcp", TCP_MIN_HEADER_LEN, segment.len()));
        }
        let header_len = usize::from(segment[12] >> 4) * 4;
        if header_len < TCP_MIN_HEADER_LEN || header_len > segment.len() {
            return Err(Error::truncated(
                "tcp",
                header_len.max(TCP_MIN_HEADER_LEN),
                segment.len(),
            ));
        }
        let be_u32 = |at: usize| {
            u32::from_be_bytes([segment[at], segment[at + 1], segment[at + 2], segment[at + 3]])
        };
        Ok(Self {
            src_port: u16::from_be_bytes([segment[0], segment[1]]),
            dst_port: u16::from_be_bytes([segment[2], segment[3]]),
            seq: be_u32(4),
            ack: be_u32(8),
            header_len,
            flags: TcpFlags::from_bits_truncate(u16::from_be_bytes([segment[12], segment[13]])),
            window: u16::from_be_bytes([segment[14], segment[15]]),
        })
    }

    /// Returns the segment payload.
    #[inline]
    pub fn payload<'a>(&self, segment: &'a [u8]) -> &'a [u8] {
        &segment[self.header_len..]
    }

    /// Returns true if the segment asks for buffered data to be delivered.
    #[inline]
    pub fn flushes(&self) -> bool {
        self.flags.intersects(TcpFlags::PSH | TcpFlags::FIN)
    }
}

/// Which side of a flow sent a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the lower endpoint to the higher one.
    Forward,
    /// From the higher endpoint to the lower one.
    Reverse,
}

impl Direction {
    #[inline]
    fn index(self) -> usize {
        match self {
            Self::Forward => 0,
            Self::Reverse => 1,
        }
    }
}

/// Undirected flow identity: both directions map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    low: (IpAddr, u16),
    high: (IpAddr, u16),
}

impl FlowKey {
    /// Builds the key for a segment and reports which way it travels.
    pub fn new(src: IpAddr, src_port: u16, dst: IpAddr, dst_port: u16) -> (Self, Direction) {
        let a = (src, src_port);
        let b = (dst, dst_port);
        if a <= b {
            (Self { low: a, high: b }, Direction::Forward)
        } else {
            (Self { low: b, high: a }, Direction::Reverse)
        }
    }
}

#[derive(Debug)]
struct Segment {
    payload: Vec<u8>,
    arrival: u64,
}

#[derive(Debug)]
struct Flow {
    last_seen: Timestamp,
    directions: [BTreeMap<u32, Segment>; 2],
}

/// Outcome of flushing one direction of a flow.
#[derive(Debug, PartialEq, Eq)]
pub enum Stream {
    /// Nothing was buffered.
    Empty,
    /// The buffered segments formed one contiguous run.
    Complete {
        /// Joined payload bytes.
        data: Vec<u8>,
        /// Segments joined.
        segments: usize,
    },
    /// A hole in the sequence space; the buffered data was dropped.
    Broken {
        /// Sequence number expected at the hole.
        seq: u32,
    },
}

/// Buffered TCP payload for all open flows.
#[derive(Debug, Default)]
pub struct FlowTable {
    flows: HashMap<FlowKey, Flow>,
    arrivals: u64,
}

impl FlowTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a segment's payload. Empty payloads only refresh the flow.
    pub fn push(&mut self, key: FlowKey, dir: Direction, seq: u32, payload: &[u8], ts: Timestamp) {
        self.arrivals += 1;
        let arrival = self.arrivals;
        let flow = self.flows.entry(key).or_insert_with(|| Flow {
            last_seen: ts,
            directions: [BTreeMap::new(), BTreeMap::new()],
        });
        flow.last_seen = flow.last_seen.max(ts);
        if !payload.is_empty() {
            flow.directions[dir.index()]
                .entry(seq)
                .or_insert_with(|| Segment {
                    payload: payload.to_vec(),
                    arrival,
                });
        }
    }

    /// Drains one direction and joins its segments.
    pub fn flush(&mut self, key: &FlowKey, dir: Direction) -> Stream {
        let Some(flow) = self.flows.get_mut(key) else {
            return Stream::Empty;
        };
        let buffered = std::mem::take(&mut flow.directions[dir.index()]);
        join(buffered)
    }

    /// Forgets a flow once neither direction holds buffered data.
    pub fn close(&mut self, key: &FlowKey) {
        let drained = self
            .flows
            .get(key)
            .is_some_and(|flow| flow.directions.iter().all(BTreeMap::is_empty));
        if drained {
            self.flows.remove(key);
        }
    }

    /// Forgets a flow entirely.
    pub fn remove(&mut self, key: &FlowKey) {
        self.flows.remove(key);
    }

    /// Drops flows idle since `cutoff` or earlier. Returns how many.
    pub fn purge(&mut self, cutoff: Timestamp) -> usize {
        let before = self.flows.len();
        self.flows.retain(|_, flow| flow.last_seen > cutoff);
        before - self.flows.len()
    }

    /// Number of tracked flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Returns true if no flow is tracked.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// Orders segments relative to the first one received, so a sequence
/// space that wraps past zero still sorts correctly, then joins them.
fn join(buffered: BTreeMap<u32, Segment>) -> Stream {
    let Some(base) = buffered.iter().min_by_key(|(_, s)| s.arrival).map(|(&seq, _)| seq) else {
        return Stream::Empty;
    };
    let mut ordered: Vec<(u32, Segment)> = buffered.into_iter().collect();
    ordered.sort_by_key(|(seq, _)| seq.wrapping_sub(base) as i32);

    let segments = ordered.len();
    let mut iter = ordered.into_iter();
    let Some((first_seq, first)) = iter.next() else {
        return Stream::Empty;
    };
    let mut expected = first_seq.wrapping_add(first.payload.len() as u32);
    let mut data = first.payload;

    for (seq, segment) in iter {
        let delta = seq.wrapping_sub(expected) as i32;
        if delta > 0 {
            return Stream::Broken { seq: expected };
        }
        // Overlap: the earlier copy wins.
        let skip = delta.unsigned_abs() as usize;
        if skip < segment.payload.len() {
            data.extend_from_slice(&segment.payload[skip..]);
            expected = seq.wrapping_add(segment.payload.len() as u32);
        }
    }

    Stream::Complete { data, segments }
}

/// Splits a DNS-over-TCP byte run into its length-prefixed messages.
///
/// Stops at the first prefix that claims more bytes than remain; the
/// second value is 1 in that case and 0 otherwise.
pub fn split_messages(stream: &[u8]) -> (SmallVec<[&[u8]; 2]>, usize) {
    let mut messages = SmallVec::new();
    let mut rest = stream;
    while let [hi, lo, tail @ ..] = rest {
        let len = usize::from(u16::from_be_bytes([*hi, *lo]));
        if len > tail.len() {
            return (messages, 1);
        }
        let (message, next) = tail.split_at(len);
        messages.push(message);
        rest = next;
    }
    (messages, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs, 0)
    }

    fn header(flags: u16, seq: u32) -> Vec<u8> {
        let mut seg = Vec::new();
        seg.extend_from_slice(&40000u16.to_be_bytes());
        seg.extend_from_slice(&53u16.to_be_bytes());
        seg.extend_from_slice(&seq.to_be_bytes());
        seg.extend_from_slice(&7u32.to_be_bytes());
        seg.extend_from_slice(&(0x5000 | flags).to_be_bytes());
        seg.extend_from_slice(&65535u16.to_be_bytes());
        seg.extend_from_slice(&[0, 0, 0, 0]);
        seg
    }

    #[test]
    fn test_parse_header() {
        let mut seg = header(0x018, 1000);
        seg.extend_from_slice(b"data");
        let hdr = TcpHeader::parse(&seg).unwrap();
        assert_eq!(hdr.src_port, 40000);
        assert_eq!(hdr.dst_port, 53);
        assert_eq!(hdr.seq, 1000);
        assert_eq!(hdr.ack, 7);
        assert_eq!(hdr.header_len, 20);
        assert_eq!(hdr.flags, TcpFlags::PSH | TcpFlags::ACK);
        assert_eq!(hdr.window, 65535);
        assert!(hdr.flushes());
        assert_eq!(hdr.payload(&seg), b"data");
    }

    #[test]
    fn test_bad_data_offset() {
        let mut seg = header(0, 1);
        seg[12] = 0x40;
        assert!(matches!(TcpHeader::parse(&seg), Err(Error::Truncated { .. })));
        seg[12] = 0xF0;
        assert!(matches!(TcpHeader::parse(&seg), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_flow_key_undirected() {
        let (k1, d1) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let (k2, d2) = FlowKey::new(addr(53), 53, addr(1), 40000);
        assert_eq!(k1, k2);
        assert_ne!(d1, d2);
    }

    #[test]
    fn test_join_out_of_order() {
        let (key, dir) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let mut table = FlowTable::new();
        table.push(key, dir, 104, b"efgh", ts(1));
        table.push(key, dir, 100, b"abcd", ts(1));
        table.push(key, dir, 108, b"ij", ts(1));
        // 100 arrived after 104
        assert_eq!(
            table.flush(&key, dir),
            Stream::Complete {
                data: b"abcdefghij".to_vec(),
                segments: 3
            }
        );
        assert_eq!(table.flush(&key, dir), Stream::Empty);
    }

    #[test]
    fn test_retransmission_first_seen_wins() {
        let (key, dir) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let mut table = FlowTable::new();
        table.push(key, dir, 100, b"abcd", ts(1));
        table.push(key, dir, 100, b"XXXX", ts(1));
        table.push(key, dir, 102, b"cdef", ts(1));
        assert_eq!(
            table.flush(&key, dir),
            Stream::Complete {
                data: b"abcdef".to_vec(),
                segments: 2
            }
        );
    }

    #[test]
    fn test_gap_is_broken() {
        let (key, dir) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let mut table = FlowTable::new();
        table.push(key, dir, 100, b"abcd", ts(1));
        table.push(key, dir, 110, b"zz", ts(1));
        assert_eq!(table.flush(&key, dir), Stream::Broken { seq: 104 });
        assert_eq!(table.flush(&key, dir), Stream::Empty);
    }

    #[test]
    fn test_sequence_wrap() {
        let (key, dir) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let mut table = FlowTable::new();
        table.push(key, dir, u32::MAX - 1, b"ab", ts(1));
        table.push(key, dir, 0, b"cd", ts(1));
        assert_eq!(
            table.flush(&key, dir),
            Stream::Complete {
                data: b"abcd".to_vec(),
                segments: 2
            }
        );
    }

    #[test]
    fn test_directions_are_separate() {
        let (key, fwd) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let (_, rev) = FlowKey::new(addr(53), 53, addr(1), 40000);
        let mut table = FlowTable::new();
        table.push(key, fwd, 1, b"query", ts(1));
        table.push(key, rev, 9000, b"answer", ts(1));
        assert_eq!(table.len(), 1);
        assert!(matches!(table.flush(&key, rev), Stream::Complete { data, .. } if data == b"answer"));
        assert!(matches!(table.flush(&key, fwd), Stream::Complete { data, .. } if data == b"query"));
    }

    #[test]
    fn test_close_waits_for_both_directions() {
        let (key, fwd) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let (_, rev) = FlowKey::new(addr(53), 53, addr(1), 40000);
        let mut table = FlowTable::new();
        table.push(key, fwd, 1, b"query", ts(1));
        table.push(key, rev, 9000, b"answer", ts(1));
        table.flush(&key, fwd);
        table.close(&key);
        assert_eq!(table.len(), 1);
        table.flush(&key, rev);
        table.close(&key);
        assert!(table.is_empty());
    }

    #[test]
    fn test_purge_idle_flows() {
        let mut table = FlowTable::new();
        let (old, dir) = FlowKey::new(addr(1), 40000, addr(53), 53);
        let (new, _) = FlowKey::new(addr(2), 40000, addr(53), 53);
        table.push(old, dir, 1, b"a", ts(10));
        table.push(new, dir, 1, b"a", ts(100));
        assert_eq!(table.purge(ts(50)), 1);
        assert_eq!(table.len(), 1);
        table.remove(&new);
        assert!(table.is_empty());
    }

    #[test]
    fn test_split_messages() {
        let stream = [0, 3, b'a', b'b', b'c', 0, 1, b'd', 0];
        let (messages, errors) = split_messages(&stream);
        assert_eq!(messages.as_slice(), &[&b"abc"[..], &b"d"[..]]);
        assert_eq!(errors, 0);

        let stream = [0, 2, b'a', b'b', 0, 9, b'c'];
        let (messages, errors) = split_messages(&stream);
        assert_eq!(messages.as_slice(), &[&b"ab"[..]]);
        assert_eq!(errors, 1);
    }
}
