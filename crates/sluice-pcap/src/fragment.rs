//! IP fragment reassembly.
//!
//! Fragments are held per datagram until a gapless chain from offset 0 to
//! the final fragment is present. Nothing is ever guessed: a chain with a
//! gap stays pending until it is filled or purged, and overlapping
//! fragments abandon the datagram.

use crate::ip::{FragmentInfo, IpHeader};
use crate::packet::Timestamp;
use hashbrown::HashMap;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Identity of a fragmented datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatagramKey {
    /// Source address.
    pub src: IpAddr,
    /// Destination address.
    pub dst: IpAddr,
    /// IP identification.
    pub id: u32,
    /// Upper-layer protocol.
    pub protocol: u8,
}

impl From<&IpHeader> for DatagramKey {
    fn from(header: &IpHeader) -> Self {
        Self {
            src: header.src,
            dst: header.dst,
            id: header.id,
            protocol: header.protocol,
        }
    }
}

/// Result of adding a fragment.
#[derive(Debug, PartialEq, Eq)]
pub enum Reassembly {
    /// More fragments are needed.
    Pending,
    /// The datagram payload is complete.
    Complete {
        /// Concatenated upper-layer payload.
        payload: Vec<u8>,
        /// Number of fragments used.
        fragments: usize,
    },
    /// The fragments overlap; the datagram was dropped.
    Broken {
        /// Offset of the first fragment that does not abut its predecessor.
        offset: usize,
    },
}

#[derive(Debug)]
struct Datagram {
    first_seen: Timestamp,
    /// End offset of the payload, known once the final fragment arrives.
    end: Option<usize>,
    fragments: BTreeMap<usize, Vec<u8>>,
}

enum Chain {
    Gap,
    Overlap(usize),
    Complete,
}

impl Datagram {
    fn chain(&self) -> Chain {
        let Some(end) = self.end else {
            return Chain::Gap;
        };
        let mut expected = 0;
        for (&offset, payload) in &self.fragments {
            if offset > expected {
                return Chain::Gap;
            }
            if offset < expected {
                return Chain::Overlap(offset);
            }
            expected = offset + payload.len();
        }
        match expected.cmp(&end) {
            std::cmp::Ordering::Equal => Chain::Complete,
            std::cmp::Ordering::Less => Chain::Gap,
            std::cmp::Ordering::Greater => Chain::Overlap(end),
        }
    }

    fn concat(self) -> (Vec<u8>, usize) {
        let count = self.fragments.len();
        let len = self.fragments.values().map(Vec::len).sum();
        let mut payload = Vec::with_capacity(len);
        for part in self.fragments.into_values() {
            payload.extend_from_slice(&part);
        }
        (payload, count)
    }
}

/// Outcome of a purge pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeCount {
    /// Datagrams dropped.
    pub purged: usize,
    /// Of those, datagrams whose final fragment had arrived.
    pub broken: usize,
}

/// Pending fragments keyed by datagram.
#[derive(Debug, Default)]
pub struct FragmentCache {
    datagrams: HashMap<DatagramKey, Datagram>,
}

impl FragmentCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one fragment's payload.
    ///
    /// A repeated offset keeps the payload seen first.
    pub fn insert(
        &mut self,
        key: DatagramKey,
        info: FragmentInfo,
        payload: &[u8],
        ts: Timestamp,
    ) -> Reassembly {
        let datagram = self.datagrams.entry(key).or_insert_with(|| Datagram {
            first_seen: ts,
            end: None,
            fragments: BTreeMap::new(),
        });

        datagram
            .fragments
            .entry(info.offset)
            .or_insert_with(|| payload.to_vec());
        if !info.more && datagram.end.is_none() {
            datagram.end = Some(info.offset + payload.len());
        }

        match datagram.chain() {
            Chain::Gap => Reassembly::Pending,
            Chain::Overlap(offset) => {
                self.datagrams.remove(&key);
                Reassembly::Broken { offset }
            }
            Chain::Complete => match self.datagrams.remove(&key) {
                Some(datagram) => {
                    let (payload, fragments) = datagram.concat();
                    Reassembly::Complete { payload, fragments }
                }
                None => Reassembly::Pending,
            },
        }
    }

    /// Drops datagrams first seen at or before `cutoff`.
    pub fn purge(&mut self, cutoff: Timestamp) -> PurgeCount {
        let mut count = PurgeCount::default();
        self.datagrams.retain(|_, datagram| {
            if datagram.first_seen > cutoff {
                return true;
            }
            count.purged += 1;
            if datagram.end.is_some() {
                count.broken += 1;
            }
            false
        });
        count
    }

    /// Number of datagrams awaiting fragments.
    pub fn len(&self) -> usize {
        self.datagrams.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.datagrams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn key() -> DatagramKey {
        DatagramKey {
            src: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            dst: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 53)),
            id: 42,
            protocol: 17,
        }
    }

    fn frag(offset: usize, more: bool) -> FragmentInfo {
        FragmentInfo { offset, more }
    }

    #[test]
    fn test_in_order() {
        let mut cache = FragmentCache::new();
        let ts = Timestamp::new(1, 0);
        assert_eq!(cache.insert(key(), frag(0, true), &[1; 8], ts), Reassembly::Pending);
        assert_eq!(cache.insert(key(), frag(8, true), &[2; 8], ts), Reassembly::Pending);
        let result = cache.insert(key(), frag(16, false), &[3; 4], ts);
        let mut expected = vec![1u8; 8];
        expected.extend_from_slice(&[2; 8]);
        expected.extend_from_slice(&[3; 4]);
        assert_eq!(
            result,
            Reassembly::Complete {
                payload: expected,
                fragments: 3
            }
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_out_of_order() {
        let mut cache = FragmentCache::new();
        let ts = Timestamp::new(1, 0);
        assert_eq!(cache.insert(key(), frag(16, false), &[3; 4], ts), Reassembly::Pending);
        assert_eq!(cache.insert(key(), frag(0, true), &[1; 8], ts), Reassembly::Pending);
        match cache.insert(key(), frag(8, true), &[2; 8], ts) {
            Reassembly::Complete { payload, fragments } => {
                assert_eq!(payload.len(), 20);
                assert_eq!(&payload[8..16], &[2; 8]);
                assert_eq!(fragments, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_gap_stays_pending() {
        let mut cache = FragmentCache::new();
        let ts = Timestamp::new(1, 0);
        cache.insert(key(), frag(0, true), &[1; 8], ts);
        assert_eq!(cache.insert(key(), frag(16, false), &[3; 4], ts), Reassembly::Pending);
        assert_eq!(cache.len(), 1);

        let count = cache.purge(Timestamp::new(1, 0));
        assert_eq!(count, PurgeCount { purged: 1, broken: 1 });
        assert!(cache.is_empty());
    }

    #[test]
    fn test_overlap_is_broken() {
        let mut cache = FragmentCache::new();
        let ts = Timestamp::new(1, 0);
        cache.insert(key(), frag(0, true), &[1; 16], ts);
        assert_eq!(
            cache.insert(key(), frag(8, false), &[2; 8], ts),
            Reassembly::Broken { offset: 8 }
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_duplicate_first_seen_wins() {
        let mut cache = FragmentCache::new();
        let ts = Timestamp::new(1, 0);
        cache.insert(key(), frag(0, true), &[1; 8], ts);
        cache.insert(key(), frag(0, true), &[9; 8], ts);
        match cache.insert(key(), frag(8, false), &[2; 2], ts) {
            Reassembly::Complete { payload, fragments } => {
                assert_eq!(&payload[..8], &[1; 8]);
                assert_eq!(fragments, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_purge_keeps_recent() {
        let mut cache = FragmentCache::new();
        cache.insert(key(), frag(0, true), &[1; 8], Timestamp::new(10, 0));
        let mut other = key();
        other.id = 43;
        cache.insert(other, frag(0, true), &[1; 8], Timestamp::new(20, 0));

        let count = cache.purge(Timestamp::new(15, 0));
        assert_eq!(count, PurgeCount { purged: 1, broken: 0 });
        assert_eq!(cache.len(), 1);
    }
}
