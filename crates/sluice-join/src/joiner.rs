//! The Packet Joiner.

use crate::config::JoinerConfig;
use crate::key::{RequestKey, TransferKey};
use crate::record::{DnsEvent, JoinedRecord, Output};
use crate::stats::JoinStats;
use hashbrown::HashMap;
use sluice_pcap::{DnsPacket, Packet, Timestamp};
use sluice_proto::Message;
use tracing::{info, trace};

/// Progress of one zone transfer.
#[derive(Debug, Clone, Copy)]
struct Transfer {
    responses: u64,
    last_seen: Timestamp,
}

/// Correlates the packets of one capture into joined records.
///
/// All timing is capture time: the Joiner never looks at the wall clock,
/// so replaying a capture always produces the same records.
#[derive(Debug)]
pub struct Joiner {
    config: JoinerConfig,
    pending: HashMap<RequestKey, DnsEvent>,
    transfers: HashMap<TransferKey, Transfer>,
    latest: Option<Timestamp>,
    stats: JoinStats,
}

impl Joiner {
    /// Creates an empty Joiner.
    pub fn new(config: JoinerConfig) -> Self {
        Self {
            config,
            pending: HashMap::new(),
            transfers: HashMap::new(),
            latest: None,
            stats: JoinStats::default(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &JoinerConfig {
        &self.config
    }

    /// Counters so far.
    pub fn stats(&self) -> &JoinStats {
        &self.stats
    }

    /// Queries waiting for a response.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Zone transfers being tracked.
    pub fn transfers(&self) -> usize {
        self.transfers.len()
    }

    /// Capture time of the latest DNS packet seen.
    pub fn latest(&self) -> Option<Timestamp> {
        self.latest
    }

    /// Consumes one packet, returning any records it completes.
    pub fn on_packet(&mut self, packet: Packet) -> Vec<Output> {
        self.stats.packets += 1;
        match packet {
            Packet::Icmp(icmp) => {
                if !self.config.icmp {
                    return Vec::new();
                }
                self.stats.icmp += 1;
                vec![Output::Icmp(icmp)]
            }
            Packet::Dns(dns) => self.on_dns(dns),
        }
    }

    fn on_dns(&mut self, mut packet: DnsPacket) -> Vec<Output> {
        if packet.messages.is_empty() {
            return Vec::new();
        }
        self.latest = Some(self.latest.map_or(packet.ts, |latest| latest.max(packet.ts)));

        let messages = std::mem::take(&mut packet.messages);
        let mut out = Vec::new();
        for message in messages {
            if message.is_query() {
                self.on_query(&packet, message);
            } else if let Some(record) = self.on_response(&packet, message) {
                out.push(Output::Dns(record));
            }
        }
        out
    }

    fn on_query(&mut self, packet: &DnsPacket, message: Message) {
        self.stats.queries += 1;
        let (addr, port) = packet.source();

        if message.is_zone_transfer() {
            self.transfers.insert(
                TransferKey::new(&message, addr, port),
                Transfer {
                    responses: 0,
                    last_seen: packet.ts,
                },
            );
        }

        let key = RequestKey::new(&message, addr, port);
        if let Some(stale) = self.pending.insert(key, DnsEvent::new(packet, message)) {
            trace!(id = stale.message.id(), at = %stale.ts, "pending query replaced");
        }
    }

    fn on_response(&mut self, packet: &DnsPacket, message: Message) -> Option<JoinedRecord> {
        self.stats.responses += 1;
        let (addr, port) = packet.destination();

        if let Some(transfer) = self.transfers.get_mut(&TransferKey::new(&message, addr, port)) {
            transfer.responses += 1;
            transfer.last_seen = transfer.last_seen.max(packet.ts);
            if transfer.responses > 1 {
                self.stats.transfer_responses_dropped += 1;
                return None;
            }
        }

        let key = RequestKey::new(&message, addr, port);
        let response = DnsEvent::new(packet, message);
        match self.pending.remove(&key) {
            Some(request) => {
                self.stats.matched += 1;
                Some(JoinedRecord::matched(request, response))
            }
            None if key.qname.is_some() => {
                self.stats.unmatched_responses += 1;
                Some(JoinedRecord::response_only(response))
            }
            None => {
                trace!(id = key.id, "dropping unmatched response without a question");
                None
            }
        }
    }

    /// Expires queries older than the timeout.
    ///
    /// A query that arrived at or before `latest - timeout` is removed and,
    /// if it carries a question, emitted as expired. Zone transfers idle
    /// for as long are forgotten.
    pub fn purge(&mut self) -> Vec<Output> {
        let Some(latest) = self.latest else {
            return Vec::new();
        };
        let cutoff = latest.saturating_sub_secs(self.config.timeout_secs);

        let stale: Vec<DnsEvent> = self
            .pending
            .extract_if(|_, event| event.ts <= cutoff)
            .map(|(_, event)| event)
            .collect();
        let transfers = self.transfers.len();
        self.transfers.retain(|_, t| t.last_seen > cutoff);

        let found = stale.len();
        let out = self.expire(stale);
        if found > 0 || transfers != self.transfers.len() {
            info!(
                at = %latest,
                expired = out.len(),
                discarded = found - out.len(),
                pending = self.pending.len(),
                transfers = self.transfers.len(),
                "purged pending queries"
            );
        }
        out
    }

    /// Flushes every pending query as expired, regardless of age.
    pub fn drain(&mut self) -> Vec<Output> {
        let stale: Vec<DnsEvent> = self.pending.drain().map(|(_, event)| event).collect();
        self.transfers.clear();
        self.expire(stale)
    }

    fn expire(&mut self, mut stale: Vec<DnsEvent>) -> Vec<Output> {
        stale.sort_by_key(|event| event.ts);
        let out: Vec<Output> = stale
            .into_iter()
            .filter(|event| event.message.question().is_some())
            .map(|event| Output::Dns(JoinedRecord::expired(event)))
            .collect();
        self.stats.expired += out.len() as u64;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Outcome;
    use sluice_pcap::{IcmpPacket, IpInfo, Transport};
    use sluice_proto::{Question, RecordClass, RecordType};
    use std::net::IpAddr;

    const CLIENT: &str = "192.0.2.1";
    const SERVER: &str = "192.0.2.53";

    fn ip(src: &str, dst: &str) -> IpInfo {
        IpInfo {
            version: 4,
            ttl: 64,
            header_len: 20,
            protocol: 17,
            src: src.parse().unwrap(),
            dst: dst.parse().unwrap(),
            id: 1,
            fragments: 0,
        }
    }

    fn packet(secs: u64, src: &str, sport: u16, dst: &str, dport: u16, messages: Vec<Message>) -> Packet {
        Packet::Dns(DnsPacket {
            ts: Timestamp::new(secs, 0),
            ip: ip(src, dst),
            transport: Transport::Udp {
                src_port: sport,
                dst_port: dport,
                checksum_ok: None,
            },
            messages,
        })
    }

    fn query_msg(id: u16, qname: &str, qtype: RecordType) -> Message {
        Message::query(id, Question::new(qname.parse().unwrap(), qtype, RecordClass::IN))
    }

    fn response_msg(id: u16, qname: &str, qtype: RecordType) -> Message {
        let mut msg = query_msg(id, qname, qtype);
        msg.header.set_response(true);
        msg
    }

    fn query(secs: u64, id: u16, qname: &str) -> Packet {
        packet(secs, CLIENT, 40000, SERVER, 53, vec![query_msg(id, qname, RecordType::A)])
    }

    fn response(secs: u64, id: u16, qname: &str) -> Packet {
        packet(secs, SERVER, 53, CLIENT, 40000, vec![response_msg(id, qname, RecordType::A)])
    }

    fn records(out: Vec<Output>) -> Vec<JoinedRecord> {
        out.into_iter()
            .filter_map(|o| match o {
                Output::Dns(r) => Some(r),
                Output::Icmp(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_query_and_response_join() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        assert!(joiner.on_packet(query(100, 1, "www.example.nl.")).is_empty());
        assert_eq!(joiner.pending(), 1);

        let out = records(joiner.on_packet(response(100, 1, "www.example.nl.")));
        assert_eq!(out.len(), 1);
        let record = &out[0];
        assert_eq!(record.outcome(), Outcome::Matched);
        assert!(!record.expired);
        let request = record.request.as_ref().unwrap();
        let response = record.response.as_ref().unwrap();
        assert_eq!(request.message.qname(), response.message.qname());
        assert_eq!(request.ip.src, CLIENT.parse::<IpAddr>().unwrap());
        assert_eq!(joiner.pending(), 0);
        assert_eq!(joiner.stats().matched, 1);
    }

    #[test]
    fn test_join_ignores_name_case() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(query(100, 9, "WWW.Example.NL."));
        let out = records(joiner.on_packet(response(100, 9, "www.example.nl.")));
        assert_eq!(out[0].outcome(), Outcome::Matched);
    }

    #[test]
    fn test_mismatched_port_does_not_join() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(query(100, 1, "www.example.nl."));
        let other = packet(
            100,
            SERVER,
            53,
            CLIENT,
            40001,
            vec![response_msg(1, "www.example.nl.", RecordType::A)],
        );
        let out = records(joiner.on_packet(other));
        assert_eq!(out[0].outcome(), Outcome::ResponseOnly);
        assert_eq!(joiner.pending(), 1);
    }

    #[test]
    fn test_query_expires_at_timeout() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(query(100, 1, "www.example.nl."));

        joiner.on_packet(query(101, 2, "other.example.nl."));
        assert!(joiner.purge().is_empty());
        assert_eq!(joiner.pending(), 2);

        joiner.on_packet(query(102, 3, "third.example.nl."));
        let out = records(joiner.purge());
        assert_eq!(out.len(), 1);
        assert!(out[0].expired);
        assert_eq!(out[0].outcome(), Outcome::Expired);
        assert_eq!(out[0].request.as_ref().unwrap().message.id(), 1);
        assert_eq!(joiner.pending(), 2);
        assert_eq!(joiner.stats().expired, 1);

        // A late response no longer finds its query.
        let out = records(joiner.on_packet(response(103, 1, "www.example.nl.")));
        assert_eq!(out[0].outcome(), Outcome::ResponseOnly);
    }

    #[test]
    fn test_expired_queries_come_out_in_time_order() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        for (i, secs) in [105u64, 100, 103].into_iter().enumerate() {
            joiner.on_packet(query(secs, i as u16, "www.example.nl."));
        }
        let out = records(joiner.drain());
        let times: Vec<u64> = out.iter().map(|r| r.ts().secs).collect();
        assert_eq!(times, vec![100, 103, 105]);
        assert!(out.iter().all(|r| r.expired));
        assert_eq!(joiner.pending(), 0);
    }

    #[test]
    fn test_question_less_query_expires_silently() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        let bare = Message::default();
        joiner.on_packet(packet(100, CLIENT, 40000, SERVER, 53, vec![bare]));
        assert_eq!(joiner.pending(), 1);
        assert!(joiner.drain().is_empty());
        assert_eq!(joiner.stats().expired, 0);
    }

    #[test]
    fn test_unmatched_response_without_question_dropped() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        let mut bare = Message::default();
        bare.header.set_response(true);
        let out = joiner.on_packet(packet(100, SERVER, 53, CLIENT, 40000, vec![bare]));
        assert!(out.is_empty());
        assert_eq!(joiner.stats().responses, 1);
        assert_eq!(joiner.stats().unmatched_responses, 0);
    }

    #[test]
    fn test_zone_transfer_joins_first_response_only() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(packet(
            100,
            CLIENT,
            40000,
            SERVER,
            53,
            vec![query_msg(5, "example.nl.", RecordType::AXFR)],
        ));
        assert_eq!(joiner.transfers(), 1);

        let mut all = Vec::new();
        for secs in 100..103 {
            let msg = response_msg(5, "example.nl.", RecordType::AXFR);
            all.extend(joiner.on_packet(packet(secs, SERVER, 53, CLIENT, 40000, vec![msg])));
        }
        let out = records(all);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].outcome(), Outcome::Matched);
        assert_eq!(joiner.stats().transfer_responses_dropped, 2);
    }

    #[test]
    fn test_idle_transfer_forgotten_by_purge() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(packet(
            100,
            CLIENT,
            40000,
            SERVER,
            53,
            vec![query_msg(5, "example.nl.", RecordType::IXFR)],
        ));
        joiner.on_packet(query(110, 6, "www.example.nl."));
        joiner.purge();
        assert_eq!(joiner.transfers(), 0);
        assert_eq!(joiner.pending(), 1);
    }

    #[test]
    fn test_repeated_query_replaces_pending() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(query(100, 1, "www.example.nl."));
        joiner.on_packet(query(101, 1, "www.example.nl."));
        assert_eq!(joiner.pending(), 1);
        let out = records(joiner.on_packet(response(101, 1, "www.example.nl.")));
        assert_eq!(out[0].request.as_ref().unwrap().ts, Timestamp::new(101, 0));
        assert!(joiner.drain().is_empty());
    }

    #[test]
    fn test_multiple_messages_in_one_packet() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(packet(
            100,
            CLIENT,
            40000,
            SERVER,
            53,
            vec![
                query_msg(1, "a.example.nl.", RecordType::A),
                query_msg(2, "b.example.nl.", RecordType::AAAA),
            ],
        ));
        assert_eq!(joiner.stats().queries, 2);
        let out = records(joiner.on_packet(packet(
            100,
            SERVER,
            53,
            CLIENT,
            40000,
            vec![
                response_msg(2, "b.example.nl.", RecordType::AAAA),
                response_msg(1, "a.example.nl.", RecordType::A),
            ],
        )));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.outcome() == Outcome::Matched));
    }

    #[test]
    fn test_empty_packet_does_not_advance_time() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(query(100, 1, "www.example.nl."));
        joiner.on_packet(packet(500, CLIENT, 40000, SERVER, 53, Vec::new()));
        assert_eq!(joiner.latest(), Some(Timestamp::new(100, 0)));
        assert!(joiner.purge().is_empty());
    }

    #[test]
    fn test_icmp_passthrough() {
        let icmp = Packet::Icmp(IcmpPacket {
            ts: Timestamp::new(100, 0),
            ip: ip(SERVER, CLIENT),
            icmp_type: 3,
            code: 3,
            echo: None,
            embedded: None,
        });

        let mut joiner = Joiner::new(JoinerConfig::default());
        let out = joiner.on_packet(icmp.clone());
        assert!(matches!(out.as_slice(), [Output::Icmp(_)]));
        assert_eq!(joiner.stats().icmp, 1);

        let mut joiner = Joiner::new(JoinerConfig {
            icmp: false,
            ..Default::default()
        });
        assert!(joiner.on_packet(icmp).is_empty());
        assert_eq!(joiner.stats().packets, 1);
        assert_eq!(joiner.stats().icmp, 0);
    }

    #[test]
    fn test_output_serializes_tagged() {
        let mut joiner = Joiner::new(JoinerConfig::default());
        joiner.on_packet(query(100, 1, "www.example.nl."));
        let out = joiner.on_packet(response(100, 1, "www.example.nl."));
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["type"], "dns");
        assert_eq!(json["expired"], false);
        assert_eq!(json["request"]["transport"]["protocol"], "udp");
    }
}
