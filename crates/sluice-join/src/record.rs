//! Joiner output.

use serde::Serialize;
use sluice_pcap::{DnsPacket, IcmpPacket, IpInfo, Timestamp, Transport};
use sluice_proto::Message;

/// One DNS message with the metadata of the packet that carried it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsEvent {
    /// Capture time.
    pub ts: Timestamp,
    /// Network metadata.
    pub ip: IpInfo,
    /// Transport metadata.
    pub transport: Transport,
    /// The message.
    pub message: Message,
}

impl DnsEvent {
    /// Pairs `message` with the metadata of `packet`.
    pub fn new(packet: &DnsPacket, message: Message) -> Self {
        Self {
            ts: packet.ts,
            ip: packet.ip.clone(),
            transport: packet.transport.clone(),
            message,
        }
    }
}

/// How a record came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// A query and its response.
    Matched,
    /// A query that timed out or was drained.
    Expired,
    /// A response with no pending query.
    ResponseOnly,
}

impl Outcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Expired => "expired",
            Self::ResponseOnly => "response_only",
        }
    }
}

/// A query, a response, or both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    /// The query side.
    pub request: Option<DnsEvent>,
    /// The response side.
    pub response: Option<DnsEvent>,
    /// Set when the query left the cache without a response.
    pub expired: bool,
}

impl JoinedRecord {
    pub(crate) fn matched(request: DnsEvent, response: DnsEvent) -> Self {
        Self {
            request: Some(request),
            response: Some(response),
            expired: false,
        }
    }

    pub(crate) fn expired(request: DnsEvent) -> Self {
        Self {
            request: Some(request),
            response: None,
            expired: true,
        }
    }

    pub(crate) fn response_only(response: DnsEvent) -> Self {
        Self {
            request: None,
            response: Some(response),
            expired: false,
        }
    }

    /// Classifies the record.
    pub fn outcome(&self) -> Outcome {
        match (&self.request, self.expired) {
            (Some(_), true) => Outcome::Expired,
            (Some(_), false) => Outcome::Matched,
            (None, _) => Outcome::ResponseOnly,
        }
    }

    /// Capture time of the earliest side.
    pub fn ts(&self) -> Timestamp {
        self.request
            .as_ref()
            .or(self.response.as_ref())
            .map(|e| e.ts)
            .unwrap_or_default()
    }
}

/// An item emitted by the Joiner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Output {
    /// A joined DNS record.
    Dns(JoinedRecord),
    /// An ICMP packet, passed through unchanged.
    Icmp(IcmpPacket),
}

impl Output {
    /// Returns the DNS record, if any.
    pub fn as_dns(&self) -> Option<&JoinedRecord> {
        match self {
            Self::Dns(record) => Some(record),
            Self::Icmp(_) => None,
        }
    }
}
