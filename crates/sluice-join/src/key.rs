//! Correlation keys.

use sluice_proto::{Message, Name};
use std::net::IpAddr;

/// Identifies a pending query.
///
/// `addr` and `port` are the client side: the query's source and the
/// response's destination. Name comparison ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Message ID.
    pub id: u16,
    /// First question name, absent when the question section is empty.
    pub qname: Option<Name>,
    /// Client address.
    pub addr: IpAddr,
    /// Client port.
    pub port: u16,
}

impl RequestKey {
    /// Key of a message exchanged with the client at `addr`:`port`.
    pub fn new(message: &Message, addr: IpAddr, port: u16) -> Self {
        Self {
            id: message.id(),
            qname: message.qname().cloned(),
            addr,
            port,
        }
    }
}

/// Identifies a zone-transfer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferKey {
    /// Message ID.
    pub id: u16,
    /// Client address.
    pub addr: IpAddr,
    /// Client port.
    pub port: u16,
}

impl TransferKey {
    /// Key of a transfer with the client at `addr`:`port`.
    pub fn new(message: &Message, addr: IpAddr, port: u16) -> Self {
        Self {
            id: message.id(),
            addr,
            port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_proto::{Question, RecordClass, RecordType};

    #[test]
    fn test_key_ignores_name_case() {
        let addr: IpAddr = "192.0.2.1".parse().unwrap();
        let lower = Message::query(
            7,
            Question::new("www.example.nl.".parse().unwrap(), RecordType::A, RecordClass::IN),
        );
        let upper = Message::query(
            7,
            Question::new("WWW.Example.NL.".parse().unwrap(), RecordType::A, RecordClass::IN),
        );
        assert_eq!(RequestKey::new(&lower, addr, 4000), RequestKey::new(&upper, addr, 4000));
        assert_ne!(RequestKey::new(&lower, addr, 4000), RequestKey::new(&lower, addr, 4001));
    }

    #[test]
    fn test_key_without_question() {
        let addr: IpAddr = "2001:db8::1".parse().unwrap();
        let key = RequestKey::new(&Message::default(), addr, 53);
        assert!(key.qname.is_none());
        assert_eq!(key.id, 0);
    }
}
