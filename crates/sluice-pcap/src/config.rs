//! Packet Reader configuration.

use serde::{Deserialize, Serialize};
use sluice_proto::{DecodeMode, DNS_PORT};
use std::time::Duration;

/// Packet Reader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Ports whose UDP datagrams and TCP flows carry DNS.
    pub dns_ports: Vec<u16>,

    /// Idle time after which a TCP flow is dropped (seconds).
    pub flow_timeout_secs: u64,

    /// Time after which an incomplete datagram is dropped (seconds).
    pub fragment_timeout_secs: u64,

    /// Capture time between purges of reassembly state (seconds).
    pub purge_interval_secs: u64,

    /// How DNS payloads are decoded.
    pub dns_mode: DecodeMode,

    /// Yield ICMP packets.
    pub decode_icmp: bool,

    /// Check UDP checksums and count mismatches.
    pub verify_udp_checksum: bool,

    /// Frames larger than this are skipped (bytes).
    pub max_frame_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            dns_ports: vec![DNS_PORT],
            flow_timeout_secs: 300,
            fragment_timeout_secs: 300,
            purge_interval_secs: 60,
            dns_mode: DecodeMode::Strict,
            decode_icmp: true,
            verify_udp_checksum: false,
            max_frame_size: 262_144,
        }
    }
}

impl ReaderConfig {
    /// Returns true if `port` carries DNS.
    #[inline]
    pub fn is_dns_port(&self, port: u16) -> bool {
        self.dns_ports.contains(&port)
    }

    /// Returns true if either port carries DNS.
    #[inline]
    pub fn is_dns(&self, src_port: u16, dst_port: u16) -> bool {
        self.is_dns_port(src_port) || self.is_dns_port(dst_port)
    }

    /// Flow idle timeout.
    pub fn flow_timeout(&self) -> Duration {
        Duration::from_secs(self.flow_timeout_secs)
    }

    /// Fragment timeout.
    pub fn fragment_timeout(&self) -> Duration {
        Duration::from_secs(self.fragment_timeout_secs)
    }

    /// Validates value ranges, returning the offending field and reason.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if self.dns_ports.is_empty() {
            return Err(("reader.dns_ports", "at least one port is required".into()));
        }
        if self.purge_interval_secs == 0 {
            return Err(("reader.purge_interval_secs", "must be greater than zero".into()));
        }
        if self.max_frame_size < 64 {
            return Err((
                "reader.max_frame_size",
                format!("{} is below the 64-byte minimum", self.max_frame_size),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert!(config.is_dns_port(53));
        assert!(config.is_dns(40000, 53));
        assert!(!config.is_dns(40000, 443));
        assert_eq!(config.flow_timeout(), Duration::from_secs(300));
        assert_eq!(config.dns_mode, DecodeMode::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReaderConfig =
            serde_json::from_str(r#"{"dns_ports": [53, 5353], "dns_mode": "lenient"}"#).unwrap();
        assert!(config.is_dns_port(5353));
        assert_eq!(config.dns_mode, DecodeMode::Lenient);
        assert_eq!(config.purge_interval_secs, 60);
    }

    #[test]
    fn test_validate() {
        let config = ReaderConfig {
            dns_ports: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().0, "reader.dns_ports");

        let config = ReaderConfig {
            max_frame_size: 10,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().0, "reader.max_frame_size");
    }
}
