//! # Sluice Capture Decoding
//!
//! Turns pcap files into decoded DNS and ICMP packets.
//!
//! ## Pipeline
//!
//! ```text
//! file (.pcap / .gz / .xz)
//!   -> global header (byte order, precision, link type)
//!   -> frame -> link locator -> IPv4 / IPv6
//!                                  -> fragment reassembly
//!                                  -> UDP | TCP flow reassembly | ICMP
//!                                  -> DNS messages
//! ```
//!
//! Reassembly state is bounded by purges driven by capture timestamps, so
//! replaying an old capture behaves exactly like reading it live.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sluice_pcap::{PacketReader, ReaderConfig};
//! use std::sync::Arc;
//!
//! let reader = PacketReader::open("dns.pcap.gz", Arc::new(ReaderConfig::default()))?;
//! for packet in reader {
//!     println!("{:?}", packet?.ts());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fragment;
pub mod icmp;
pub mod ip;
pub mod link;
pub mod packet;
pub mod reader;
pub mod stats;
pub mod tcp;
pub mod udp;

// Re-exports for convenience
pub use capture::{ByteOrder, CaptureHeader, Compression, Precision};
pub use config::ReaderConfig;
pub use decoder::{Decoder, Purged};
pub use error::{Error, ErrorKind, Result};
pub use link::LinkType;
pub use packet::{DnsPacket, IcmpPacket, IpInfo, Packet, Timestamp, Transport};
pub use reader::PacketReader;
pub use stats::DecodeStats;
