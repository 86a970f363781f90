//! # Sluice
//!
//! Reads DNS traffic out of pcap captures and writes one JSON record per
//! query/response pair, unanswered query, unsolicited response or ICMP
//! message.
//!
//! Each capture is decoded and joined on its own blocking worker; records
//! from all workers flow through one bounded queue into a single writer.

pub mod pipeline;

pub use pipeline::{run, FileSummary, RunSummary};
