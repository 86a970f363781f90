//! # Sluice Packet Joiner
//!
//! Pairs DNS queries with their responses.
//!
//! Queries wait in a pending cache keyed on message ID, first question name,
//! and the client's address and port. A response looks up the same key from
//! the other direction. Queries that see no response within the configured
//! timeout, measured in capture time, are emitted as expired.
//!
//! Zone transfers are special: only the first response of an AXFR or IXFR
//! stream is joined, the rest of the transfer is dropped.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sluice_join::{Joiner, JoinerConfig};
//!
//! let mut joiner = Joiner::new(JoinerConfig::default());
//! for packet in reader {
//!     for output in joiner.on_packet(packet?) {
//!         emit(output);
//!     }
//! }
//! for output in joiner.drain() {
//!     emit(output);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod joiner;
pub mod key;
pub mod record;
pub mod stats;

pub use config::JoinerConfig;
pub use joiner::Joiner;
pub use key::{RequestKey, TransferKey};
pub use record::{DnsEvent, JoinedRecord, Outcome, Output};
pub use stats::JoinStats;
