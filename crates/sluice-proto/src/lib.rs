//! # Sluice DNS Wire Format
//!
//! DNS message decoding for captured traffic, where the input is whatever
//! happened to be on the wire: truncated datagrams, looping compression
//! pointers, records overrunning their RDLENGTH.
//!
//! ## Features
//!
//! - **Bounds-checked cursor** ([`WireReader`]): every read past the end is a
//!   [`Error::BufferUnderrun`], never a panic
//! - **Name decompression** with backward-only pointers and a hop cap
//! - **Typed RDATA** for common and DNSSEC types, raw bytes for the rest
//! - **Enforced RRsets**: a set only accepts records with its owner, class and type
//! - **EDNS(0)** option decoding, including the EDNS-ping / DAU overlap on code 5
//! - **Strict and lenient decoding**: a lenient decode returns the partial message
//! - **DNSSEC key utilities**: key tags, flag tests, RSA key extraction
//!
//! ## Example
//!
//! ```rust,ignore
//! use sluice_proto::{DecodeMode, Message};
//!
//! let bytes: &[u8] = &[/* DNS message bytes */];
//! let message = Message::decode(bytes, DecodeMode::Lenient)?;
//! if let Some(qname) = message.qname() {
//!     println!("{qname} partial={}", message.partial);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod class;
pub mod edns;
pub mod error;
pub mod header;
pub mod keys;
pub mod message;
pub mod name;
pub mod question;
pub mod rdata;
pub mod record;
pub mod rtype;
pub mod wire;

// Re-exports for convenience
pub use class::{Class, RecordClass};
pub use edns::{Edns, EdnsOption};
pub use error::{Error, Result};
pub use header::{Header, HeaderFlags, OpCode, ResponseCode};
pub use message::{DecodeFailure, DecodeMode, Message, Section};
pub use name::Name;
pub use question::Question;
pub use rdata::RData;
pub use record::{RRset, ResourceRecord};
pub use rtype::{RecordType, Type};
pub use wire::{WireReader, WireWriter};

/// Maximum length of a DNS label (63 bytes per RFC 1035)
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a domain name (255 bytes per RFC 1035)
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum number of compression pointers followed while reading one name
pub const MAX_POINTER_HOPS: usize = 10;

/// Well-known DNS port
pub const DNS_PORT: u16 = 53;
