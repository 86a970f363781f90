//! DNS message header.

use crate::error::Result;
use crate::wire::{WireReader, WireWriter};
use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the DNS header in bytes.
pub const HEADER_SIZE: usize = 12;

bitflags! {
    /// Single-bit header flags, at their positions in the 16-bit flags word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HeaderFlags: u16 {
        /// Query/Response flag: 0 = query, 1 = response
        const QR = 0x8000;
        /// Authoritative Answer
        const AA = 0x0400;
        /// Truncation
        const TC = 0x0200;
        /// Recursion Desired
        const RD = 0x0100;
        /// Recursion Available
        const RA = 0x0080;
        /// Reserved, must be zero
        const Z = 0x0040;
        /// Authentic Data (RFC 2535)
        const AD = 0x0020;
        /// Checking Disabled (RFC 2535)
        const CD = 0x0010;
    }
}

const OPCODE_SHIFT: u16 = 11;
const OPCODE_MASK: u16 = 0x0F;
const RCODE_MASK: u16 = 0x0F;

/// DNS operation code (RFC 1035, RFC 1996, RFC 2136).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum OpCode {
    /// Standard query
    Query = 0,
    /// Inverse query (obsolete)
    IQuery = 1,
    /// Server status request
    Status = 2,
    /// Zone change notification
    Notify = 4,
    /// Dynamic update
    Update = 5,
    /// DNS stateful operations
    Dso = 6,
}

/// Header response code, the low four bits only (RFC 1035, RFC 2136).
///
/// The upper eight bits of an extended rcode live in the OPT record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ResponseCode {
    /// No error
    NoError = 0,
    /// Format error
    FormErr = 1,
    /// Server failure
    ServFail = 2,
    /// Non-existent domain
    NXDomain = 3,
    /// Not implemented
    NotImp = 4,
    /// Query refused
    Refused = 5,
    /// Name exists when it should not
    YXDomain = 6,
    /// RR set exists when it should not
    YXRRSet = 7,
    /// RR set that should exist does not
    NXRRSet = 8,
    /// Server not authoritative for zone
    NotAuth = 9,
    /// Name not contained in zone
    NotZone = 10,
}

/// DNS message header.
///
/// The opcode and rcode are kept as raw 4-bit values so that captured
/// messages with unassigned codes still decode.
///
/// # Wire Format
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    QDCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ANCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    NSCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ARCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    /// Message identifier.
    pub id: u16,
    /// Single-bit flags.
    pub flags: HeaderFlags,
    /// 4-bit opcode.
    pub opcode: u8,
    /// 4-bit response code.
    pub rcode: u8,
    /// Question count.
    pub qd_count: u16,
    /// Answer count.
    pub an_count: u16,
    /// Authority count.
    pub ns_count: u16,
    /// Additional count.
    pub ar_count: u16,
}

impl Header {
    /// Creates a header for a standard query with the given ID.
    pub fn query(id: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::RD,
            ..Self::default()
        }
    }

    /// Returns true if the QR bit is clear.
    #[inline]
    pub fn is_query(&self) -> bool {
        !self.flags.contains(HeaderFlags::QR)
    }

    /// Returns true if the QR bit is set.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags.contains(HeaderFlags::QR)
    }

    /// Returns true if the TC bit is set.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags.contains(HeaderFlags::TC)
    }

    /// Returns the opcode if it is an assigned value.
    #[inline]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::try_from(self.opcode).ok()
    }

    /// Returns the response code if it is an assigned value.
    #[inline]
    pub fn rcode(&self) -> Option<ResponseCode> {
        ResponseCode::try_from(self.rcode).ok()
    }

    /// Sets or clears the QR bit.
    pub fn set_response(&mut self, response: bool) {
        self.flags.set(HeaderFlags::QR, response);
    }

    /// Reads a header from the cursor.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        let id = reader.read_u16()?;
        let word = reader.read_u16()?;
        Ok(Self {
            id,
            flags: HeaderFlags::from_bits_truncate(word),
            opcode: ((word >> OPCODE_SHIFT) & OPCODE_MASK) as u8,
            rcode: (word & RCODE_MASK) as u8,
            qd_count: reader.read_u16()?,
            an_count: reader.read_u16()?,
            ns_count: reader.read_u16()?,
            ar_count: reader.read_u16()?,
        })
    }

    /// Returns the 16-bit flags word as it appears on the wire.
    pub fn flags_word(&self) -> u16 {
        self.flags.bits()
            | ((u16::from(self.opcode) & OPCODE_MASK) << OPCODE_SHIFT)
            | (u16::from(self.rcode) & RCODE_MASK)
    }

    /// Writes the header.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.id);
        writer.write_u16(self.flags_word());
        writer.write_u16(self.qd_count);
        writer.write_u16(self.an_count);
        writer.write_u16(self.ns_count);
        writer.write_u16(self.ar_count);
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcode = self
            .opcode()
            .map_or_else(|| self.opcode.to_string(), |o| format!("{o:?}").to_uppercase());
        let status = self
            .rcode()
            .map_or_else(|| self.rcode.to_string(), |r| format!("{r:?}").to_uppercase());
        write!(
            f,
            ";; opcode: {opcode}, status: {status}, id: {}\n;; flags:",
            self.id
        )?;
        for (name, _) in self.flags.iter_names() {
            write!(f, " {}", name.to_lowercase())?;
        }
        write!(
            f,
            "; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            self.qd_count, self.an_count, self.ns_count, self.ar_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bit_positions() {
        // id 0x1234, QR|opcode=5|AA|RD|AD, rcode 3, counts 1/2/3/4
        let data = [
            0x12, 0x34, 0xAD, 0x23, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04,
        ];
        let header = Header::read(&mut WireReader::new(&data)).unwrap();

        assert_eq!(header.id, 0x1234);
        assert!(header.is_response());
        assert_eq!(header.opcode(), Some(OpCode::Update));
        assert!(header.flags.contains(HeaderFlags::AA));
        assert!(header.flags.contains(HeaderFlags::RD));
        assert!(header.flags.contains(HeaderFlags::AD));
        assert!(!header.flags.contains(HeaderFlags::CD));
        assert!(!header.is_truncated());
        assert_eq!(header.rcode(), Some(ResponseCode::NXDomain));
        assert_eq!(
            (header.qd_count, header.an_count, header.ns_count, header.ar_count),
            (1, 2, 3, 4)
        );

        let mut writer = WireWriter::new();
        header.write(&mut writer);
        assert_eq!(writer.as_bytes(), &data);
    }

    #[test]
    fn test_unassigned_codes_survive() {
        // opcode 15, rcode 15
        let data = [0, 1, 0x78, 0x0F, 0, 0, 0, 0, 0, 0, 0, 0];
        let header = Header::read(&mut WireReader::new(&data)).unwrap();
        assert_eq!(header.opcode, 15);
        assert_eq!(header.opcode(), None);
        assert_eq!(header.rcode, 15);
        assert_eq!(header.rcode(), None);
        assert_eq!(header.flags_word(), 0x780F);
    }

    #[test]
    fn test_header_too_short() {
        let data = [0, 1, 0, 0, 0, 1];
        assert!(Header::read(&mut WireReader::new(&data)).is_err());
    }

    #[test]
    fn test_header_display() {
        let header = Header::query(42);
        let text = header.to_string();
        assert!(text.contains("opcode: QUERY"));
        assert!(text.contains("id: 42"));
        assert!(text.contains("flags: rd;"));
    }
}
