//! SOA record.

use crate::error::Result;
use crate::name::Name;
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SOA record - start of authority (RFC 1035).
///
/// # Wire Format
///
/// ```text
/// +-----------------------------------+
/// |              MNAME                |  primary name server
/// +-----------------------------------+
/// |              RNAME                |  responsible mailbox
/// +-----------------------------------+
/// |   SERIAL | REFRESH | RETRY        |  32-bit each
/// |   EXPIRE | MINIMUM                |
/// +-----------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SOA {
    /// Primary name server.
    pub mname: Name,
    /// Responsible mailbox.
    pub rname: Name,
    /// Zone serial.
    pub serial: u32,
    /// Refresh interval.
    pub refresh: u32,
    /// Retry interval.
    pub retry: u32,
    /// Expiry limit.
    pub expire: u32,
    /// Negative caching TTL.
    pub minimum: u32,
}

impl SOA {
    /// Reads an SOA record.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            mname: Name::read(reader)?,
            rname: Name::read(reader)?,
            serial: reader.read_u32()?,
            refresh: reader.read_u32()?,
            retry: reader.read_u32()?,
            expire: reader.read_u32()?,
            minimum: reader.read_u32()?,
        })
    }

    /// Writes the SOA record.
    pub fn write(&self, writer: &mut WireWriter) {
        self.mname.write(writer);
        self.rname.write(writer);
        writer.write_u32(self.serial);
        writer.write_u32(self.refresh);
        writer.write_u32(self.retry);
        writer.write_u32(self.expire);
        writer.write_u32(self.minimum);
    }
}

impl fmt::Display for SOA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum
        )
    }
}
