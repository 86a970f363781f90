//! Address record types (A, AAAA).

use crate::error::{Error, Result};
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A record - IPv4 address (RFC 1035).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct A {
    /// The IPv4 address.
    pub address: Ipv4Addr,
}

impl A {
    /// Reads an A record. RDLENGTH must be exactly 4.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength != 4 {
            return Err(Error::invalid_rdata("A", format!("length {rdlength}, expected 4")));
        }
        Ok(Self {
            address: Ipv4Addr::from(reader.read_array::<4>()?),
        })
    }

    /// Writes the address octets.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.address.octets());
    }
}

impl fmt::Display for A {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// AAAA record - IPv6 address (RFC 3596).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AAAA {
    /// The IPv6 address.
    pub address: Ipv6Addr,
}

impl AAAA {
    /// Reads an AAAA record. RDLENGTH must be exactly 16.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength != 16 {
            return Err(Error::invalid_rdata(
                "AAAA",
                format!("length {rdlength}, expected 16"),
            ));
        }
        Ok(Self {
            address: Ipv6Addr::from(reader.read_array::<16>()?),
        })
    }

    /// Writes the address octets.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.address.octets());
    }
}

impl fmt::Display for AAAA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
