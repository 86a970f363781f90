//! Records whose RDATA is built around a domain name (NS, CNAME, PTR, DNAME, MX).

use crate::error::Result;
use crate::name::Name;
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! single_name_rdata {
    ($(#[$doc:meta])* $ty:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $ty {
            /// The target domain name.
            pub target: Name,
        }

        impl $ty {
            /// Reads the RDATA; the name may be compressed.
            pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
                Ok(Self {
                    target: Name::read(reader)?,
                })
            }

            /// Writes the name uncompressed.
            pub fn write(&self, writer: &mut WireWriter) {
                self.target.write(writer);
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.target)
            }
        }
    };
}

single_name_rdata!(
    /// NS record - authoritative name server (RFC 1035).
    NS
);
single_name_rdata!(
    /// CNAME record - canonical name (RFC 1035).
    CNAME
);
single_name_rdata!(
    /// PTR record - domain name pointer (RFC 1035).
    PTR
);
single_name_rdata!(
    /// DNAME record - delegation name (RFC 6672).
    DNAME
);

/// MX record - mail exchange (RFC 1035).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MX {
    /// Lower values are preferred.
    pub preference: u16,
    /// The mail server.
    pub exchange: Name,
}

impl MX {
    /// Reads an MX record.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            preference: reader.read_u16()?,
            exchange: Name::read(reader)?,
        })
    }

    /// Writes the MX record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.preference);
        self.exchange.write(writer);
    }
}

impl fmt::Display for MX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}
