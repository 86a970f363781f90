//! Service records (SRV, NAPTR, URI, CAA).

use crate::error::{Error, Result};
use crate::name::Name;
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SRV record - service location (RFC 2782).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SRV {
    /// Lower values are preferred.
    pub priority: u16,
    /// Relative weight among equal priorities.
    pub weight: u16,
    /// Service port.
    pub port: u16,
    /// Target host. Never compressed on the wire, but compression is tolerated.
    pub target: Name,
}

impl SRV {
    /// Reads an SRV record.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            priority: reader.read_u16()?,
            weight: reader.read_u16()?,
            port: reader.read_u16()?,
            target: Name::read(reader)?,
        })
    }

    /// Writes the SRV record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.priority);
        writer.write_u16(self.weight);
        writer.write_u16(self.port);
        self.target.write(writer);
    }
}

impl fmt::Display for SRV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

/// NAPTR record - naming authority pointer (RFC 3403).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NAPTR {
    /// Processing order.
    pub order: u16,
    /// Preference among equal orders.
    pub preference: u16,
    /// Flags character-string.
    pub flags: Vec<u8>,
    /// Service parameters character-string.
    pub services: Vec<u8>,
    /// Substitution expression character-string.
    pub regexp: Vec<u8>,
    /// Replacement domain name.
    pub replacement: Name,
}

impl NAPTR {
    /// Reads a NAPTR record.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            order: reader.read_u16()?,
            preference: reader.read_u16()?,
            flags: reader.read_character_string()?.to_vec(),
            services: reader.read_character_string()?.to_vec(),
            regexp: reader.read_character_string()?.to_vec(),
            replacement: Name::read(reader)?,
        })
    }

    /// Writes the NAPTR record.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        writer.write_u16(self.order);
        writer.write_u16(self.preference);
        writer.write_character_string(&self.flags)?;
        writer.write_character_string(&self.services)?;
        writer.write_character_string(&self.regexp)?;
        self.replacement.write(writer);
        Ok(())
    }
}

impl fmt::Display for NAPTR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} \"{}\" \"{}\" \"{}\" {}",
            self.order,
            self.preference,
            String::from_utf8_lossy(&self.flags),
            String::from_utf8_lossy(&self.services),
            String::from_utf8_lossy(&self.regexp),
            self.replacement
        )
    }
}

/// URI record (RFC 7553).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct URI {
    /// Lower values are preferred.
    pub priority: u16,
    /// Relative weight.
    pub weight: u16,
    /// Target URI, the rest of the RDATA.
    pub target: Vec<u8>,
}

impl URI {
    /// Reads a URI record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength < 4 {
            return Err(Error::invalid_rdata("URI", "shorter than 4 bytes"));
        }
        Ok(Self {
            priority: reader.read_u16()?,
            weight: reader.read_u16()?,
            target: reader.read_bytes(rdlength - 4)?.to_vec(),
        })
    }

    /// Writes the URI record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.priority);
        writer.write_u16(self.weight);
        writer.write_bytes(&self.target);
    }
}

impl fmt::Display for URI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} \"{}\"",
            self.priority,
            self.weight,
            String::from_utf8_lossy(&self.target)
        )
    }
}

/// CAA record - certification authority authorization (RFC 8659).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CAA {
    /// Flags; bit 7 is the issuer-critical flag.
    pub flags: u8,
    /// Property tag, e.g. `issue`.
    pub tag: Vec<u8>,
    /// Property value, the rest of the RDATA.
    pub value: Vec<u8>,
}

impl CAA {
    /// Reads a CAA record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        let mut rdata = WireReader::new(reader.read_bytes(rdlength)?);
        let flags = rdata.read_u8()?;
        let tag = rdata.read_character_string()?.to_vec();
        if tag.is_empty() {
            return Err(Error::invalid_rdata("CAA", "empty tag"));
        }
        Ok(Self {
            flags,
            tag,
            value: rdata.read_rest().to_vec(),
        })
    }

    /// Returns true if the issuer-critical flag is set.
    pub fn is_critical(&self) -> bool {
        self.flags & 0x80 != 0
    }

    /// Writes the CAA record.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        writer.write_u8(self.flags);
        writer.write_character_string(&self.tag)?;
        writer.write_bytes(&self.value);
        Ok(())
    }
}

impl fmt::Display for CAA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} \"{}\"",
            self.flags,
            String::from_utf8_lossy(&self.tag),
            String::from_utf8_lossy(&self.value)
        )
    }
}
