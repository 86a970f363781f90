//! Opaque RDATA for types without a decoder (RFC 3597).

use crate::error::Result;
use crate::wire::{WireReader, WireWriter};
use data_encoding::HEXUPPER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RDATA kept as raw bytes, uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unknown {
    /// Numeric record type.
    pub rtype: u16,
    /// The raw RDATA.
    pub data: Vec<u8>,
}

impl Unknown {
    /// Reads RDLENGTH raw bytes.
    pub fn read(reader: &mut WireReader<'_>, rtype: u16, rdlength: usize) -> Result<Self> {
        Ok(Self {
            rtype,
            data: reader.read_bytes(rdlength)?.to_vec(),
        })
    }

    /// Writes the raw bytes.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.data);
    }
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\# {}", self.data.len())?;
        if !self.data.is_empty() {
            write!(f, " {}", HEXUPPER.encode(&self.data))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_display() {
        let data = [0xDE, 0xAD];
        let unknown = Unknown::read(&mut WireReader::new(&data), 65280, 2).unwrap();
        assert_eq!(unknown.to_string(), "\\# 2 DEAD");
    }
}
