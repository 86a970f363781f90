//! Character-string based records (TXT, HINFO).

use crate::error::Result;
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

fn fmt_character_string(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &byte in bytes {
        match byte {
            b'"' | b'\\' => write!(f, "\\{}", byte as char)?,
            0x20..=0x7E => write!(f, "{}", byte as char)?,
            _ => write!(f, "\\{byte:03}")?,
        }
    }
    f.write_str("\"")
}

/// TXT record - one or more character-strings (RFC 1035).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TXT {
    /// The strings, each at most 255 bytes.
    pub strings: SmallVec<[Vec<u8>; 2]>,
}

impl TXT {
    /// Reads character-strings until RDLENGTH is used up.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        let mut rdata = WireReader::new(reader.read_bytes(rdlength)?);
        let mut strings = SmallVec::new();
        while !rdata.is_empty() {
            strings.push(rdata.read_character_string()?.to_vec());
        }
        Ok(Self { strings })
    }

    /// Writes the strings.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        for s in &self.strings {
            writer.write_character_string(s)?;
        }
        Ok(())
    }

    /// Returns all strings concatenated.
    pub fn data(&self) -> Vec<u8> {
        self.strings.concat()
    }
}

impl fmt::Display for TXT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.strings.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            fmt_character_string(f, s)?;
        }
        Ok(())
    }
}

/// HINFO record - host information (RFC 1035, RFC 8482).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HINFO {
    /// CPU type.
    pub cpu: Vec<u8>,
    /// Operating system.
    pub os: Vec<u8>,
}

impl HINFO {
    /// Reads an HINFO record.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            cpu: reader.read_character_string()?.to_vec(),
            os: reader.read_character_string()?.to_vec(),
        })
    }

    /// Writes the HINFO record.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        writer.write_character_string(&self.cpu)?;
        writer.write_character_string(&self.os)
    }
}

impl fmt::Display for HINFO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_character_string(f, &self.cpu)?;
        f.write_str(" ")?;
        fmt_character_string(f, &self.os)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txt_multiple_strings() {
        let data = [5, b'h', b'e', b'l', b'l', b'o', 0, 3, b'a', b'"', b'b'];
        let txt = TXT::read(&mut WireReader::new(&data), data.len()).unwrap();
        assert_eq!(txt.strings.len(), 3);
        assert_eq!(txt.data(), b"helloa\"b");
        assert_eq!(txt.to_string(), r#""hello" "" "a\"b""#);
    }

    #[test]
    fn test_txt_string_overruns_rdata() {
        // second string claims 4 bytes, only 2 remain inside RDLENGTH
        let data = [1, b'x', 4, b'a', b'b', b'c', b'd'];
        assert!(TXT::read(&mut WireReader::new(&data), 5).is_err());
    }

    #[test]
    fn test_hinfo_record() {
        let data = [3, b'A', b'R', b'M', 5, b'L', b'i', b'n', b'u', b'x'];
        let hinfo = HINFO::read(&mut WireReader::new(&data)).unwrap();
        assert_eq!(hinfo.to_string(), r#""ARM" "Linux""#);
    }
}
