//! Fingerprint and certificate association records (SSHFP, TLSA).

use crate::error::{Error, Result};
use crate::wire::{WireReader, WireWriter};
use data_encoding::HEXUPPER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SSHFP record - SSH public key fingerprint (RFC 4255).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SSHFP {
    /// Key algorithm (1 RSA, 2 DSA, 3 ECDSA, 4 Ed25519).
    pub algorithm: u8,
    /// Fingerprint type (1 SHA-1, 2 SHA-256).
    pub fingerprint_type: u8,
    /// Fingerprint bytes.
    pub fingerprint: Vec<u8>,
}

impl SSHFP {
    /// Reads an SSHFP record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength < 2 {
            return Err(Error::invalid_rdata("SSHFP", "shorter than 2 bytes"));
        }
        Ok(Self {
            algorithm: reader.read_u8()?,
            fingerprint_type: reader.read_u8()?,
            fingerprint: reader.read_bytes(rdlength - 2)?.to_vec(),
        })
    }

    /// Writes the SSHFP record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u8(self.algorithm);
        writer.write_u8(self.fingerprint_type);
        writer.write_bytes(&self.fingerprint);
    }
}

impl fmt::Display for SSHFP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.algorithm,
            self.fingerprint_type,
            HEXUPPER.encode(&self.fingerprint)
        )
    }
}

/// TLSA record - TLS certificate association (RFC 6698).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TLSA {
    /// Certificate usage.
    pub usage: u8,
    /// Selector.
    pub selector: u8,
    /// Matching type.
    pub matching_type: u8,
    /// Certificate association data.
    pub data: Vec<u8>,
}

impl TLSA {
    /// Reads a TLSA record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength < 3 {
            return Err(Error::invalid_rdata("TLSA", "shorter than 3 bytes"));
        }
        Ok(Self {
            usage: reader.read_u8()?,
            selector: reader.read_u8()?,
            matching_type: reader.read_u8()?,
            data: reader.read_bytes(rdlength - 3)?.to_vec(),
        })
    }

    /// Writes the TLSA record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u8(self.usage);
        writer.write_u8(self.selector);
        writer.write_u8(self.matching_type);
        writer.write_bytes(&self.data);
    }
}

impl fmt::Display for TLSA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.usage,
            self.selector,
            self.matching_type,
            HEXUPPER.encode(&self.data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sshfp_record() {
        let data = [4, 2, 0xAB, 0xCD];
        let sshfp = SSHFP::read(&mut WireReader::new(&data), 4).unwrap();
        assert_eq!(sshfp.algorithm, 4);
        assert_eq!(sshfp.to_string(), "4 2 ABCD");
    }

    #[test]
    fn test_tlsa_record() {
        let data = [3, 1, 1, 0x01, 0x02];
        let tlsa = TLSA::read(&mut WireReader::new(&data), 5).unwrap();
        assert_eq!(tlsa.data, vec![1, 2]);
        assert!(TLSA::read(&mut WireReader::new(&data), 2).is_err());
    }
}
