//! DNSSEC record types (DNSKEY, DS, RRSIG, NSEC, NSEC3, NSEC3PARAM).
//!
//! CDNSKEY and CDS (RFC 7344) share the DNSKEY and DS layouts.

use crate::error::{Error, Result};
use crate::keys;
use crate::name::Name;
use crate::rtype::Type;
use crate::wire::{WireReader, WireWriter};
use data_encoding::{BASE32HEX_NOPAD, BASE64, HEXUPPER};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNSSEC algorithm numbers (RFC 8624).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum DnsSecAlgorithm {
    /// RSA/MD5 (deprecated)
    RsaMd5 = 1,
    /// Diffie-Hellman
    Dh = 2,
    /// DSA/SHA1
    Dsa = 3,
    /// RSA/SHA-1
    RsaSha1 = 5,
    /// DSA-NSEC3-SHA1
    DsaNsec3Sha1 = 6,
    /// RSA/SHA-1 NSEC3
    RsaSha1Nsec3Sha1 = 7,
    /// RSA/SHA-256
    RsaSha256 = 8,
    /// RSA/SHA-512
    RsaSha512 = 10,
    /// GOST R 34.10-2001
    EccGost = 12,
    /// ECDSA Curve P-256 with SHA-256
    EcdsaP256Sha256 = 13,
    /// ECDSA Curve P-384 with SHA-384
    EcdsaP384Sha384 = 14,
    /// Ed25519
    Ed25519 = 15,
    /// Ed448
    Ed448 = 16,
}

impl DnsSecAlgorithm {
    /// Returns true for the RSA family, whose keys carry an exponent and modulus.
    pub const fn is_rsa(self) -> bool {
        matches!(
            self,
            Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 | Self::RsaSha256 | Self::RsaSha512
        )
    }
}

/// DS digest types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum DigestType {
    /// SHA-1
    Sha1 = 1,
    /// SHA-256
    Sha256 = 2,
    /// GOST R 34.11-94
    Gost = 3,
    /// SHA-384
    Sha384 = 4,
}

impl DigestType {
    /// Returns the digest length in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 | Self::Gost => 32,
            Self::Sha384 => 48,
        }
    }
}

// =============================================================================
// DNSKEY
// =============================================================================

/// DNSKEY record - DNS public key (RFC 4034 Section 2).
///
/// ```text
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |              Flags            |  Protocol |  Algorithm  |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                    Public Key                 /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DNSKEY {
    /// Flags field; see [`keys::ZONE_KEY_FLAG`] and [`keys::SEP_FLAG`].
    pub flags: u16,
    /// Protocol, always 3.
    pub protocol: u8,
    /// Algorithm number.
    pub algorithm: u8,
    /// Public key material.
    pub public_key: Vec<u8>,
}

impl DNSKEY {
    /// Reads a DNSKEY record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength < 4 {
            return Err(Error::invalid_rdata("DNSKEY", "shorter than 4 bytes"));
        }
        Ok(Self {
            flags: reader.read_u16()?,
            protocol: reader.read_u8()?,
            algorithm: reader.read_u8()?,
            public_key: reader.read_bytes(rdlength - 4)?.to_vec(),
        })
    }

    /// Writes the DNSKEY record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.flags);
        writer.write_u8(self.protocol);
        writer.write_u8(self.algorithm);
        writer.write_bytes(&self.public_key);
    }

    /// Returns the RDATA in wire form.
    pub fn to_rdata(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(4 + self.public_key.len());
        self.write(&mut writer);
        writer.as_bytes().to_vec()
    }

    /// Returns the algorithm if it is an assigned value.
    pub fn algorithm(&self) -> Option<DnsSecAlgorithm> {
        DnsSecAlgorithm::try_from(self.algorithm).ok()
    }

    /// Returns true if the zone key flag is set.
    pub fn is_zone_key(&self) -> bool {
        keys::is_zone_key(self.flags)
    }

    /// Returns true if this is a secure entry point (key signing key).
    pub fn is_sep(&self) -> bool {
        keys::is_secure_entry_point(self.flags)
    }

    /// Computes the key tag (RFC 4034 Appendix B).
    pub fn key_tag(&self) -> u16 {
        keys::key_tag(&self.to_rdata(), self.algorithm)
    }
}

impl fmt::Display for DNSKEY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.flags,
            self.protocol,
            self.algorithm,
            BASE64.encode(&self.public_key)
        )
    }
}

// =============================================================================
// DS
// =============================================================================

/// DS record - delegation signer (RFC 4034 Section 5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DS {
    /// Key tag of the referenced DNSKEY.
    pub key_tag: u16,
    /// Algorithm of the referenced DNSKEY.
    pub algorithm: u8,
    /// Digest type.
    pub digest_type: u8,
    /// Digest of the referenced DNSKEY.
    pub digest: Vec<u8>,
}

impl DS {
    /// Reads a DS record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength < 4 {
            return Err(Error::invalid_rdata("DS", "shorter than 4 bytes"));
        }
        Ok(Self {
            key_tag: reader.read_u16()?,
            algorithm: reader.read_u8()?,
            digest_type: reader.read_u8()?,
            digest: reader.read_bytes(rdlength - 4)?.to_vec(),
        })
    }

    /// Writes the DS record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.key_tag);
        writer.write_u8(self.algorithm);
        writer.write_u8(self.digest_type);
        writer.write_bytes(&self.digest);
    }

    /// Returns the digest type if it is an assigned value.
    pub fn digest_type(&self) -> Option<DigestType> {
        DigestType::try_from(self.digest_type).ok()
    }
}

impl fmt::Display for DS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.key_tag,
            self.algorithm,
            self.digest_type,
            HEXUPPER.encode(&self.digest)
        )
    }
}

// =============================================================================
// RRSIG
// =============================================================================

/// RRSIG record - signature over an RRset (RFC 4034 Section 3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RRSIG {
    /// Type of the signed RRset.
    pub type_covered: Type,
    /// Algorithm number.
    pub algorithm: u8,
    /// Number of labels in the original owner name.
    pub labels: u8,
    /// TTL of the signed RRset.
    pub original_ttl: u32,
    /// Signature expiration, seconds since the epoch (mod 2^32).
    pub expiration: u32,
    /// Signature inception, seconds since the epoch (mod 2^32).
    pub inception: u32,
    /// Key tag of the signing key.
    pub key_tag: u16,
    /// Owner of the signing key.
    pub signer_name: Name,
    /// Signature bytes.
    pub signature: Vec<u8>,
}

impl RRSIG {
    /// Reads an RRSIG record. The signature runs to the end of the RDATA.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        let end = reader.position() + rdlength;
        let type_covered = Type::from_u16(reader.read_u16()?);
        let algorithm = reader.read_u8()?;
        let labels = reader.read_u8()?;
        let original_ttl = reader.read_u32()?;
        let expiration = reader.read_u32()?;
        let inception = reader.read_u32()?;
        let key_tag = reader.read_u16()?;
        let signer_name = Name::read(reader)?;
        let remaining = end
            .checked_sub(reader.position())
            .ok_or_else(|| Error::invalid_rdata("RRSIG", "signer name overruns RDATA"))?;
        let signature = reader.read_bytes(remaining)?.to_vec();

        Ok(Self {
            type_covered,
            algorithm,
            labels,
            original_ttl,
            expiration,
            inception,
            key_tag,
            signer_name,
            signature,
        })
    }

    /// Writes the RRSIG record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u16(self.type_covered.to_u16());
        writer.write_u8(self.algorithm);
        writer.write_u8(self.labels);
        writer.write_u32(self.original_ttl);
        writer.write_u32(self.expiration);
        writer.write_u32(self.inception);
        writer.write_u16(self.key_tag);
        self.signer_name.write(writer);
        writer.write_bytes(&self.signature);
    }
}

impl fmt::Display for RRSIG {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.type_covered,
            self.algorithm,
            self.labels,
            self.original_ttl,
            self.expiration,
            self.inception,
            self.key_tag,
            self.signer_name,
            BASE64.encode(&self.signature)
        )
    }
}

// =============================================================================
// Type bitmaps
// =============================================================================

/// Decodes an NSEC/NSEC3 type bitmap (RFC 4034 Section 4.1.2).
fn read_type_bitmap(data: &[u8]) -> Result<Vec<Type>> {
    let mut reader = WireReader::new(data);
    let mut types = Vec::new();
    while !reader.is_empty() {
        let window = reader.read_u8()?;
        let len = reader.read_u8()?;
        if len == 0 || len > 32 {
            return Err(Error::invalid_rdata(
                "NSEC",
                format!("bitmap length {len} in window {window}"),
            ));
        }
        for (i, &byte) in reader.read_bytes(usize::from(len))?.iter().enumerate() {
            for bit in 0..8 {
                if byte & (0x80 >> bit) != 0 {
                    let value = (u16::from(window) << 8) | (i as u16 * 8 + bit);
                    types.push(Type::from_u16(value));
                }
            }
        }
    }
    Ok(types)
}

fn write_type_bitmap(types: &[Type], writer: &mut WireWriter) {
    let mut values: Vec<u16> = types.iter().map(|t| t.to_u16()).collect();
    values.sort_unstable();
    values.dedup();

    let mut i = 0;
    while i < values.len() {
        let window = (values[i] >> 8) as u8;
        let mut bitmap = [0u8; 32];
        let mut len = 0;
        while i < values.len() && (values[i] >> 8) as u8 == window {
            let low = (values[i] & 0xFF) as usize;
            bitmap[low / 8] |= 0x80 >> (low % 8);
            len = low / 8 + 1;
            i += 1;
        }
        writer.write_u8(window);
        writer.write_u8(len as u8);
        writer.write_bytes(&bitmap[..len]);
    }
}

fn fmt_types(f: &mut fmt::Formatter<'_>, types: &[Type]) -> fmt::Result {
    for t in types {
        write!(f, " {t}")?;
    }
    Ok(())
}

// =============================================================================
// NSEC
// =============================================================================

/// NSEC record - authenticated denial of existence (RFC 4034 Section 4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NSEC {
    /// Next owner name in canonical order.
    pub next_name: Name,
    /// Types present at the owner name.
    pub types: Vec<Type>,
}

impl NSEC {
    /// Reads an NSEC record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        let end = reader.position() + rdlength;
        let next_name = Name::read(reader)?;
        let remaining = end
            .checked_sub(reader.position())
            .ok_or_else(|| Error::invalid_rdata("NSEC", "next name overruns RDATA"))?;
        Ok(Self {
            next_name,
            types: read_type_bitmap(reader.read_bytes(remaining)?)?,
        })
    }

    /// Writes the NSEC record.
    pub fn write(&self, writer: &mut WireWriter) {
        self.next_name.write(writer);
        write_type_bitmap(&self.types, writer);
    }
}

impl fmt::Display for NSEC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.next_name)?;
        fmt_types(f, &self.types)
    }
}

// =============================================================================
// NSEC3 / NSEC3PARAM
// =============================================================================

/// NSEC3 record - hashed denial of existence (RFC 5155 Section 3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NSEC3 {
    /// Hash algorithm (1 = SHA-1).
    pub hash_algorithm: u8,
    /// Flags; bit 0 is opt-out.
    pub flags: u8,
    /// Additional hash iterations.
    pub iterations: u16,
    /// Salt.
    pub salt: Vec<u8>,
    /// Next hashed owner name, raw.
    pub next_hashed_owner: Vec<u8>,
    /// Types present at the original owner name.
    pub types: Vec<Type>,
}

impl NSEC3 {
    /// Reads an NSEC3 record.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        let mut rdata = WireReader::new(reader.read_bytes(rdlength)?);
        let hash_algorithm = rdata.read_u8()?;
        let flags = rdata.read_u8()?;
        let iterations = rdata.read_u16()?;
        let salt = rdata.read_character_string()?.to_vec();
        let next_hashed_owner = rdata.read_character_string()?.to_vec();
        let types = read_type_bitmap(rdata.read_rest())?;
        Ok(Self {
            hash_algorithm,
            flags,
            iterations,
            salt,
            next_hashed_owner,
            types,
        })
    }

    /// Returns true if the opt-out flag is set.
    pub fn is_opt_out(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// Writes the NSEC3 record.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        writer.write_u8(self.hash_algorithm);
        writer.write_u8(self.flags);
        writer.write_u16(self.iterations);
        writer.write_character_string(&self.salt)?;
        writer.write_character_string(&self.next_hashed_owner)?;
        write_type_bitmap(&self.types, writer);
        Ok(())
    }
}

fn fmt_salt(salt: &[u8]) -> String {
    if salt.is_empty() {
        "-".to_string()
    } else {
        HEXUPPER.encode(salt)
    }
}

impl fmt::Display for NSEC3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            fmt_salt(&self.salt),
            BASE32HEX_NOPAD.encode(&self.next_hashed_owner)
        )?;
        fmt_types(f, &self.types)
    }
}

/// NSEC3PARAM record (RFC 5155 Section 4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NSEC3PARAM {
    /// Hash algorithm.
    pub hash_algorithm: u8,
    /// Flags.
    pub flags: u8,
    /// Additional hash iterations.
    pub iterations: u16,
    /// Salt.
    pub salt: Vec<u8>,
}

impl NSEC3PARAM {
    /// Reads an NSEC3PARAM record.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            hash_algorithm: reader.read_u8()?,
            flags: reader.read_u8()?,
            iterations: reader.read_u16()?,
            salt: reader.read_character_string()?.to_vec(),
        })
    }

    /// Writes the NSEC3PARAM record.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        writer.write_u8(self.hash_algorithm);
        writer.write_u8(self.flags);
        writer.write_u16(self.iterations);
        writer.write_character_string(&self.salt)
    }
}

impl fmt::Display for NSEC3PARAM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            fmt_salt(&self.salt)
        )
    }
}
