//! DNS record data (RDATA) types.
//!
//! Decoding is a single match on the record type. Every arm reads from the
//! shared message cursor so that embedded names can follow compression
//! pointers anywhere earlier in the message; any type without an arm is kept
//! as [`Unknown`] raw bytes.
//!
//! - **Address records**: A, AAAA
//! - **Name records**: NS, CNAME, PTR, DNAME, MX
//! - **Authority records**: SOA
//! - **Text records**: TXT, HINFO
//! - **Service records**: SRV, NAPTR, URI, CAA
//! - **Fingerprint records**: SSHFP, TLSA
//! - **Location records**: LOC
//! - **DNSSEC records**: DNSKEY, CDNSKEY, DS, CDS, RRSIG, NSEC, NSEC3, NSEC3PARAM

pub mod address;
pub mod authority;
pub mod cert;
pub mod dnssec;
pub mod location;
pub mod name;
pub mod service;
pub mod text;
pub mod unknown;

pub use address::{A, AAAA};
pub use authority::SOA;
pub use cert::{SSHFP, TLSA};
pub use dnssec::{DigestType, DnsSecAlgorithm, DNSKEY, DS, NSEC, NSEC3, NSEC3PARAM, RRSIG};
pub use location::LOC;
pub use name::{CNAME, DNAME, MX, NS, PTR};
pub use service::{CAA, NAPTR, SRV, URI};
pub use text::{HINFO, TXT};
pub use unknown::Unknown;

use crate::error::{Error, Result};
use crate::rtype::{RecordType, Type};
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RData {
    // =========================================================================
    // Address Records
    // =========================================================================
    /// IPv4 address
    A(A),
    /// IPv6 address
    AAAA(AAAA),

    // =========================================================================
    // Name Records
    // =========================================================================
    /// Name server
    NS(NS),
    /// Canonical name
    CNAME(CNAME),
    /// Pointer
    PTR(PTR),
    /// Delegation name
    DNAME(DNAME),
    /// Mail exchange
    MX(MX),

    // =========================================================================
    // Authority and Text Records
    // =========================================================================
    /// Start of authority
    SOA(SOA),
    /// Text
    TXT(TXT),
    /// Host information
    HINFO(HINFO),

    // =========================================================================
    // Service Records
    // =========================================================================
    /// Service location
    SRV(SRV),
    /// Naming authority pointer
    NAPTR(NAPTR),
    /// Uniform resource identifier
    URI(URI),
    /// Certification authority authorization
    CAA(CAA),
    /// SSH key fingerprint
    SSHFP(SSHFP),
    /// TLS certificate association
    TLSA(TLSA),
    /// Location
    LOC(LOC),

    // =========================================================================
    // DNSSEC Records
    // =========================================================================
    /// DNS public key
    DNSKEY(DNSKEY),
    /// Child copy of a DNSKEY
    CDNSKEY(DNSKEY),
    /// Delegation signer
    DS(DS),
    /// Child copy of a DS
    CDS(DS),
    /// Signature
    RRSIG(RRSIG),
    /// Next secure
    NSEC(NSEC),
    /// Next secure v3
    NSEC3(NSEC3),
    /// NSEC3 parameters
    NSEC3PARAM(NSEC3PARAM),

    // =========================================================================
    // Other
    // =========================================================================
    /// Any other type, kept as raw bytes
    Unknown(Unknown),
}

impl RData {
    /// Reads RDATA of `rtype` at the cursor.
    ///
    /// The cursor must sit at the first RDATA byte and see the whole message,
    /// so compressed names resolve. On success the cursor is exactly
    /// `rdlength` bytes further: short parses skip the leftover bytes, and a
    /// parse that overran RDLENGTH is an error.
    pub fn read(rtype: Type, reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        let start = reader.position();
        if reader.remaining() < rdlength {
            return Err(Error::buffer_underrun(start, rdlength, reader.remaining()));
        }

        let rdata = match rtype.as_known() {
            Some(RecordType::A) => Self::A(A::read(reader, rdlength)?),
            Some(RecordType::AAAA) => Self::AAAA(AAAA::read(reader, rdlength)?),
            Some(RecordType::NS) => Self::NS(NS::read(reader)?),
            Some(RecordType::CNAME) => Self::CNAME(CNAME::read(reader)?),
            Some(RecordType::PTR) => Self::PTR(PTR::read(reader)?),
            Some(RecordType::DNAME) => Self::DNAME(DNAME::read(reader)?),
            Some(RecordType::MX) => Self::MX(MX::read(reader)?),
            Some(RecordType::SOA) => Self::SOA(SOA::read(reader)?),
            Some(RecordType::TXT | RecordType::SPF) => Self::TXT(TXT::read(reader, rdlength)?),
            Some(RecordType::HINFO) => Self::HINFO(HINFO::read(reader)?),
            Some(RecordType::SRV) => Self::SRV(SRV::read(reader)?),
            Some(RecordType::NAPTR) => Self::NAPTR(NAPTR::read(reader)?),
            Some(RecordType::URI) => Self::URI(URI::read(reader, rdlength)?),
            Some(RecordType::CAA) => Self::CAA(CAA::read(reader, rdlength)?),
            Some(RecordType::SSHFP) => Self::SSHFP(SSHFP::read(reader, rdlength)?),
            Some(RecordType::TLSA) => Self::TLSA(TLSA::read(reader, rdlength)?),
            Some(RecordType::LOC) => Self::LOC(LOC::read(reader, rdlength)?),
            Some(RecordType::DNSKEY) => Self::DNSKEY(DNSKEY::read(reader, rdlength)?),
            Some(RecordType::CDNSKEY) => Self::CDNSKEY(DNSKEY::read(reader, rdlength)?),
            Some(RecordType::DS) => Self::DS(DS::read(reader, rdlength)?),
            Some(RecordType::CDS) => Self::CDS(DS::read(reader, rdlength)?),
            Some(RecordType::RRSIG) => Self::RRSIG(RRSIG::read(reader, rdlength)?),
            Some(RecordType::NSEC) => Self::NSEC(NSEC::read(reader, rdlength)?),
            Some(RecordType::NSEC3) => Self::NSEC3(NSEC3::read(reader, rdlength)?),
            Some(RecordType::NSEC3PARAM) => Self::NSEC3PARAM(NSEC3PARAM::read(reader)?),
            _ => Self::Unknown(Unknown::read(reader, rtype.to_u16(), rdlength)?),
        };

        let consumed = reader.position() - start;
        if consumed > rdlength {
            return Err(Error::RDataLengthMismatch {
                rtype: rtype.to_string(),
                declared: rdlength,
                consumed,
            });
        }
        reader.set_position(start + rdlength)?;
        Ok(rdata)
    }

    /// Writes the RDATA, without the RDLENGTH prefix.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        match self {
            Self::A(r) => r.write(writer),
            Self::AAAA(r) => r.write(writer),
            Self::NS(r) => r.write(writer),
            Self::CNAME(r) => r.write(writer),
            Self::PTR(r) => r.write(writer),
            Self::DNAME(r) => r.write(writer),
            Self::MX(r) => r.write(writer),
            Self::SOA(r) => r.write(writer),
            Self::TXT(r) => r.write(writer)?,
            Self::HINFO(r) => r.write(writer)?,
            Self::SRV(r) => r.write(writer),
            Self::NAPTR(r) => r.write(writer)?,
            Self::URI(r) => r.write(writer),
            Self::CAA(r) => r.write(writer)?,
            Self::SSHFP(r) => r.write(writer),
            Self::TLSA(r) => r.write(writer),
            Self::LOC(r) => r.write(writer),
            Self::DNSKEY(r) | Self::CDNSKEY(r) => r.write(writer),
            Self::DS(r) | Self::CDS(r) => r.write(writer),
            Self::RRSIG(r) => r.write(writer),
            Self::NSEC(r) => r.write(writer),
            Self::NSEC3(r) => r.write(writer)?,
            Self::NSEC3PARAM(r) => r.write(writer)?,
            Self::Unknown(r) => r.write(writer),
        }
        Ok(())
    }

    /// Returns true if this RDATA fell back to raw bytes.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(r) => write!(f, "{r}"),
            Self::AAAA(r) => write!(f, "{r}"),
            Self::NS(r) => write!(f, "{r}"),
            Self::CNAME(r) => write!(f, "{r}"),
            Self::PTR(r) => write!(f, "{r}"),
            Self::DNAME(r) => write!(f, "{r}"),
            Self::MX(r) => write!(f, "{r}"),
            Self::SOA(r) => write!(f, "{r}"),
            Self::TXT(r) => write!(f, "{r}"),
            Self::HINFO(r) => write!(f, "{r}"),
            Self::SRV(r) => write!(f, "{r}"),
            Self::NAPTR(r) => write!(f, "{r}"),
            Self::URI(r) => write!(f, "{r}"),
            Self::CAA(r) => write!(f, "{r}"),
            Self::SSHFP(r) => write!(f, "{r}"),
            Self::TLSA(r) => write!(f, "{r}"),
            Self::LOC(r) => write!(f, "{r}"),
            Self::DNSKEY(r) | Self::CDNSKEY(r) => write!(f, "{r}"),
            Self::DS(r) | Self::CDS(r) => write!(f, "{r}"),
            Self::RRSIG(r) => write!(f, "{r}"),
            Self::NSEC(r) => write!(f, "{r}"),
            Self::NSEC3(r) => write!(f, "{r}"),
            Self::NSEC3PARAM(r) => write!(f, "{r}"),
            Self::Unknown(r) => write!(f, "{r}"),
        }
    }
}
