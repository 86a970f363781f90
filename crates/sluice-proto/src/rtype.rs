//! DNS record types.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record types seen in captured traffic.
///
/// Values outside this enum are still carried through [`Type::Unknown`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum RecordType {
    // =========================================================================
    // RFC 1035
    // =========================================================================
    /// IPv4 address
    A = 1,
    /// Authoritative name server
    NS = 2,
    /// Canonical name
    CNAME = 5,
    /// Start of authority
    SOA = 6,
    /// Null record
    NULL = 10,
    /// Domain name pointer
    PTR = 12,
    /// Host information
    HINFO = 13,
    /// Mail exchange
    MX = 15,
    /// Text strings
    TXT = 16,

    // =========================================================================
    // Later additions
    // =========================================================================
    /// IPv6 address - RFC 3596
    AAAA = 28,
    /// Location - RFC 1876
    LOC = 29,
    /// Server selection - RFC 2782
    SRV = 33,
    /// Naming authority pointer - RFC 3403
    NAPTR = 35,
    /// Delegation name - RFC 6672
    DNAME = 39,
    /// EDNS(0) pseudo-record - RFC 6891
    OPT = 41,
    /// SSH key fingerprint - RFC 4255
    SSHFP = 44,
    /// TLS certificate association - RFC 6698
    TLSA = 52,
    /// Service binding - RFC 9460
    SVCB = 64,
    /// HTTPS service binding - RFC 9460
    HTTPS = 65,
    /// Sender policy framework - RFC 7208
    SPF = 99,
    /// Uniform resource identifier - RFC 7553
    URI = 256,
    /// Certification authority authorization - RFC 8659
    CAA = 257,

    // =========================================================================
    // DNSSEC
    // =========================================================================
    /// Delegation signer - RFC 4034
    DS = 43,
    /// Signature - RFC 4034
    RRSIG = 46,
    /// Next secure - RFC 4034
    NSEC = 47,
    /// Public key - RFC 4034
    DNSKEY = 48,
    /// Next secure v3 - RFC 5155
    NSEC3 = 50,
    /// NSEC3 parameters - RFC 5155
    NSEC3PARAM = 51,
    /// Child DS - RFC 7344
    CDS = 59,
    /// Child DNSKEY - RFC 7344
    CDNSKEY = 60,

    // =========================================================================
    // Query types
    // =========================================================================
    /// Transaction key - RFC 2930
    TKEY = 249,
    /// Transaction signature - RFC 8945
    TSIG = 250,
    /// Incremental zone transfer - RFC 1995
    IXFR = 251,
    /// Full zone transfer - RFC 5936
    AXFR = 252,
    /// Any type
    ANY = 255,
}

impl RecordType {
    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Returns the type for a numeric value, if known.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns true for the zone transfer query types.
    #[inline]
    pub const fn is_zone_transfer(self) -> bool {
        matches!(self, Self::AXFR | Self::IXFR)
    }

    /// Returns true for DNSSEC record types.
    #[inline]
    pub const fn is_dnssec(self) -> bool {
        matches!(
            self,
            Self::DS
                | Self::RRSIG
                | Self::NSEC
                | Self::DNSKEY
                | Self::NSEC3
                | Self::NSEC3PARAM
                | Self::CDS
                | Self::CDNSKEY
        )
    }

    /// Returns the presentation mnemonic.
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::NULL => "NULL",
            Self::PTR => "PTR",
            Self::HINFO => "HINFO",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::AAAA => "AAAA",
            Self::LOC => "LOC",
            Self::SRV => "SRV",
            Self::NAPTR => "NAPTR",
            Self::DNAME => "DNAME",
            Self::OPT => "OPT",
            Self::SSHFP => "SSHFP",
            Self::TLSA => "TLSA",
            Self::SVCB => "SVCB",
            Self::HTTPS => "HTTPS",
            Self::SPF => "SPF",
            Self::URI => "URI",
            Self::CAA => "CAA",
            Self::DS => "DS",
            Self::RRSIG => "RRSIG",
            Self::NSEC => "NSEC",
            Self::DNSKEY => "DNSKEY",
            Self::NSEC3 => "NSEC3",
            Self::NSEC3PARAM => "NSEC3PARAM",
            Self::CDS => "CDS",
            Self::CDNSKEY => "CDNSKEY",
            Self::TKEY => "TKEY",
            Self::TSIG => "TSIG",
            Self::IXFR => "IXFR",
            Self::AXFR => "AXFR",
            Self::ANY => "ANY",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record type that may or may not be one this crate knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    /// A known record type.
    Known(RecordType),
    /// Any other value (TYPE#### per RFC 3597).
    Unknown(u16),
}

impl Type {
    /// Creates a type from a u16 value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordType::from_u16(value).map_or(Self::Unknown(value), Self::Known)
    }

    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Known(t) => t.to_u16(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the known type, if any.
    #[inline]
    pub const fn as_known(self) -> Option<RecordType> {
        match self {
            Self::Known(t) => Some(t),
            Self::Unknown(_) => None,
        }
    }

    /// Returns true for AXFR or IXFR.
    #[inline]
    pub const fn is_zone_transfer(self) -> bool {
        match self {
            Self::Known(t) => t.is_zone_transfer(),
            Self::Unknown(_) => false,
        }
    }
}

impl From<RecordType> for Type {
    fn from(t: RecordType) -> Self {
        Self::Known(t)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(t) => write!(f, "{t}"),
            Self::Unknown(v) => write!(f, "TYPE{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtype_values() {
        assert_eq!(RecordType::A.to_u16(), 1);
        assert_eq!(RecordType::OPT.to_u16(), 41);
        assert_eq!(RecordType::DNSKEY.to_u16(), 48);
        assert_eq!(RecordType::AXFR.to_u16(), 252);
        assert_eq!(RecordType::from_u16(28), Some(RecordType::AAAA));
        assert_eq!(RecordType::from_u16(65000), None);
    }

    #[test]
    fn test_generic_type() {
        let t = Type::from_u16(251);
        assert!(t.is_zone_transfer());
        assert_eq!(t.to_string(), "IXFR");

        let t = Type::from_u16(65534);
        assert_eq!(t.as_known(), None);
        assert_eq!(t.to_u16(), 65534);
        assert_eq!(t.to_string(), "TYPE65534");
        assert!(!t.is_zone_transfer());
    }
}
