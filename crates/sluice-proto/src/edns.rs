//! EDNS(0) support (RFC 6891).
//!
//! The OPT pseudo-RR is lifted out of the additional section into an
//! [`Edns`] value. Its CLASS carries the UDP payload size and its TTL the
//! extended RCODE, version and flags. RDATA is a sequence of
//! `(code, length, value)` options.

use crate::error::{Error, Result};
use crate::record::ResourceRecord;
use crate::rdata::RData;
use crate::rtype::RecordType;
use crate::wire::{WireReader, WireWriter};
use data_encoding::HEXLOWER;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// DNSSEC OK bit in the EDNS flags word.
pub const DNSSEC_OK: u16 = 0x8000;

/// UDP payload size advertised by the EDNS-ping extension.
const PING_UDP_SIZE: u16 = 1200;

/// Option length of an EDNS-ping value.
const PING_LENGTH: usize = 4;

/// EDNS option codes with a dedicated decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum EdnsOptionCode {
    /// Name Server Identifier (RFC 5001)
    Nsid = 3,
    /// DNSSEC Algorithm Understood (RFC 6975), or EDNS-ping
    Dau = 5,
    /// DS Hash Understood (RFC 6975)
    Dhu = 6,
    /// NSEC3 Hash Understood (RFC 6975)
    N3u = 7,
    /// Client Subnet (RFC 7871)
    ClientSubnet = 8,
    /// DNS Cookie (RFC 7873)
    Cookie = 10,
    /// Padding (RFC 7830)
    Padding = 12,
    /// Key Tag (RFC 8145)
    KeyTag = 14,
}

/// A decoded EDNS option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdnsOption {
    /// Name Server Identifier.
    Nsid(Vec<u8>),

    /// DNSSEC algorithms understood.
    Dau(Vec<u8>),

    /// DS hash algorithms understood.
    Dhu(Vec<u8>),

    /// NSEC3 hash algorithms understood.
    N3u(Vec<u8>),

    /// EDNS-ping value, sharing code 5 with DAU.
    Ping([u8; 4]),

    /// Client subnet information.
    ClientSubnet {
        /// Address family (1=IPv4, 2=IPv6).
        family: u16,
        /// Source prefix length.
        source_prefix: u8,
        /// Scope prefix length.
        scope_prefix: u8,
        /// Address, zero-padded to the family width. `None` for other families.
        address: Option<IpAddr>,
    },

    /// DNS Cookie.
    Cookie {
        /// Client cookie.
        client: [u8; 8],
        /// Server cookie, possibly empty.
        server: Vec<u8>,
    },

    /// Padding, by length.
    Padding(u16),

    /// Key tags for trust anchor signaling. Empty when the option length was odd.
    KeyTag(Vec<u16>),

    /// Any other option, or a known one too short to interpret.
    Unknown {
        /// Option code.
        code: u16,
        /// Option data.
        data: Vec<u8>,
    },
}

impl EdnsOption {
    /// Returns the option code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Nsid(_) => EdnsOptionCode::Nsid.into(),
            Self::Dau(_) | Self::Ping(_) => EdnsOptionCode::Dau.into(),
            Self::Dhu(_) => EdnsOptionCode::Dhu.into(),
            Self::N3u(_) => EdnsOptionCode::N3u.into(),
            Self::ClientSubnet { .. } => EdnsOptionCode::ClientSubnet.into(),
            Self::Cookie { .. } => EdnsOptionCode::Cookie.into(),
            Self::Padding(_) => EdnsOptionCode::Padding.into(),
            Self::KeyTag(_) => EdnsOptionCode::KeyTag.into(),
            Self::Unknown { code, .. } => *code,
        }
    }

    /// Reads one option from `reader`, which spans only the OPT RDATA.
    ///
    /// The cursor always ends exactly `4 + length` bytes further, whatever
    /// the option's content turned out to be.
    pub fn read(reader: &mut WireReader<'_>, udp_size: u16) -> Result<Self> {
        if reader.remaining() < 4 {
            return Err(Error::invalid_edns_option(
                0,
                format!("{} trailing bytes, option header needs 4", reader.remaining()),
            ));
        }
        let code = reader.read_u16()?;
        let length = usize::from(reader.read_u16()?);
        if length > reader.remaining() {
            return Err(Error::invalid_edns_option(
                code,
                format!("length {length} exceeds the {} bytes left", reader.remaining()),
            ));
        }

        let data = reader.read_bytes(length)?;
        let mut value = WireReader::new(data);

        let option = match EdnsOptionCode::try_from(code) {
            Ok(EdnsOptionCode::Nsid) => Self::Nsid(data.to_vec()),
            Ok(EdnsOptionCode::Dau) if udp_size == PING_UDP_SIZE && length == PING_LENGTH => {
                Self::Ping(value.read_array::<4>()?)
            }
            Ok(EdnsOptionCode::Dau) => Self::Dau(data.to_vec()),
            Ok(EdnsOptionCode::Dhu) => Self::Dhu(data.to_vec()),
            Ok(EdnsOptionCode::N3u) => Self::N3u(data.to_vec()),
            // Families other than IPv4 and IPv6 keep their raw bytes.
            Ok(EdnsOptionCode::ClientSubnet)
                if length >= 4 && matches!(data[..2], [0, 1] | [0, 2]) =>
            {
                let family = value.read_u16()?;
                let source_prefix = value.read_u8()?;
                let scope_prefix = value.read_u8()?;
                let addr_len = length - 4;
                let address = match family {
                    1 => {
                        let b = value.read_padded(4, addr_len)?;
                        Some(IpAddr::V4(Ipv4Addr::new(b[0], b[1], b[2], b[3])))
                    }
                    _ => {
                        let b = value.read_padded(16, addr_len)?;
                        let mut octets = [0u8; 16];
                        octets.copy_from_slice(&b);
                        Some(IpAddr::V6(Ipv6Addr::from(octets)))
                    }
                };
                Self::ClientSubnet {
                    family,
                    source_prefix,
                    scope_prefix,
                    address,
                }
            }
            Ok(EdnsOptionCode::Cookie) if length >= 8 => Self::Cookie {
                client: value.read_array::<8>()?,
                server: value.read_rest().to_vec(),
            },
            Ok(EdnsOptionCode::Padding) => Self::Padding(length as u16),
            Ok(EdnsOptionCode::KeyTag) => {
                let mut tags = Vec::new();
                if length % 2 == 0 {
                    while !value.is_empty() {
                        tags.push(value.read_u16()?);
                    }
                }
                Self::KeyTag(tags)
            }
            _ => Self::Unknown {
                code,
                data: data.to_vec(),
            },
        };
        Ok(option)
    }

    /// Writes the option with its code and length prefix.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        let mut value = WireWriter::new();
        match self {
            Self::Nsid(data) | Self::Dau(data) | Self::Dhu(data) | Self::N3u(data) => {
                value.write_bytes(data);
            }
            Self::Ping(ping) => value.write_bytes(ping),
            Self::ClientSubnet {
                family,
                source_prefix,
                scope_prefix,
                address,
            } => {
                value.write_u16(*family);
                value.write_u8(*source_prefix);
                value.write_u8(*scope_prefix);
                let octets: SmallVec<[u8; 16]> = match address {
                    Some(IpAddr::V4(a)) => SmallVec::from_slice(&a.octets()),
                    Some(IpAddr::V6(a)) => SmallVec::from_slice(&a.octets()),
                    None => SmallVec::new(),
                };
                // Only the octets covered by the source prefix go on the wire.
                let take = usize::from(*source_prefix).div_ceil(8).min(octets.len());
                value.write_bytes(&octets[..take]);
            }
            Self::Cookie { client, server } => {
                value.write_bytes(client);
                value.write_bytes(server);
            }
            Self::Padding(length) => value.write_bytes(&vec![0; usize::from(*length)]),
            Self::KeyTag(tags) => {
                for tag in tags {
                    value.write_u16(*tag);
                }
            }
            Self::Unknown { data, .. } => value.write_bytes(data),
        }

        let length = u16::try_from(value.len())
            .map_err(|_| Error::invalid_edns_option(self.code(), "option exceeds 65535 bytes"))?;
        writer.write_u16(self.code());
        writer.write_u16(length);
        writer.write_bytes(value.as_bytes());
        Ok(())
    }
}

impl fmt::Display for EdnsOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nsid(data) => write!(f, "NSID: {}", HEXLOWER.encode(data)),
            Self::Dau(algs) => write!(f, "DAU: {algs:?}"),
            Self::Dhu(algs) => write!(f, "DHU: {algs:?}"),
            Self::N3u(algs) => write!(f, "N3U: {algs:?}"),
            Self::Ping(ping) => write!(f, "PING: {}", HEXLOWER.encode(ping)),
            Self::ClientSubnet {
                family,
                source_prefix,
                scope_prefix,
                address,
            } => match address {
                Some(addr) => write!(f, "CLIENT-SUBNET: {addr}/{source_prefix}/{scope_prefix}"),
                None => write!(f, "CLIENT-SUBNET: family {family}/{source_prefix}/{scope_prefix}"),
            },
            Self::Cookie { client, server } => write!(
                f,
                "COOKIE: {}{}",
                HEXLOWER.encode(client),
                HEXLOWER.encode(server)
            ),
            Self::Padding(length) => write!(f, "PADDING: {length} bytes"),
            Self::KeyTag(tags) => write!(f, "KEY-TAG: {tags:?}"),
            Self::Unknown { code, data } => write!(f, "OPT{code}: {} bytes", data.len()),
        }
    }
}

/// EDNS(0) information from an OPT pseudo-RR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edns {
    /// Advertised UDP payload size.
    pub udp_size: u16,
    /// Upper 8 bits of the extended RCODE.
    pub extended_rcode: u8,
    /// EDNS version.
    pub version: u8,
    /// Flags word; bit 15 is DO.
    pub flags: u16,
    /// Options in wire order.
    pub options: Vec<EdnsOption>,
}

impl Default for Edns {
    fn default() -> Self {
        Self {
            udp_size: Self::DEFAULT_UDP_SIZE,
            extended_rcode: 0,
            version: 0,
            flags: 0,
            options: Vec::new(),
        }
    }
}

impl Edns {
    /// Default UDP payload size for EDNS.
    pub const DEFAULT_UDP_SIZE: u16 = 4096;

    /// Creates EDNS with the DO bit set.
    pub fn with_dnssec() -> Self {
        Self {
            flags: DNSSEC_OK,
            ..Self::default()
        }
    }

    /// Returns true if the DNSSEC OK bit is set.
    #[inline]
    pub fn dnssec_ok(&self) -> bool {
        self.flags & DNSSEC_OK != 0
    }

    /// Sets or clears the DO bit.
    pub fn set_dnssec_ok(&mut self, ok: bool) {
        if ok {
            self.flags |= DNSSEC_OK;
        } else {
            self.flags &= !DNSSEC_OK;
        }
    }

    /// Returns the TTL field carrying extended RCODE, version and flags.
    pub fn ttl(&self) -> u32 {
        u32::from(self.extended_rcode) << 24 | u32::from(self.version) << 16 | u32::from(self.flags)
    }

    /// Combines the header RCODE with the extended RCODE into 12 bits.
    pub fn full_rcode(&self, header_rcode: u8) -> u16 {
        u16::from(self.extended_rcode) << 4 | u16::from(header_rcode & 0x0F)
    }

    /// Returns the client subnet option, if present.
    pub fn client_subnet(&self) -> Option<&EdnsOption> {
        self.options
            .iter()
            .find(|o| matches!(o, EdnsOption::ClientSubnet { .. }))
    }

    /// Decodes EDNS from an OPT record's CLASS, TTL and RDATA.
    pub fn decode(class: u16, ttl: u32, rdata: &[u8]) -> Result<Self> {
        let udp_size = class;
        let mut reader = WireReader::new(rdata);
        let mut options = Vec::new();
        while !reader.is_empty() {
            options.push(EdnsOption::read(&mut reader, udp_size)?);
        }

        Ok(Self {
            udp_size,
            extended_rcode: (ttl >> 24) as u8,
            version: (ttl >> 16) as u8,
            flags: ttl as u16,
            options,
        })
    }

    /// Decodes EDNS from a parsed OPT record.
    ///
    /// OPT RDATA is never interpreted by the RDATA table, so it arrives as
    /// raw bytes.
    pub fn from_record(record: &ResourceRecord) -> Result<Self> {
        match &record.rdata {
            RData::Unknown(raw) => Self::decode(record.rclass.to_u16(), record.ttl, &raw.data),
            other => Err(Error::invalid_edns_option(
                0,
                format!("OPT record carries typed RDATA {other}"),
            )),
        }
    }

    /// Writes the OPT pseudo-RR: root owner, type 41, then options.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        let mut rdata = WireWriter::new();
        for option in &self.options {
            option.write(&mut rdata)?;
        }
        let rdlength = u16::try_from(rdata.len())
            .map_err(|_| Error::invalid_edns_option(0, "OPT RDATA exceeds 65535 bytes"))?;

        writer.write_u8(0);
        writer.write_u16(RecordType::OPT.to_u16());
        writer.write_u16(self.udp_size);
        writer.write_u32(self.ttl());
        writer.write_u16(rdlength);
        writer.write_bytes(rdata.as_bytes());
        Ok(())
    }
}

impl fmt::Display for Edns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "; EDNS: version: {}, flags:{}; udp: {}",
            self.version,
            if self.dnssec_ok() { " do" } else { "" },
            self.udp_size
        )?;
        for option in &self.options {
            write!(f, "\n; {option}")?;
        }
        Ok(())
    }
}
