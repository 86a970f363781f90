//! DNS resource records and RRsets.

use crate::class::Class;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::rdata::RData;
use crate::rtype::Type;
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS resource record.
///
/// # Wire Format
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                      NAME                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TYPE                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     CLASS                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TTL                      |
/// |                                               |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                   RDLENGTH                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                     RDATA                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Owner name.
    pub name: Name,
    /// Record type.
    pub rtype: Type,
    /// Record class. For OPT this is the UDP payload size.
    pub rclass: Class,
    /// Time to live. For OPT this carries extended rcode, version and flags.
    pub ttl: u32,
    /// Typed record data.
    pub rdata: RData,
}

impl ResourceRecord {
    /// Creates a new resource record.
    pub fn new(name: Name, rtype: impl Into<Type>, rclass: impl Into<Class>, ttl: u32, rdata: RData) -> Self {
        Self {
            name,
            rtype: rtype.into(),
            rclass: rclass.into(),
            ttl,
            rdata,
        }
    }

    /// Reads a record at the cursor.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        let name = Name::read(reader)?;
        let rtype = Type::from_u16(reader.read_u16()?);
        let rclass = Class::from_u16(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let rdlength = usize::from(reader.read_u16()?);
        let rdata = RData::read(rtype, reader, rdlength)?;
        Ok(Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        })
    }

    /// Writes the record, computing RDLENGTH from the encoded RDATA.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        let mut rdata = WireWriter::new();
        self.rdata.write(&mut rdata)?;
        let rdlength = u16::try_from(rdata.len())
            .map_err(|_| Error::invalid_rdata(self.rtype.to_string(), "RDATA exceeds 65535 bytes"))?;

        self.name.write(writer);
        writer.write_u16(self.rtype.to_u16());
        writer.write_u16(self.rclass.to_u16());
        writer.write_u32(self.ttl);
        writer.write_u16(rdlength);
        writer.write_bytes(rdata.as_bytes());
        Ok(())
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.rclass, self.rtype, self.rdata
        )
    }
}

/// A set of records sharing owner name, class and type.
///
/// Membership is enforced: [`RRset::add`] rejects a record whose owner
/// (compared case-insensitively), class or type differs from the set's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RRset {
    name: Name,
    rtype: Type,
    rclass: Class,
    records: Vec<ResourceRecord>,
}

impl RRset {
    /// Creates an empty set.
    pub fn new(name: Name, rtype: impl Into<Type>, rclass: impl Into<Class>) -> Self {
        Self {
            name,
            rtype: rtype.into(),
            rclass: rclass.into(),
            records: Vec::new(),
        }
    }

    /// Creates a set holding a single record.
    pub fn from_record(record: ResourceRecord) -> Self {
        Self {
            name: record.name.clone(),
            rtype: record.rtype,
            rclass: record.rclass,
            records: vec![record],
        }
    }

    /// Returns true if `record` belongs in this set.
    pub fn accepts(&self, record: &ResourceRecord) -> bool {
        record.rtype == self.rtype && record.rclass == self.rclass && record.name == self.name
    }

    /// Adds a record to the set.
    pub fn add(&mut self, record: ResourceRecord) -> Result<()> {
        if !self.accepts(&record) {
            return Err(Error::RRsetMismatch {
                name: record.name.to_string(),
                rtype: record.rtype.to_string(),
                set_name: self.name.to_string(),
                set_type: self.rtype.to_string(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Owner name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Record type.
    pub fn rtype(&self) -> Type {
        self.rtype
    }

    /// Record class.
    pub fn rclass(&self) -> Class {
        self.rclass
    }

    /// The records, in the order they were added.
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the set has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lowest TTL in the set.
    pub fn min_ttl(&self) -> Option<u32> {
        self.records.iter().map(|r| r.ttl).min()
    }
}

/// Adds `record` to the matching set in `sets`, or starts a new set.
pub(crate) fn insert_into(sets: &mut Vec<RRset>, record: ResourceRecord) {
    match sets.iter_mut().find(|set| set.accepts(&record)) {
        Some(set) => set.records.push(record),
        None => sets.push(RRset::from_record(record)),
    }
}
