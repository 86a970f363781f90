//! DNS question section entries.

use crate::class::Class;
use crate::error::Result;
use crate::name::Name;
use crate::rtype::Type;
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A question: the name, type and class being asked about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    /// Queried name.
    pub qname: Name,
    /// Queried type.
    pub qtype: Type,
    /// Queried class.
    pub qclass: Class,
}

impl Question {
    /// Creates a new question.
    pub fn new(qname: Name, qtype: impl Into<Type>, qclass: impl Into<Class>) -> Self {
        Self {
            qname,
            qtype: qtype.into(),
            qclass: qclass.into(),
        }
    }

    /// Reads a question from the cursor.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        let qname = Name::read(reader)?;
        let qtype = Type::from_u16(reader.read_u16()?);
        let qclass = Class::from_u16(reader.read_u16()?);
        Ok(Self {
            qname,
            qtype,
            qclass,
        })
    }

    /// Writes the question.
    pub fn write(&self, writer: &mut WireWriter) {
        self.qname.write(writer);
        writer.write_u16(self.qtype.to_u16());
        writer.write_u16(self.qclass.to_u16());
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ";{}\t\t{}\t{}", self.qname, self.qclass, self.qtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RecordClass, RecordType};
    use std::str::FromStr;

    #[test]
    fn test_question_read() {
        let data = [
            3, b'w', b'w', b'w', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 2, b'n', b'l', 0, 0,
            1, 0, 1,
        ];
        let mut reader = WireReader::new(&data);
        let question = Question::read(&mut reader).unwrap();

        assert_eq!(question.qname, Name::from_str("www.example.nl").unwrap());
        assert_eq!(question.qtype, Type::Known(RecordType::A));
        assert_eq!(question.qclass, Class::Known(RecordClass::IN));
        assert!(reader.is_empty());

        let mut writer = WireWriter::new();
        question.write(&mut writer);
        assert_eq!(writer.as_bytes(), &data);
    }

    #[test]
    fn test_question_truncated() {
        let data = [0, 0, 1, 0];
        assert!(Question::read(&mut WireReader::new(&data)).is_err());
    }
}
