//! DNS message decoding and encoding.
//!
//! Decoding walks the sections in wire order:
//!
//! ```text
//! Header -> Question[qdcount] -> Answer[ancount] -> Authority[nscount] -> Additional[arcount]
//! ```
//!
//! A failure at any step stops the walk. In [`DecodeMode::Strict`] the
//! caller gets a [`DecodeFailure`] holding the partially built message; in
//! [`DecodeMode::Lenient`] the partial message is returned as a success with
//! [`Message::partial`] set.

use crate::edns::Edns;
use crate::error::{Error, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::name::Name;
use crate::question::Question;
use crate::record::{self, RRset, ResourceRecord};
use crate::rtype::{RecordType, Type};
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How decode errors are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Any error fails the decode.
    #[default]
    Strict,
    /// Errors truncate the message, which is still returned.
    Lenient,
}

/// Message section where decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// The 12-byte header.
    Header,
    /// The question section.
    Question,
    /// The answer section.
    Answer,
    /// The authority section.
    Authority,
    /// The additional section.
    Additional,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Authority => "authority",
            Self::Additional => "additional",
        })
    }
}

/// A strict-mode decode failure, carrying what was decoded before it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{section} section: {error}")]
pub struct DecodeFailure {
    /// Everything decoded before the error.
    pub partial: Box<Message>,
    /// The section being decoded.
    pub section: Section,
    /// The underlying error.
    #[source]
    pub error: Error,
}

impl DecodeFailure {
    /// Drops the partial message, keeping the error.
    pub fn into_error(self) -> Error {
        self.error
    }
}

/// A complete DNS message.
///
/// Records are grouped into RRsets per section. The OPT pseudo-RR is not
/// kept in the additional section; it is decoded into [`Message::edns`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The message header, as read from the wire.
    pub header: Header,
    /// The question section.
    pub questions: Vec<Question>,
    /// The answer section.
    pub answer: Vec<RRset>,
    /// The authority section.
    pub authority: Vec<RRset>,
    /// The additional section, without OPT.
    pub additional: Vec<RRset>,
    /// EDNS(0) information from the OPT pseudo-RR.
    pub edns: Option<Edns>,
    /// Size of the message on the wire.
    pub wire_size: usize,
    /// True if decoding stopped early in lenient mode.
    pub partial: bool,
}

impl Message {
    /// Creates an empty message with the given header.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    /// Creates a query for a single question.
    pub fn query(id: u16, question: Question) -> Self {
        let mut msg = Self::new(Header::query(id));
        msg.questions.push(question);
        msg
    }

    /// Returns the message ID.
    #[inline]
    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Returns true if the QR bit is clear.
    #[inline]
    pub fn is_query(&self) -> bool {
        self.header.is_query()
    }

    /// Returns true if the QR bit is set.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.header.is_response()
    }

    /// Returns the first question, if any.
    pub fn question(&self) -> Option<&Question> {
        self.questions.first()
    }

    /// Returns the first question's name, if any.
    pub fn qname(&self) -> Option<&Name> {
        self.question().map(|q| &q.qname)
    }

    /// Returns the first question's type, if any.
    pub fn qtype(&self) -> Option<Type> {
        self.question().map(|q| q.qtype)
    }

    /// Returns true if the first question asks for AXFR or IXFR.
    pub fn is_zone_transfer(&self) -> bool {
        self.qtype().is_some_and(|t| t.is_zone_transfer())
    }

    /// Returns true if the DO bit is set in EDNS.
    pub fn dnssec_ok(&self) -> bool {
        self.edns.as_ref().is_some_and(Edns::dnssec_ok)
    }

    /// Iterates over every answer record.
    pub fn answer_records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.answer.iter().flat_map(|set| set.records().iter())
    }

    /// Adds a record to the answer section.
    pub fn add_answer(&mut self, record: ResourceRecord) {
        record::insert_into(&mut self.answer, record);
    }

    /// Adds a record to the authority section.
    pub fn add_authority(&mut self, record: ResourceRecord) {
        record::insert_into(&mut self.authority, record);
    }

    /// Adds a record to the additional section.
    pub fn add_additional(&mut self, record: ResourceRecord) {
        record::insert_into(&mut self.additional, record);
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decodes a message in strict mode.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::decode(data, DecodeMode::Strict).map_err(DecodeFailure::into_error)
    }

    /// Decodes a message.
    ///
    /// In lenient mode this never fails: whatever was decoded before the
    /// first error is returned with `partial` set.
    pub fn decode(data: &[u8], mode: DecodeMode) -> std::result::Result<Self, DecodeFailure> {
        let mut msg = Self {
            wire_size: data.len(),
            ..Self::default()
        };

        match msg.decode_sections(data) {
            Ok(()) => Ok(msg),
            Err((section, error)) => match mode {
                DecodeMode::Strict => Err(DecodeFailure {
                    partial: Box::new(msg),
                    section,
                    error,
                }),
                DecodeMode::Lenient => {
                    msg.partial = true;
                    Ok(msg)
                }
            },
        }
    }

    fn decode_sections(&mut self, data: &[u8]) -> std::result::Result<(), (Section, Error)> {
        let mut reader = WireReader::new(data);

        self.header = Header::read(&mut reader).map_err(|e| (Section::Header, e))?;

        for _ in 0..self.header.qd_count {
            let question = Question::read(&mut reader).map_err(|e| (Section::Question, e))?;
            self.questions.push(question);
        }

        for _ in 0..self.header.an_count {
            let rr = ResourceRecord::read(&mut reader).map_err(|e| (Section::Answer, e))?;
            record::insert_into(&mut self.answer, rr);
        }

        for _ in 0..self.header.ns_count {
            let rr = ResourceRecord::read(&mut reader).map_err(|e| (Section::Authority, e))?;
            record::insert_into(&mut self.authority, rr);
        }

        for _ in 0..self.header.ar_count {
            let rr = ResourceRecord::read(&mut reader).map_err(|e| (Section::Additional, e))?;
            if rr.rtype.as_known() == Some(RecordType::OPT) {
                if self.edns.is_some() {
                    return Err((Section::Additional, Error::MultipleOptRecords));
                }
                let edns = Edns::from_record(&rr).map_err(|e| (Section::Additional, e))?;
                self.edns = Some(edns);
            } else {
                record::insert_into(&mut self.additional, rr);
            }
        }

        Ok(())
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Writes the message. Section counts are recomputed and names are not
    /// compressed.
    pub fn write(&self, writer: &mut WireWriter) -> Result<()> {
        let count = |sets: &[RRset]| -> Result<u16> {
            let n: usize = sets.iter().map(RRset::len).sum();
            u16::try_from(n)
                .map_err(|_| Error::invalid_rdata("message", "section exceeds 65535 records"))
        };

        let mut header = self.header;
        header.qd_count = u16::try_from(self.questions.len())
            .map_err(|_| Error::invalid_rdata("message", "too many questions"))?;
        header.an_count = count(&self.answer)?;
        header.ns_count = count(&self.authority)?;
        header.ar_count = count(&self.additional)? + u16::from(self.edns.is_some());
        header.write(writer);

        for question in &self.questions {
            question.write(writer);
        }
        for set in self.answer.iter().chain(&self.authority).chain(&self.additional) {
            for rr in set.records() {
                rr.write(writer)?;
            }
        }
        if let Some(edns) = &self.edns {
            edns.write(writer)?;
        }
        Ok(())
    }

    /// Encodes the message into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = WireWriter::with_capacity(HEADER_SIZE + 64);
        self.write(&mut writer)?;
        Ok(writer.as_bytes().to_vec())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        if let Some(edns) = &self.edns {
            writeln!(f, "\n;; OPT PSEUDOSECTION:\n{edns}")?;
        }
        writeln!(f, "\n;; QUESTION SECTION:")?;
        for q in &self.questions {
            writeln!(f, ";{q}")?;
        }
        for (title, sets) in [
            ("ANSWER", &self.answer),
            ("AUTHORITY", &self.authority),
            ("ADDITIONAL", &self.additional),
        ] {
            if sets.is_empty() {
                continue;
            }
            writeln!(f, "\n;; {title} SECTION:")?;
            for rr in sets.iter().flat_map(|s| s.records()) {
                writeln!(f, "{rr}")?;
            }
        }
        Ok(())
    }
}
