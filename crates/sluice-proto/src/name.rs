//! DNS domain names.
//!
//! Names are decoded from captured messages, so the reader has to survive
//! anything: reserved label types, forward or looping compression pointers,
//! and names that never terminate. All of these are reported as errors and
//! never loop or read out of bounds.

use crate::error::{Error, Result};
use crate::wire::{WireReader, WireWriter};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH, MAX_POINTER_HOPS};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A DNS domain name.
///
/// # Wire Format
///
/// A name is a sequence of length-prefixed labels closed by a zero octet.
/// `www.example.nl.` is encoded as:
///
/// ```text
/// 03 'w' 'w' 'w' 07 'e' 'x' 'a' 'm' 'p' 'l' 'e' 02 'n' 'l' 00
/// ```
///
/// The two high bits of each length octet select the label type:
///
/// ```text
/// 00xxxxxx  literal label, low six bits are the length
/// 11xxxxxx  compression pointer, low six bits + next octet = message offset
/// 01xxxxxx  reserved (extended label), rejected
/// 10xxxxxx  reserved, rejected
/// ```
///
/// The stored form is always uncompressed and keeps the original case.
/// Equality and hashing are ASCII case-insensitive.
#[derive(Clone, Default)]
pub struct Name {
    /// Length-prefixed labels, without the closing root octet.
    wire: SmallVec<[u8; 64]>,
    /// Number of labels, not counting the root.
    label_count: u8,
}

impl Name {
    /// Creates the root name `.`.
    #[inline]
    pub const fn root() -> Self {
        Self {
            wire: SmallVec::new_const(),
            label_count: 0,
        }
    }

    /// Returns true if this is the root name.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.label_count == 0
    }

    /// Returns the number of labels, not counting the root.
    #[inline]
    pub fn label_count(&self) -> usize {
        usize::from(self.label_count)
    }

    /// Returns the uncompressed wire length, including the root octet.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire.len() + 1
    }

    /// Iterates over the raw label bytes, leftmost first.
    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        let mut pos = 0;
        std::iter::from_fn(move || {
            let len = usize::from(*self.wire.get(pos)?);
            let label = &self.wire[pos + 1..pos + 1 + len];
            pos += len + 1;
            Some(label)
        })
    }

    /// Returns a copy with every ASCII letter lowercased.
    pub fn lowercased(&self) -> Self {
        let mut name = self.clone();
        name.wire.make_ascii_lowercase();
        name
    }

    fn push_label(&mut self, label: &[u8]) -> Result<()> {
        if label.len() > MAX_LABEL_LENGTH {
            return Err(Error::LabelTooLong {
                length: label.len(),
            });
        }
        let length = self.wire.len() + 1 + label.len() + 1;
        if length > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length });
        }
        // label length fits in six bits after the check above
        self.wire.push(label.len() as u8);
        self.wire.extend_from_slice(label);
        self.label_count += 1;
        Ok(())
    }

    /// Reads a possibly compressed name at the cursor position.
    ///
    /// Compression pointers may only jump strictly backwards, and at most
    /// [`MAX_POINTER_HOPS`] pointers are followed per name. When a pointer
    /// was followed the cursor ends up just after the first pointer;
    /// otherwise it ends up after the closing root octet.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self> {
        let mut name = Self::root();
        let mut resume_at = None;
        let mut hops = 0;

        loop {
            let offset = reader.position();
            let len = reader.read_u8()?;

            match len >> 6 {
                0b00 => {
                    if len == 0 {
                        break;
                    }
                    let label = reader.read_bytes(usize::from(len))?;
                    name.push_label(label)?;
                }
                0b11 => {
                    let low = reader.read_u8()?;
                    let target = (usize::from(len & 0x3F) << 8) | usize::from(low);
                    hops += 1;
                    if target >= offset || hops > MAX_POINTER_HOPS {
                        return Err(Error::illegal_pointer(offset, target, hops));
                    }
                    if resume_at.is_none() {
                        resume_at = Some(reader.position());
                    }
                    reader.set_position(target)?;
                }
                label_type => {
                    return Err(Error::UnsupportedLabelType { offset, label_type });
                }
            }
        }

        if let Some(pos) = resume_at {
            reader.set_position(pos)?;
        }
        Ok(name)
    }

    /// Writes the name uncompressed.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.wire);
        writer.write_u8(0);
    }

    fn lowercase_hash<H: Hasher>(&self, state: &mut H) {
        for byte in &self.wire {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a dotted name. The trailing dot is optional and `.` or the
    /// empty string is the root.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        let mut name = Self::root();
        if trimmed.is_empty() {
            return Ok(name);
        }
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(Error::invalid_name(s, "empty label"));
            }
            if !label.is_ascii() {
                return Err(Error::invalid_name(s, "non-ASCII label"));
            }
            name.push_label(label.as_bytes())?;
        }
        Ok(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels() {
            for &byte in label {
                match byte {
                    b'.' | b'\\' => write!(f, "\\{}", byte as char)?,
                    0x21..=0x7E => write!(f, "{}", byte as char)?,
                    _ => write!(f, "\\{byte:03}")?,
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.label_count == other.label_count && self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lowercase_hash(state);
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_at(message: &[u8], offset: usize) -> (Result<Name>, usize) {
        let mut reader = WireReader::new(message);
        reader.set_position(offset).unwrap();
        let name = Name::read(&mut reader);
        (name, reader.position())
    }

    #[test]
    fn test_root_name() {
        let (name, pos) = read_at(&[0], 0);
        let name = name.unwrap();
        assert!(name.is_root());
        assert_eq!(name.to_string(), ".");
        assert_eq!(pos, 1);
        assert_eq!(Name::from_str(".").unwrap(), name);
    }

    #[test]
    fn test_uncompressed_name() {
        let message = [
            3, b'w', b'w', b'w', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 2, b'n', b'l', 0,
        ];
        let (name, pos) = read_at(&message, 0);
        let name = name.unwrap();
        assert_eq!(name.to_string(), "www.example.nl.");
        assert_eq!(name.label_count(), 3);
        assert_eq!(name.wire_len(), 16);
        assert_eq!(pos, 16);
    }

    #[test]
    fn test_compressed_name() {
        // example.nl at 0, then "www" + pointer to 0 at 12
        let mut message = vec![7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 2, b'n', b'l', 0];
        message.extend_from_slice(&[3, b'w', b'w', b'w', 0xC0, 0x00, 0xAA]);

        let (name, pos) = read_at(&message, 12);
        assert_eq!(name.unwrap().to_string(), "www.example.nl.");
        // resumes right after the pointer, not after the target
        assert_eq!(pos, 18);
    }

    #[test]
    fn test_pointer_chain_resumes_after_first_pointer() {
        // 0: "nl", 4: "example" -> 0, 14: "www" -> 4, 20: pointer -> 14
        let mut message = vec![2, b'n', b'l', 0];
        message.extend_from_slice(&[7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0xC0, 0x00]);
        message.extend_from_slice(&[3, b'w', b'w', b'w', 0xC0, 0x04]);
        message.extend_from_slice(&[0xC0, 0x0E, 0x01, 0x02]);

        let (name, pos) = read_at(&message, 20);
        assert_eq!(name.unwrap().to_string(), "www.example.nl.");
        assert_eq!(pos, 22);
    }

    #[test]
    fn test_forward_pointer_rejected() {
        let message = [0xC0, 0x02, 0];
        let (name, _) = read_at(&message, 0);
        assert!(matches!(
            name.unwrap_err(),
            Error::IllegalPointerChain { target: 2, .. }
        ));
    }

    #[test]
    fn test_self_pointer_rejected() {
        let message = [0, 0, 0xC0, 0x02];
        let (name, _) = read_at(&message, 2);
        assert!(matches!(
            name.unwrap_err(),
            Error::IllegalPointerChain { offset: 2, target: 2, .. }
        ));
    }

    #[test]
    fn test_pointer_hop_cap() {
        // a ladder of backward pointers, each pointing at the previous one
        let mut message = vec![0];
        for i in 0..(MAX_POINTER_HOPS + 1) {
            let target = if i == 0 { 0 } else { 1 + (i - 1) * 2 };
            message.extend_from_slice(&[0xC0, target as u8]);
        }
        let start = message.len() - 2;
        let (name, _) = read_at(&message, start);
        assert!(matches!(
            name.unwrap_err(),
            Error::IllegalPointerChain { hops, .. } if hops == MAX_POINTER_HOPS + 1
        ));

        // one rung fewer stays within the cap
        let (name, _) = read_at(&message, start - 2);
        assert!(name.unwrap().is_root());
    }

    #[test]
    fn test_unsupported_label_type() {
        let (name, _) = read_at(&[0x41, b'a', 0], 0);
        assert_eq!(
            name.unwrap_err(),
            Error::UnsupportedLabelType {
                offset: 0,
                label_type: 0b01
            }
        );
        let (name, _) = read_at(&[0x80, 0], 0);
        assert!(matches!(
            name.unwrap_err(),
            Error::UnsupportedLabelType { label_type: 0b10, .. }
        ));
    }

    #[test]
    fn test_truncated_name() {
        let (name, _) = read_at(&[5, b'a', b'b'], 0);
        assert!(matches!(name.unwrap_err(), Error::BufferUnderrun { .. }));
        let (name, _) = read_at(&[1, b'a'], 0);
        assert!(matches!(name.unwrap_err(), Error::BufferUnderrun { .. }));
    }

    #[test]
    fn test_name_too_long() {
        let mut message = Vec::new();
        for _ in 0..5 {
            message.push(63);
            message.extend_from_slice(&[b'a'; 63]);
        }
        message.push(0);
        let (name, _) = read_at(&message, 0);
        assert!(matches!(name.unwrap_err(), Error::NameTooLong { .. }));
    }

    #[test]
    fn test_case_insensitive_comparison() {
        let a = Name::from_str("WWW.Example.NL").unwrap();
        let b = Name::from_str("www.example.nl.").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "WWW.Example.NL.");
        assert_eq!(a.lowercased().to_string(), "www.example.nl.");

        use std::collections::hash_map::DefaultHasher;
        let mut h1 = DefaultHasher::new();
        let mut h2 = DefaultHasher::new();
        a.hash(&mut h1);
        b.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_write_uncompressed() {
        let name = Name::from_str("www.example.nl").unwrap();
        let mut writer = WireWriter::new();
        name.write(&mut writer);
        assert_eq!(
            writer.as_bytes(),
            &[3, b'w', b'w', b'w', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 2, b'n', b'l', 0]
        );
    }

    #[test]
    fn test_from_str_errors() {
        assert!(matches!(
            Name::from_str("a..b").unwrap_err(),
            Error::InvalidName { .. }
        ));
        let long = "a".repeat(64);
        assert!(matches!(
            Name::from_str(&long).unwrap_err(),
            Error::LabelTooLong { length: 64 }
        ));
    }

    #[test]
    fn test_display_escapes() {
        let message = [3, b'a', b'.', 0x07, 0];
        let (name, _) = read_at(&message, 0);
        assert_eq!(name.unwrap().to_string(), "a\\.\\007.");
    }
}
