//! DNS wire format error types.
//!
//! Every failure raised while walking a DNS message is a value of [`Error`].
//! None of them are fatal to the caller: a failed message is dropped (or
//! kept partially decoded) and decoding moves on to the next one.

use thiserror::Error;

/// Result type alias for DNS wire format operations.
pub type Result<T> = std::result::Result<T, Error>;

/// DNS wire format errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Cursor Errors
    // =========================================================================
    /// A read would run past the end of the buffer.
    #[error("buffer underrun at offset {offset}: needed {needed} bytes, {available} available")]
    BufferUnderrun {
        /// Read position when the read was attempted.
        offset: usize,
        /// Bytes the read asked for.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// An absolute seek outside the buffer.
    #[error("seek to {position} outside buffer of {len} bytes")]
    SeekOutOfBounds {
        /// Requested position.
        position: usize,
        /// Buffer length.
        len: usize,
    },

    // =========================================================================
    // Domain Name Errors
    // =========================================================================
    /// A label length byte uses the reserved `01` or `10` prefix.
    #[error("unsupported label type {label_type:#04b} at offset {offset}")]
    UnsupportedLabelType {
        /// Offset of the length byte.
        offset: usize,
        /// The two high bits of the length byte.
        label_type: u8,
    },

    /// A compression pointer jumps forward, onto itself, or past the hop cap.
    #[error("illegal compression pointer at offset {offset} to {target} (hop {hops})")]
    IllegalPointerChain {
        /// Offset of the pointer.
        offset: usize,
        /// Offset the pointer references.
        target: usize,
        /// Pointers followed so far for this name.
        hops: usize,
    },

    /// Label exceeds 63 octets.
    #[error("label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// Name exceeds 255 octets in wire form.
    #[error("name too long: {length} bytes exceeds maximum of 255")]
    NameTooLong {
        /// Wire length reached.
        length: usize,
    },

    /// Presentation format name could not be parsed.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// The offending text.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A character-string longer than 255 octets was given for encoding.
    #[error("character-string too long: {length} bytes exceeds maximum of 255")]
    CharacterStringTooLong {
        /// Actual length.
        length: usize,
    },

    // =========================================================================
    // Record Errors
    // =========================================================================
    /// RDATA content is invalid for its type.
    #[error("invalid {rtype} rdata: {message}")]
    InvalidRData {
        /// Record type mnemonic.
        rtype: String,
        /// Description of the problem.
        message: String,
    },

    /// RDATA parser consumed more bytes than RDLENGTH declared.
    #[error("{rtype} rdata overran its length: declared {declared}, consumed {consumed}")]
    RDataLengthMismatch {
        /// Record type mnemonic.
        rtype: String,
        /// RDLENGTH from the record header.
        declared: usize,
        /// Bytes the parser actually used.
        consumed: usize,
    },

    /// A record does not belong to the set it was added to.
    #[error("record {name} {rtype} does not belong to RRset {set_name} {set_type}")]
    RRsetMismatch {
        /// Owner of the rejected record.
        name: String,
        /// Type of the rejected record.
        rtype: String,
        /// Owner of the set.
        set_name: String,
        /// Type of the set.
        set_type: String,
    },

    // =========================================================================
    // EDNS Errors
    // =========================================================================
    /// An EDNS option could not be read.
    #[error("invalid EDNS option {code}: {message}")]
    InvalidEdnsOption {
        /// Option code.
        code: u16,
        /// Description of the problem.
        message: String,
    },

    /// More than one OPT record in the additional section.
    #[error("multiple OPT records in message")]
    MultipleOptRecords,
}

impl Error {
    /// Creates a new `BufferUnderrun` error.
    #[inline]
    pub fn buffer_underrun(offset: usize, needed: usize, available: usize) -> Self {
        Self::BufferUnderrun {
            offset,
            needed,
            available,
        }
    }

    /// Creates a new `IllegalPointerChain` error.
    #[inline]
    pub fn illegal_pointer(offset: usize, target: usize, hops: usize) -> Self {
        Self::IllegalPointerChain {
            offset,
            target,
            hops,
        }
    }

    /// Creates a new `InvalidName` error.
    #[inline]
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a new `InvalidRData` error.
    #[inline]
    pub fn invalid_rdata(rtype: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRData {
            rtype: rtype.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidEdnsOption` error.
    #[inline]
    pub fn invalid_edns_option(code: u16, message: impl Into<String>) -> Self {
        Self::InvalidEdnsOption {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the bytes themselves are malformed, as opposed to
    /// well-formed input that violates a DNS rule.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::BufferUnderrun { .. }
                | Self::SeekOutOfBounds { .. }
                | Self::UnsupportedLabelType { .. }
                | Self::IllegalPointerChain { .. }
                | Self::RDataLengthMismatch { .. }
        )
    }

    /// Returns true if the error came from name decoding.
    #[inline]
    pub fn is_name_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLabelType { .. }
                | Self::IllegalPointerChain { .. }
                | Self::LabelTooLong { .. }
                | Self::NameTooLong { .. }
                | Self::InvalidName { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::buffer_underrun(10, 4, 2);
        assert_eq!(
            err.to_string(),
            "buffer underrun at offset 10: needed 4 bytes, 2 available"
        );

        let err = Error::UnsupportedLabelType {
            offset: 12,
            label_type: 0b01,
        };
        assert_eq!(err.to_string(), "unsupported label type 0b01 at offset 12");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::buffer_underrun(0, 1, 0).is_malformed());
        assert!(Error::illegal_pointer(20, 30, 1).is_malformed());
        assert!(Error::illegal_pointer(20, 30, 1).is_name_error());
        assert!(!Error::MultipleOptRecords.is_malformed());
        assert!(Error::NameTooLong { length: 300 }.is_name_error());
    }
}
