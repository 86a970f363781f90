//! DNS record classes.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record class (RFC 1035 Section 3.2.4).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum RecordClass {
    /// Internet
    IN = 1,
    /// CHAOS, also used for `version.bind` style queries
    CH = 3,
    /// Hesiod
    HS = 4,
    /// NONE, used in dynamic updates
    NONE = 254,
    /// ANY, query only
    ANY = 255,
}

impl RecordClass {
    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Returns the class for a numeric value, if known.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IN => "IN",
            Self::CH => "CH",
            Self::HS => "HS",
            Self::NONE => "NONE",
            Self::ANY => "ANY",
        };
        f.write_str(name)
    }
}

/// A class value that may or may not be known.
///
/// The OPT pseudo-record reuses the class field for the UDP payload size, so
/// arbitrary values have to survive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    /// A known class.
    Known(RecordClass),
    /// Any other value (CLASS#### per RFC 3597).
    Unknown(u16),
}

impl Class {
    /// The Internet class.
    pub const IN: Self = Self::Known(RecordClass::IN);

    /// Creates a class from a u16 value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordClass::from_u16(value).map_or(Self::Unknown(value), Self::Known)
    }

    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Known(c) => c.to_u16(),
            Self::Unknown(v) => v,
        }
    }
}

impl From<RecordClass> for Class {
    fn from(c: RecordClass) -> Self {
        Self::Known(c)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(c) => write!(f, "{c}"),
            Self::Unknown(v) => write!(f, "CLASS{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_values() {
        assert_eq!(Class::from_u16(1), Class::IN);
        assert_eq!(Class::from_u16(3).to_string(), "CH");
        assert_eq!(Class::from_u16(1232), Class::Unknown(1232));
        assert_eq!(Class::from_u16(1232).to_string(), "CLASS1232");
        assert_eq!(Class::from_u16(1232).to_u16(), 1232);
    }
}
