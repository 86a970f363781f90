//! Pcap file layout: global header, frame headers and compressed sources.
//!
//! ```text
//! +------------------+-------------------+-------------+-------------------+----
//! | global header 24 | frame header 16   | frame bytes | frame header 16   | ...
//! +------------------+-------------------+-------------+-------------------+----
//! ```
//!
//! The magic number is written in the capturing host's byte order. When it
//! reads back swapped, every header field must be swapped too. Frame bytes
//! are never touched: they are network data in network order.

use crate::error::{Error, Result};
use crate::link::LinkType;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Size of the global header.
pub const GLOBAL_HEADER_SIZE: usize = 24;

/// Size of a frame header.
pub const FRAME_HEADER_SIZE: usize = 16;

/// Offset of the link type in the global header.
const LINK_TYPE_OFFSET: usize = 20;

const MAGIC_MICROS: u32 = 0xA1B2_C3D4;
const MAGIC_NANOS: u32 = 0xA1B2_3C4D;

/// Byte order of the header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Fields are big-endian.
    Big,
    /// Fields are little-endian.
    Little,
}

impl ByteOrder {
    /// Reads a u32 field at `offset`.
    #[inline]
    fn u32_at(self, buf: &[u8], offset: usize) -> u32 {
        let bytes = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
        match self {
            Self::Big => u32::from_be_bytes(bytes),
            Self::Little => u32::from_le_bytes(bytes),
        }
    }

    /// Reads a u16 field at `offset`.
    #[inline]
    fn u16_at(self, buf: &[u8], offset: usize) -> u16 {
        let bytes = [buf[offset], buf[offset + 1]];
        match self {
            Self::Big => u16::from_be_bytes(bytes),
            Self::Little => u16::from_le_bytes(bytes),
        }
    }
}

/// Timestamp resolution of the frame headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Second fraction in microseconds.
    Micro,
    /// Second fraction in nanoseconds.
    Nano,
}

/// The pcap global header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureHeader {
    /// Byte order of header fields.
    pub byte_order: ByteOrder,
    /// Timestamp precision.
    pub precision: Precision,
    /// Format version, major and minor.
    pub version: (u16, u16),
    /// Maximum captured length per frame.
    pub snaplen: u32,
    /// Raw link type value.
    pub link_type: u32,
}

impl CaptureHeader {
    /// Parses the 24-byte global header.
    pub fn parse(buf: &[u8; GLOBAL_HEADER_SIZE]) -> Result<Self> {
        let magic = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let (byte_order, precision) = match magic {
            MAGIC_MICROS => (ByteOrder::Big, Precision::Micro),
            MAGIC_NANOS => (ByteOrder::Big, Precision::Nano),
            m if m.swap_bytes() == MAGIC_MICROS => (ByteOrder::Little, Precision::Micro),
            m if m.swap_bytes() == MAGIC_NANOS => (ByteOrder::Little, Precision::Nano),
            _ => return Err(Error::NotPcap { magic }),
        };

        Ok(Self {
            byte_order,
            precision,
            version: (byte_order.u16_at(buf, 4), byte_order.u16_at(buf, 6)),
            snaplen: byte_order.u32_at(buf, 16),
            link_type: byte_order.u32_at(buf, LINK_TYPE_OFFSET),
        })
    }

    /// Returns the link type if it has an IP locator.
    pub fn link(&self) -> Result<LinkType> {
        LinkType::try_from(self.link_type).map_err(|_| Error::UnsupportedLinkType(self.link_type))
    }

    /// Parses a 16-byte frame header.
    pub fn frame_header(&self, buf: &[u8; FRAME_HEADER_SIZE]) -> FrameHeader {
        let fraction = self.byte_order.u32_at(buf, 4);
        FrameHeader {
            ts_sec: self.byte_order.u32_at(buf, 0),
            ts_usec: match self.precision {
                Precision::Micro => fraction,
                Precision::Nano => fraction / 1_000,
            },
            caplen: self.byte_order.u32_at(buf, 8) as usize,
            origlen: self.byte_order.u32_at(buf, 12) as usize,
        }
    }
}

/// A frame header, with the fraction normalised to microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Capture time, seconds.
    pub ts_sec: u32,
    /// Capture time, microseconds.
    pub ts_usec: u32,
    /// Bytes present in the file.
    pub caplen: usize,
    /// Bytes on the wire.
    pub origlen: usize,
}

/// Compression applied to a capture file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Plain pcap.
    None,
    /// `.gz`
    Gzip,
    /// `.xz`
    Xz,
}

impl Compression {
    /// Picks the compression from a file name.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Self::Gzip,
            Some(ext) if ext.eq_ignore_ascii_case("xz") => Self::Xz,
            _ => Self::None,
        }
    }

    /// Wraps `reader` in the matching decoder.
    pub fn wrap<R: Read + Send + 'static>(self, reader: R) -> Box<dyn Read + Send> {
        match self {
            Self::None => Box::new(reader),
            // Concatenated gzip members are common in rotated captures.
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        }
    }
}

/// Opens a capture file for sequential reading, decompressing by extension.
pub fn open(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    let compression = Compression::from_path(path);
    Ok(compression.wrap(BufReader::with_capacity(256 * 1024, file)))
}

/// Reads exactly `buf.len()` bytes, or returns how many were available
/// before EOF.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
