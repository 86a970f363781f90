//! LOC record (RFC 1876).

use crate::error::{Error, Result};
use crate::wire::{WireReader, WireWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

const EQUATOR: i64 = 1 << 31;
const ALTITUDE_BASE_CM: i64 = 10_000_000;

/// LOC record - geographic location.
///
/// Latitude and longitude are thousandths of an arc second offset by 2^31;
/// altitude is centimetres above a base 100 km below the WGS84 spheroid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LOC {
    /// Format version, always 0.
    pub version: u8,
    /// Diameter of the enclosing sphere, encoded as mantissa/exponent.
    pub size: u8,
    /// Horizontal precision, encoded as mantissa/exponent.
    pub horizontal_precision: u8,
    /// Vertical precision, encoded as mantissa/exponent.
    pub vertical_precision: u8,
    /// Latitude.
    pub latitude: u32,
    /// Longitude.
    pub longitude: u32,
    /// Altitude.
    pub altitude: u32,
}

impl LOC {
    /// Reads a LOC record. Only version 0, 16 bytes long, is understood.
    pub fn read(reader: &mut WireReader<'_>, rdlength: usize) -> Result<Self> {
        if rdlength != 16 {
            return Err(Error::invalid_rdata("LOC", format!("length {rdlength}, expected 16")));
        }
        let version = reader.read_u8()?;
        if version != 0 {
            return Err(Error::invalid_rdata("LOC", format!("version {version}")));
        }
        Ok(Self {
            version,
            size: reader.read_u8()?,
            horizontal_precision: reader.read_u8()?,
            vertical_precision: reader.read_u8()?,
            latitude: reader.read_u32()?,
            longitude: reader.read_u32()?,
            altitude: reader.read_u32()?,
        })
    }

    /// Writes the LOC record.
    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_u8(self.version);
        writer.write_u8(self.size);
        writer.write_u8(self.horizontal_precision);
        writer.write_u8(self.vertical_precision);
        writer.write_u32(self.latitude);
        writer.write_u32(self.longitude);
        writer.write_u32(self.altitude);
    }

    /// Altitude in metres relative to the WGS84 spheroid.
    pub fn altitude_meters(&self) -> f64 {
        (i64::from(self.altitude) - ALTITUDE_BASE_CM) as f64 / 100.0
    }

    fn precision_meters(encoded: u8) -> f64 {
        let mantissa = f64::from(encoded >> 4);
        let exponent = i32::from(encoded & 0x0F);
        mantissa * 10f64.powi(exponent) / 100.0
    }
}

fn fmt_coordinate(f: &mut fmt::Formatter<'_>, raw: u32, pos: char, neg: char) -> fmt::Result {
    let offset = i64::from(raw) - EQUATOR;
    let hemisphere = if offset < 0 { neg } else { pos };
    let abs = offset.abs();
    let degrees = abs / 3_600_000;
    let minutes = (abs % 3_600_000) / 60_000;
    let seconds = (abs % 60_000) as f64 / 1000.0;
    write!(f, "{degrees} {minutes} {seconds:.3} {hemisphere}")
}

impl fmt::Display for LOC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_coordinate(f, self.latitude, 'N', 'S')?;
        f.write_str(" ")?;
        fmt_coordinate(f, self.longitude, 'E', 'W')?;
        write!(
            f,
            " {:.2}m {}m {}m {}m",
            self.altitude_meters(),
            Self::precision_meters(self.size),
            Self::precision_meters(self.horizontal_precision),
            Self::precision_meters(self.vertical_precision)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loc_record() {
        // 52 22 23.000 N, 4 53 32.000 E, altitude -2m, 1m 10000m 10m
        let lat = (EQUATOR + (52 * 3_600_000 + 22 * 60_000 + 23_000)) as u32;
        let lon = (EQUATOR + (4 * 3_600_000 + 53 * 60_000 + 32_000)) as u32;
        let alt = (ALTITUDE_BASE_CM - 200) as u32;

        let mut data = vec![0, 0x12, 0x16, 0x13];
        data.extend_from_slice(&lat.to_be_bytes());
        data.extend_from_slice(&lon.to_be_bytes());
        data.extend_from_slice(&alt.to_be_bytes());

        let loc = LOC::read(&mut WireReader::new(&data), 16).unwrap();
        assert_eq!(
            loc.to_string(),
            "52 22 23.000 N 4 53 32.000 E -2.00m 1m 10000m 10m"
        );
    }

    #[test]
    fn test_loc_bad_version() {
        let data = [1u8; 16];
        assert!(LOC::read(&mut WireReader::new(&data), 16).is_err());
    }
}
