//! Link-layer locator: finds where the IP header starts in a frame.

use crate::error::{Error, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ethertype for IPv4.
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// Ethertype for IPv6.
pub const ETHERTYPE_IPV6: u16 = 0x86DD;
/// Ethertype for an 802.1Q VLAN tag.
pub const ETHERTYPE_VLAN: u16 = 0x8100;

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const SLL_ADDR_BASE: usize = 10;
const SLL_ADDR_LEN_OFFSET: usize = 4;

/// Link types with a known IP locator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[repr(u32)]
pub enum LinkType {
    /// BSD loopback, 4-byte host-order family.
    Null = 0,
    /// Ethernet II.
    Ethernet = 1,
    /// Raw IP, no link header.
    Raw = 101,
    /// OpenBSD loopback.
    Loop = 108,
    /// Linux cooked capture.
    LinuxSll = 113,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "NULL",
            Self::Ethernet => "EN10MB",
            Self::Raw => "RAW",
            Self::Loop => "LOOP",
            Self::LinuxSll => "LINUX_SLL",
        };
        f.write_str(name)
    }
}

impl LinkType {
    /// Returns the offset of the IP header within `frame`.
    pub fn ip_offset(self, frame: &[u8]) -> Result<usize> {
        let offset = match self {
            Self::Null | Self::Loop => 4,
            Self::Raw => 0,
            Self::Ethernet => ethernet_offset(frame)?,
            // Packet type, ARPHRD and address length precede the address.
            Self::LinuxSll => SLL_ADDR_BASE + be_u16(frame, SLL_ADDR_LEN_OFFSET, "sll")? as usize,
        };

        if offset >= frame.len() {
            return Err(Error::truncated("link", offset + 1, frame.len()));
        }
        Ok(offset)
    }
}

fn ethernet_offset(frame: &[u8]) -> Result<usize> {
    let mut ethertype = be_u16(frame, 12, "ethernet")?;
    let mut offset = ETHERNET_HEADER_LEN;

    if ethertype == ETHERTYPE_VLAN {
        ethertype = be_u16(frame, 16, "vlan")?;
        offset += VLAN_TAG_LEN;
    }

    match ethertype {
        ETHERTYPE_IPV4 | ETHERTYPE_IPV6 => Ok(offset),
        other => Err(Error::UnsupportedEtherType(other)),
    }
}

#[inline]
fn be_u16(buf: &[u8], offset: usize, layer: &'static str) -> Result<u16> {
    match buf.get(offset..offset + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(Error::truncated(layer, offset + 2, buf.len())),
    }
}
