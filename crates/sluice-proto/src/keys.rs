//! DNSSEC key utilities.
//!
//! Key tag computation (RFC 4034 Appendix B), DNSKEY flag tests, DS
//! association and RSA public key extraction (RFC 3110).

use crate::error::{Error, Result};
use crate::name::Name;
use crate::rdata::{DNSKEY, DS};
use ring::signature::RsaPublicKeyComponents;

/// DNSKEY flag bit 7: the key is a zone key.
pub const ZONE_KEY_FLAG: u16 = 0x0100;

/// DNSKEY flag bit 15: secure entry point.
pub const SEP_FLAG: u16 = 0x0001;

/// Returns true if the zone key bit is set.
#[inline]
pub const fn is_zone_key(flags: u16) -> bool {
    flags & ZONE_KEY_FLAG != 0
}

/// Returns true for a zone key that also carries the SEP bit.
#[inline]
pub const fn is_secure_entry_point(flags: u16) -> bool {
    flags & (ZONE_KEY_FLAG | SEP_FLAG) == ZONE_KEY_FLAG | SEP_FLAG
}

/// Computes the key tag of DNSKEY RDATA.
///
/// Algorithm 1 (RSA/MD5) takes the third- and second-to-last octets of the
/// key. Every other algorithm sums the RDATA as big-endian 16-bit words and
/// folds the carry back in once.
pub fn key_tag(rdata: &[u8], algorithm: u8) -> u16 {
    if algorithm == 1 {
        let len = rdata.len();
        if len < 3 {
            return 0;
        }
        return (u16::from(rdata[len - 3]) << 8) + u16::from(rdata[len - 2]);
    }

    let mut acc: u32 = 0;
    for (i, byte) in rdata.iter().enumerate() {
        if i & 1 == 0 {
            acc += u32::from(*byte) << 8;
        } else {
            acc += u32::from(*byte);
        }
    }
    acc += (acc >> 16) & 0xFFFF;
    (acc & 0xFFFF) as u16
}

/// Extracts the RSA exponent and modulus from a DNSKEY.
///
/// The public key starts with the exponent length: one octet, or when that
/// octet is zero, the following two octets.
pub fn rsa_public_key(dnskey: &DNSKEY) -> Result<RsaPublicKeyComponents<Vec<u8>>> {
    match dnskey.algorithm() {
        Some(alg) if alg.is_rsa() => {}
        _ => {
            return Err(Error::invalid_rdata(
                "DNSKEY",
                format!("algorithm {} is not RSA", dnskey.algorithm),
            ))
        }
    }

    let key = dnskey.public_key.as_slice();
    let (exp_len, rest) = match key {
        [0, hi, lo, rest @ ..] => (usize::from(u16::from_be_bytes([*hi, *lo])), rest),
        [len, rest @ ..] if *len != 0 => (usize::from(*len), rest),
        _ => return Err(Error::invalid_rdata("DNSKEY", "missing RSA exponent length")),
    };

    if exp_len == 0 || rest.len() <= exp_len {
        return Err(Error::invalid_rdata(
            "DNSKEY",
            format!("RSA exponent of {exp_len} bytes leaves no modulus in {} bytes", rest.len()),
        ));
    }

    let (e, n) = rest.split_at(exp_len);
    Ok(RsaPublicKeyComponents {
        n: n.to_vec(),
        e: e.to_vec(),
    })
}

/// Returns true if `ds` (owned by `ds_owner`) refers to `dnskey` (owned by `owner`).
///
/// Compares algorithm, key tag and owner name. The digest itself is not
/// recomputed.
pub fn key_matches_ds(owner: &Name, dnskey: &DNSKEY, ds_owner: &Name, ds: &DS) -> bool {
    dnskey.algorithm == ds.algorithm && dnskey.key_tag() == ds.key_tag && owner == ds_owner
}
