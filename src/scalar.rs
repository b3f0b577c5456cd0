//! 256-bit private-key scalars and the chunk-mode lane derivation.
//!
//! A [`PrivateKey`] is always held as 32 big-endian bytes, which is also the
//! layout the kernel reads from its input buffer and writes back into every
//! result record that carries the private key.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use secp256k1::SecretKey;

use crate::error::{PipelineError, Result};

pub const PRIVATE_KEY_LEN: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrivateKey([u8; PRIVATE_KEY_LEN]);

impl PrivateKey {
    /// Accepts `1 ..= n-1` where `n` is the secp256k1 group order.
    pub fn from_be_bytes(bytes: [u8; PRIVATE_KEY_LEN]) -> Result<Self> {
        SecretKey::from_slice(&bytes)
            .map_err(|e| PipelineError::InvalidPrivateKey(format!("{}: {e}", hex::encode(bytes))))?;
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let be: [u8; PRIVATE_KEY_LEN] = bytes.try_into().map_err(|_| {
            PipelineError::InvalidPrivateKey(format!(
                "expected {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::from_be_bytes(be)
    }

    /// Parses big-endian hex; `0x` prefixes, underscores and odd lengths are allowed.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let mut s = s.replace('_', "");
        if s.is_empty() {
            return Err(PipelineError::InvalidPrivateKey("empty hex".into()));
        }
        if s.len() % 2 == 1 {
            s.insert(0, '0');
        }
        let bytes = hex::decode(&s).map_err(|e| PipelineError::InvalidPrivateKey(format!("{s}: {e}")))?;
        if bytes.len() > PRIVATE_KEY_LEN {
            return Err(PipelineError::InvalidPrivateKey(format!(
                "hex too large ({} bytes)",
                bytes.len()
            )));
        }
        let mut be = [0u8; PRIVATE_KEY_LEN];
        be[PRIVATE_KEY_LEN - bytes.len()..].copy_from_slice(&bytes);
        Self::from_be_bytes(be)
    }

    pub fn from_biguint(value: &BigUint) -> Result<Self> {
        let bytes = value.to_bytes_be();
        if bytes.len() > PRIVATE_KEY_LEN {
            return Err(PipelineError::InvalidPrivateKey(format!("{value:x} exceeds 256 bits")));
        }
        let mut be = [0u8; PRIVATE_KEY_LEN];
        be[PRIVATE_KEY_LEN - bytes.len()..].copy_from_slice(&bytes);
        Self::from_be_bytes(be)
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    pub fn to_be_bytes(&self) -> [u8; PRIVATE_KEY_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Least significant 32 bits of the scalar.
    pub fn low_u32(&self) -> u32 {
        u32::from_be_bytes([self.0[28], self.0[29], self.0[30], self.0[31]])
    }

    /// Key processed by lane `index` when this key seeds a chunk:
    /// `(self & !0xFFFFFFFF) | ((self & 0xFFFFFFFF) | index)`.
    ///
    /// The lane index is OR-ed into the existing low bits, so a seed whose low
    /// word already has bits set does not enumerate a contiguous range. The
    /// result is not range checked; a seed within 2^32 of the group order can
    /// yield a lane key the host side refuses to derive.
    pub fn lane(&self, index: u32) -> PrivateKey {
        let low = self.low_u32() | index;
        let mut be = self.0;
        be[28..].copy_from_slice(&low.to_be_bytes());
        PrivateKey(be)
    }
}

/// Host-side copy of the keys a chunk-mode dispatch covers.
pub fn expand_chunk(seed: &PrivateKey, work_size: usize) -> Vec<PrivateKey> {
    (0..work_size).map(|i| seed.lane(i as u32)).collect()
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.to_hex())
    }
}

impl FromStr for PrivateKey {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<&BigUint> for PrivateKey {
    type Error = PipelineError;

    fn try_from(value: &BigUint) -> Result<Self> {
        Self::from_biguint(value)
    }
}
