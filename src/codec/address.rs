//! Receiver addresses
//!
//! Each video receiver is identified by a 48-bit, MAC-like address. Pilots
//! carry it as a hex string attribute; only the first 12 hex digits count.

use crate::error::{OsdError, Result};
use std::fmt;
use std::str::FromStr;

/// Number of hex digits in a full address
const HEX_DIGITS: usize = 12;

/// 48-bit receiver address, sent big-endian on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    /// Largest representable address
    pub const MAX: u64 = (1 << 48) - 1;

    /// Build from an integer, rejecting values wider than 48 bits
    pub fn new(value: u64) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// Parse the pilot attribute form
    ///
    /// Whitespace and an optional `0x` prefix are stripped, then at most the
    /// first 12 characters are read as hex. Shorter strings parse as smaller
    /// values.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let digits: String = trimmed.chars().take(HEX_DIGITS).collect();
        if digits.is_empty() {
            return Err(OsdError::InvalidAddress {
                input: input.to_string(),
            });
        }

        // from_str_radix accepts a leading '+', the attribute format does not
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(OsdError::InvalidAddress {
                input: input.to_string(),
            });
        }

        u64::from_str_radix(&digits, 16)
            .map(Self)
            .map_err(|_| OsdError::InvalidAddress {
                input: input.to_string(),
            })
    }

    /// Parse an optional attribute, treating anything unusable as "no address"
    pub fn from_attribute(value: Option<&str>) -> Option<Self> {
        Self::parse(value?).ok()
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Wire form: 6 bytes, big-endian
    pub fn to_bytes(self) -> [u8; 6] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }

    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        let mut b = [0u8; 8];
        b[2..].copy_from_slice(&bytes);
        Self(u64::from_be_bytes(b))
    }
}

impl FromStr for DeviceAddress {
    type Err = OsdError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}
