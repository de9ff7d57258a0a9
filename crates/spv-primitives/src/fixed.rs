//! Fixed-point amount with eight decimal places

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed-point parsing error
#[derive(Debug, Error)]
pub enum FixedError {
    /// Malformed decimal string
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),
    /// Value does not fit into 64 bits once scaled
    #[error("value out of range: {0}")]
    Overflow(String),
}

/// Signed amount scaled by 10^8
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Debug)]
pub struct Fixed64(i64);

impl Fixed64 {
    /// Number of fractional decimal digits
    pub const DECIMALS: u32 = 8;

    /// Scale factor (10^8)
    pub const SCALE: i64 = 100_000_000;

    /// Zero amount
    pub const ZERO: Fixed64 = Fixed64(0);

    /// Create from the raw scaled integer
    pub const fn from_raw(raw: i64) -> Self {
        Fixed64(raw)
    }

    /// Raw scaled integer
    pub const fn raw(&self) -> i64 {
        self.0
    }

    /// Big-endian encoding of the raw value
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Decode from the big-endian raw value
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Fixed64(i64::from_be_bytes(bytes))
    }
}

impl fmt::Display for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE as u64;
        write!(f, "{}{}.{:08}", sign, abs / scale, abs % scale)
    }
}

impl FromStr for Fixed64 {
    type Err = FixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty()
            || frac_part.len() > Self::DECIMALS as usize
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(FixedError::InvalidDecimal(s.to_string()));
        }

        let int: i64 = int_part
            .parse()
            .map_err(|_| FixedError::Overflow(s.to_string()))?;
        let frac: i64 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<8}", frac_part);
            padded
                .parse()
                .map_err(|_| FixedError::InvalidDecimal(s.to_string()))?
        };

        // negatives accumulate below zero so i64::MIN stays reachable
        let scaled = int.checked_mul(Self::SCALE);
        let raw = if negative {
            scaled.and_then(i64::checked_neg).and_then(|v| v.checked_sub(frac))
        } else {
            scaled.and_then(|v| v.checked_add(frac))
        };
        raw.map(Fixed64)
            .ok_or_else(|| FixedError::Overflow(s.to_string()))
    }
}

impl From<i64> for Fixed64 {
    fn from(raw: i64) -> Self {
        Fixed64(raw)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Fixed64 {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for Fixed64 {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_json_string() {
            let amount = Fixed64::from_raw(150_000_000);
            let json = serde_json::to_string(&amount).unwrap();
            assert_eq!(json, "\"1.50000000\"");
            assert_eq!(serde_json::from_str::<Fixed64>(&json).unwrap(), amount);
            assert!(serde_json::from_str::<Fixed64>("\"1.2.3\"").is_err());
        }
    }
}
