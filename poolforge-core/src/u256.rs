//! 256-bit unsigned integer arithmetic.
//!
//! Wraps `ruint::aliases::U256` to provide a stable interface. This adapter
//! module exists so we can swap the underlying library without changing
//! callers. Targets and proof-of-work hashes are compared as `U256` values.

use std::fmt;

use ruint::aliases::U256 as Ruint256;

/// A 256-bit unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U256(Ruint256);

impl U256 {
    /// Zero constant.
    pub const ZERO: Self = Self(Ruint256::ZERO);

    /// Maximum value (2^256 - 1).
    pub const MAX: Self = Self(Ruint256::MAX);

    /// Create from little-endian bytes.
    ///
    /// This is the byte order in which hashes leave the sha256d engine, so
    /// reading one directly yields the integer a network target is compared
    /// against (equivalent to reversing into display order and reading
    /// big-endian).
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(Ruint256::from_le_bytes(bytes))
    }

    /// Create from big-endian (display order) bytes.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(Ruint256::from_be_bytes(bytes))
    }

    /// Convert to little-endian bytes.
    pub fn to_le_bytes(self) -> [u8; 32] {
        self.0.to_le_bytes()
    }

    /// Convert to big-endian (display order) bytes.
    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for U256 {
    /// Formats as 64 lowercase hex digits, big-endian, zero padded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:064x}", self.0)
    }
}
