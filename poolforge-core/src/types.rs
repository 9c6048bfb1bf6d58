//! Core types for poolforge-core.
//!
//! Re-exports commonly used rust-bitcoin types and provides conversions
//! between them and our own wrappers.

// Re-export frequently used bitcoin types for convenience
pub use bitcoin::{Amount, CompactTarget, Target, Transaction};

use crate::u256::U256;

// Conversions between U256 and bitcoin's Target type. These live here rather
// than in u256.rs to avoid coupling the generic integer type to bitcoin.

impl From<Target> for U256 {
    fn from(target: Target) -> Self {
        Self::from_le_bytes(target.to_le_bytes())
    }
}

impl From<U256> for Target {
    fn from(u: U256) -> Self {
        Target::from_le_bytes(u.to_le_bytes())
    }
}
