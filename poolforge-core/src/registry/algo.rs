//! Proof-of-work hash algorithms.
//!
//! Each [`Algo`] names a pure function from serialized header bytes to a
//! 32-byte digest. The digest is interpreted little-endian as a 256-bit
//! integer and compared against share and network targets.

use bitcoin::hashes::{sha256d, Hash};
use thiserror::Error;

/// Errors from a proof-of-work hash function.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlgoError {
    /// The hash function rejected its input or parameters
    #[error("pow hash failed: {0}")]
    Hash(String),
}

/// A proof-of-work hash function over raw header bytes.
pub type PowHashFn = fn(&[u8]) -> Result<[u8; 32], AlgoError>;

/// A named proof-of-work algorithm.
#[derive(Debug, Clone)]
pub struct Algo {
    name: String,
    pow: PowHashFn,
}

impl Algo {
    pub(crate) fn new(name: &str, pow: PowHashFn) -> Self {
        Self {
            name: name.to_string(),
            pow,
        }
    }

    /// Algorithm name as referenced by chain configs and share chains.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash serialized header bytes to a 32-byte digest.
    pub fn pow_hash(&self, header: &[u8]) -> Result<[u8; 32], AlgoError> {
        (self.pow)(header)
    }
}

/// The built-in algorithm table.
///
/// `equihash` hashes with sha256d: for Equihash chains the target check runs
/// over the double-SHA256 of the solution-bearing header, while solution
/// validity itself is the daemon's concern.
pub(crate) fn builtins() -> [(&'static str, PowHashFn); 3] {
    [
        ("sha256d", sha256d_pow as PowHashFn),
        ("scrypt", scrypt_pow as PowHashFn),
        ("equihash", sha256d_pow as PowHashFn),
    ]
}

/// Look up a built-in hash function by algorithm name.
#[cfg(test)]
pub(crate) fn builtin(name: &str) -> Option<PowHashFn> {
    builtins()
        .iter()
        .find(|(builtin_name, _)| *builtin_name == name)
        .map(|(_, pow)| *pow)
}

fn sha256d_pow(header: &[u8]) -> Result<[u8; 32], AlgoError> {
    Ok(sha256d::Hash::hash(header).to_byte_array())
}

/// scrypt with the Litecoin parameterization: N=1024 (log2 = 10), r=1, p=1,
/// the header doubling as its own salt.
fn scrypt_pow(header: &[u8]) -> Result<[u8; 32], AlgoError> {
    let params =
        scrypt::Params::new(10, 1, 1, 32).map_err(|e| AlgoError::Hash(e.to_string()))?;
    let mut digest = [0u8; 32];
    scrypt::scrypt(header, header, &params, &mut digest)
        .map_err(|e| AlgoError::Hash(e.to_string()))?;
    Ok(digest)
}
