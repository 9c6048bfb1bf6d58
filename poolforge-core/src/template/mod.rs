//! Parsed block templates.
//!
//! A coin daemon's `getblocktemplate` (or the patched `getblocktemplate_aux`
//! for AuxPoW chains) arrives as opaque JSON bytes together with a
//! [`TemplateKey`] naming the currency and template flavor. Parsing reverses
//! the wire's big-endian hex fields into the little-endian byte order used in
//! the final block header.

use bitcoin::hashes::{sha256d, Hash};
use serde::Deserialize;
use thiserror::Error;

use crate::types::{CompactTarget, Target};
use crate::u256::U256;

/// Errors from template ingestion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// Malformed JSON, bad hex, or a missing required field
    #[error("invalid template: {0}")]
    Invalid(String),

    /// A template type string the core does not understand
    #[error("unsupported template type {0:?}")]
    UnsupportedType(String),
}

/// Template flavor, dispatched from the collaborator's type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateType {
    /// `getblocktemplate`: the chain whose header carries the proof of work
    Main,
    /// `getblocktemplate_aux`: a chain mined via AuxPoW
    Aux,
}

impl TemplateType {
    /// Parse the wire name used by the template fetcher.
    pub fn from_wire(name: &str) -> Result<Self, TemplateError> {
        match name {
            "getblocktemplate" => Ok(Self::Main),
            "getblocktemplate_aux" => Ok(Self::Aux),
            other => Err(TemplateError::UnsupportedType(other.to_string())),
        }
    }
}

/// Identifies one template within a job build request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    /// Currency code, e.g. "LTC"
    pub currency: String,
    pub template_type: TemplateType,
}

/// One transaction from a template.
#[derive(Debug, Clone)]
pub struct TemplateTx {
    raw: Vec<u8>,
    /// Header-order hash, when the daemon provided one
    hash: Option<[u8; 32]>,
}

impl TemplateTx {
    /// Raw serialized transaction bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Transaction hash in header byte order, computing it when the daemon
    /// left it out.
    pub fn txid(&self) -> [u8; 32] {
        match self.hash {
            Some(hash) => hash,
            None => sha256d::Hash::hash(&self.raw).to_byte_array(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    version: u32,
    bits: String,
    curtime: u32,
    previousblockhash: String,
    height: i64,
    coinbasevalue: i64,
    #[serde(default)]
    transactions: Vec<RawTx>,
    #[serde(default)]
    extras: RawExtras,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    data: String,
    #[serde(default)]
    hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtras {
    #[serde(default)]
    chainid: u32,
}

/// A parsed block template.
///
/// Hex fields are decoded and reversed on ingest: `prev_block_hash` and
/// `bits` are stored in the byte order in which they appear in the final
/// header.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    version: u32,
    bits: [u8; 4],
    curtime: u32,
    prev_block_hash: [u8; 32],
    height: i64,
    coinbase_value: i64,
    transactions: Vec<TemplateTx>,
    chain_id: u32,
}

impl BlockTemplate {
    /// Parse raw template bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, TemplateError> {
        let parsed: RawTemplate = serde_json::from_slice(raw)
            .map_err(|e| TemplateError::Invalid(format!("template JSON: {e}")))?;

        let bits = decode_reversed::<4>("bits", &parsed.bits)?;
        let prev_block_hash =
            decode_reversed::<32>("previousblockhash", &parsed.previousblockhash)?;

        let mut transactions = Vec::with_capacity(parsed.transactions.len());
        for tx in parsed.transactions {
            let raw = hex::decode(&tx.data)
                .map_err(|e| TemplateError::Invalid(format!("transaction data: {e}")))?;
            let hash = match tx.hash {
                Some(hash) => Some(decode_reversed::<32>("transaction hash", &hash)?),
                None => None,
            };
            transactions.push(TemplateTx { raw, hash });
        }

        Ok(Self {
            version: parsed.version,
            bits,
            curtime: parsed.curtime,
            prev_block_hash,
            height: parsed.height,
            coinbase_value: parsed.coinbasevalue,
            transactions,
            chain_id: parsed.extras.chainid,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Difficulty bits, little-endian header order.
    pub fn bits(&self) -> [u8; 4] {
        self.bits
    }

    pub fn curtime(&self) -> u32 {
        self.curtime
    }

    /// Previous block hash, little-endian header order.
    pub fn prev_block_hash(&self) -> [u8; 32] {
        self.prev_block_hash
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    /// Coinbase value in base units.
    pub fn coinbase_value(&self) -> i64 {
        self.coinbase_value
    }

    pub fn transactions(&self) -> &[TemplateTx] {
        &self.transactions
    }

    /// AuxPoW chain ID from the template's extras; zero when absent.
    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    /// Network target expanded from the compact bits field.
    pub fn target(&self) -> U256 {
        let compact = CompactTarget::from_consensus(u32::from_le_bytes(self.bits));
        U256::from(Target::from(compact))
    }

    /// Header-order hashes of the template's transactions, in template order.
    pub fn tx_hashes(&self) -> Vec<[u8; 32]> {
        self.transactions.iter().map(TemplateTx::txid).collect()
    }

    #[cfg(test)]
    pub(crate) fn with_coinbase_value(mut self, value: i64) -> Self {
        self.coinbase_value = value;
        self
    }
}

/// Decode a fixed-width big-endian hex field and reverse it into header
/// byte order.
fn decode_reversed<const N: usize>(field: &str, hex_str: &str) -> Result<[u8; N], TemplateError> {
    let decoded = hex::decode(hex_str)
        .map_err(|e| TemplateError::Invalid(format!("{field}: {e}")))?;
    let mut bytes: [u8; N] = decoded
        .try_into()
        .map_err(|_| TemplateError::Invalid(format!("{field}: expected {N} bytes")))?;
    bytes.reverse();
    Ok(bytes)
}
