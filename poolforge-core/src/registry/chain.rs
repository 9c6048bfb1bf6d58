//! Per-chain configuration.

use bitcoin::base58;
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160};
use bitcoin::script::Builder;
use serde::Deserialize;
use std::collections::HashMap;

use super::RegistryError;

/// Which network a chain config addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

/// Bit layout used by multi-algo chains to encode the mined algorithm in the
/// block version word.
#[derive(Debug, Clone, Deserialize)]
pub struct MultiAlgoLayout {
    /// Lowest bit of the algo region
    pub shift: u32,
    /// Width of the algo region in bits
    pub width: u32,
    /// Algo name to code within the region
    pub map: HashMap<String, u32>,
}

impl MultiAlgoLayout {
    /// Rewrite the algo region of a version word for the given algorithm.
    ///
    /// Clears exactly bits `[shift, shift + width)` and ORs in the algo's
    /// code. An algo absent from the map encodes as zero, matching the
    /// daemon's default-algo convention.
    pub fn encode(&self, version: u32, algo_name: &str) -> u32 {
        let code = self.map.get(algo_name).copied().unwrap_or(0);
        let mask = (((1u64 << self.width) - 1) as u32) << self.shift;
        (version & !mask) | ((code << self.shift) & mask)
    }

    fn validate(&self, code: &str) -> Result<(), RegistryError> {
        if self.width == 0 || self.shift + self.width > 32 {
            return Err(RegistryError::InvalidConfig {
                chain: code.to_string(),
                reason: format!(
                    "multi-algo region [{}, {}) does not fit a 32-bit version",
                    self.shift,
                    self.shift + self.width
                ),
            });
        }
        for (name, algo_code) in &self.map {
            if u64::from(*algo_code) >= 1u64 << self.width {
                return Err(RegistryError::InvalidConfig {
                    chain: code.to_string(),
                    reason: format!(
                        "algo code {algo_code} for {name} exceeds {}-bit region",
                        self.width
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Declarative chain description, deserialized from operator config.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSpec {
    /// Short currency code, e.g. "LTC"
    pub code: String,
    pub network: Network,
    /// base58check version byte for pay-to-pubkey-hash addresses
    pub address_version: u8,
    /// Address credited by the coinbase output
    pub block_subsidy_address: String,
    /// AuxPoW chain ID; must be non-zero for chains mined as aux
    #[serde(default)]
    pub chain_id: u32,
    #[serde(default)]
    pub multi_algo: Option<MultiAlgoLayout>,
    /// Whether a new height on this aux chain forces a mining restart
    #[serde(default)]
    pub flush_aux: bool,
}

/// Validated, immutable per-chain parameters.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    code: String,
    network: Network,
    address_version: u8,
    block_subsidy_address: String,
    payout_script: Vec<u8>,
    chain_id: u32,
    multi_algo: Option<MultiAlgoLayout>,
    flush_aux: bool,
}

impl ChainConfig {
    pub(crate) fn from_spec(spec: ChainSpec) -> Result<Self, RegistryError> {
        let code = spec.code.to_uppercase();
        if let Some(layout) = &spec.multi_algo {
            layout.validate(&code)?;
        }
        let payout_script =
            payout_script(&code, &spec.block_subsidy_address, spec.address_version)?;
        Ok(Self {
            code,
            network: spec.network,
            address_version: spec.address_version,
            block_subsidy_address: spec.block_subsidy_address,
            payout_script,
            chain_id: spec.chain_id,
            multi_algo: spec.multi_algo,
            flush_aux: spec.flush_aux,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn address_version(&self) -> u8 {
        self.address_version
    }

    /// The operator's payout address in base58check form.
    pub fn block_subsidy_address(&self) -> &str {
        &self.block_subsidy_address
    }

    /// P2PKH script paying the subsidy address.
    pub fn payout_script(&self) -> &[u8] {
        &self.payout_script
    }

    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    pub fn multi_algo(&self) -> Option<&MultiAlgoLayout> {
        self.multi_algo.as_ref()
    }

    pub fn flush_aux(&self) -> bool {
        self.flush_aux
    }

    #[cfg(test)]
    pub(crate) fn with_multi_algo(mut self, shift: u32, width: u32, map: &[(&str, u32)]) -> Self {
        self.multi_algo = Some(MultiAlgoLayout {
            shift,
            width,
            map: map.iter().map(|(name, code)| (name.to_string(), *code)).collect(),
        });
        self
    }

    /// Apply the chain's multi-algo version rewrite, if configured.
    pub fn algo_version(&self, version: u32, algo_name: &str) -> u32 {
        match &self.multi_algo {
            Some(layout) => layout.encode(version, algo_name),
            None => version,
        }
    }
}

/// Decode a base58check address and build the P2PKH script paying it.
fn payout_script(code: &str, address: &str, version: u8) -> Result<Vec<u8>, RegistryError> {
    let decoded = base58::decode_check(address).map_err(|e| RegistryError::InvalidConfig {
        chain: code.to_string(),
        reason: format!("subsidy address {address}: {e}"),
    })?;
    if decoded.len() != 21 {
        return Err(RegistryError::InvalidConfig {
            chain: code.to_string(),
            reason: format!("subsidy address {address}: unexpected payload length"),
        });
    }
    if decoded[0] != version {
        return Err(RegistryError::InvalidConfig {
            chain: code.to_string(),
            reason: format!(
                "subsidy address version 0x{:02x} does not match configured 0x{version:02x}",
                decoded[0]
            ),
        });
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&decoded[1..]);
    let script = Builder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script();
    Ok(script.into_bytes())
}
