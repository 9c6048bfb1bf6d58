//! Currency, share-chain, and algorithm registry.
//!
//! The registry is populated once at startup from operator configuration and
//! frozen thereafter. Callers share it behind an `Arc` and read without
//! locking; reconfiguration means building a fresh registry and swapping the
//! `Arc` atomically.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::tracing::prelude::*;

mod algo;
mod chain;

pub use algo::{Algo, AlgoError, PowHashFn};
pub use chain::{ChainConfig, ChainSpec, MultiAlgoLayout, Network};

#[cfg(test)]
pub(crate) use algo::builtin;

/// Errors raised while building or querying the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid config for chain {chain}: {reason}")]
    InvalidConfig { chain: String, reason: String },

    #[error("duplicate chain code {0}")]
    DuplicateChain(String),

    #[error("unknown currency {0}")]
    UnknownCurrency(String),

    #[error("unknown algorithm {0}")]
    UnknownAlgo(String),

    #[error("unknown share chain {0}")]
    UnknownShareChain(String),
}

/// A share chain binding a payout scheme to the algorithm it accepts
/// shares for. Accounting itself lives outside the core.
#[derive(Debug, Clone)]
pub struct ShareChainConfig {
    pub name: String,
    pub payout_method: String,
    pub fee: f64,
    pub algo: String,
}

/// Declarative share-chain description from operator config.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareChainSpec {
    pub name: String,
    pub payout_method: String,
    #[serde(default)]
    pub fee: f64,
    pub algo: String,
}

/// Top-level registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub chains: Vec<ChainSpec>,
    #[serde(default)]
    pub share_chains: Vec<ShareChainSpec>,
}

/// Initialize-once lookup tables for chains, algorithms, and share chains.
#[derive(Debug, Clone)]
pub struct Registry {
    chains: HashMap<String, ChainConfig>,
    algos: HashMap<String, Algo>,
    share_chains: HashMap<String, ShareChainConfig>,
}

impl Registry {
    /// Validate operator configuration into an immutable registry.
    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut registry = Self {
            chains: HashMap::new(),
            algos: HashMap::new(),
            share_chains: HashMap::new(),
        };
        for (name, pow) in algo::builtins() {
            registry.algos.insert(name.to_string(), Algo::new(name, pow));
        }
        for spec in config.chains {
            registry.register(ChainConfig::from_spec(spec)?)?;
        }
        for spec in config.share_chains {
            let name = spec.name.to_uppercase();
            if !registry.algos.contains_key(&spec.algo) {
                return Err(RegistryError::UnknownAlgo(spec.algo));
            }
            debug!(share_chain = %name, algo = %spec.algo, "registered share chain");
            registry.share_chains.insert(
                name.clone(),
                ShareChainConfig {
                    name,
                    payout_method: spec.payout_method,
                    fee: spec.fee,
                    algo: spec.algo,
                },
            );
        }
        Ok(registry)
    }

    fn register(&mut self, config: ChainConfig) -> Result<(), RegistryError> {
        if let Some(layout) = config.multi_algo() {
            for name in layout.map.keys() {
                if !self.algos.contains_key(name) {
                    return Err(RegistryError::UnknownAlgo(name.clone()));
                }
            }
        }
        let code = config.code().to_string();
        debug!(chain = %code, chain_id = config.chain_id(), "registered chain");
        if self.chains.insert(code.clone(), config).is_some() {
            return Err(RegistryError::DuplicateChain(code));
        }
        Ok(())
    }

    /// Look up a chain by currency code.
    pub fn chain(&self, code: &str) -> Result<&ChainConfig, RegistryError> {
        self.chains
            .get(code)
            .ok_or_else(|| RegistryError::UnknownCurrency(code.to_string()))
    }

    /// Look up a proof-of-work algorithm by name.
    pub fn algo(&self, name: &str) -> Result<&Algo, RegistryError> {
        self.algos
            .get(name)
            .ok_or_else(|| RegistryError::UnknownAlgo(name.to_string()))
    }

    /// Look up a share chain by name.
    pub fn share_chain(&self, name: &str) -> Result<&ShareChainConfig, RegistryError> {
        self.share_chains
            .get(name)
            .ok_or_else(|| RegistryError::UnknownShareChain(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json() -> serde_json::Value {
        serde_json::json!({
            "chains": [
                {
                    "code": "ltc",
                    "network": "mainnet",
                    "address_version": 0,
                    "block_subsidy_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
                    "chain_id": 0
                },
                {
                    "code": "aux",
                    "network": "mainnet",
                    "address_version": 0,
                    "block_subsidy_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
                    "chain_id": 42,
                    "flush_aux": true
                }
            ],
            "share_chains": [
                { "name": "ltc_pplns", "payout_method": "pplns", "fee": 0.01, "algo": "scrypt" }
            ]
        })
    }

    #[test]
    fn test_from_config_and_lookups() {
        let config: RegistryConfig = serde_json::from_value(config_json()).unwrap();
        let registry = Registry::from_config(config).unwrap();

        assert_eq!(registry.chain("LTC").unwrap().code(), "LTC");
        assert!(registry.chain("AUX").unwrap().flush_aux());
        assert_eq!(registry.chain("AUX").unwrap().chain_id(), 42);
        assert!(matches!(
            registry.chain("DOGE"),
            Err(RegistryError::UnknownCurrency(_))
        ));

        assert_eq!(registry.algo("sha256d").unwrap().name(), "sha256d");
        assert!(matches!(
            registry.algo("x11"),
            Err(RegistryError::UnknownAlgo(_))
        ));

        let share = registry.share_chain("LTC_PPLNS").unwrap();
        assert_eq!(share.algo, "scrypt");
        assert_eq!(share.payout_method, "pplns");
    }

    #[test]
    fn test_share_chain_with_unknown_algo_rejected() {
        let mut value = config_json();
        value["share_chains"][0]["algo"] = serde_json::json!("x11");
        let config: RegistryConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            Registry::from_config(config),
            Err(RegistryError::UnknownAlgo(_))
        ));
    }

    #[test]
    fn test_duplicate_chain_rejected() {
        let mut value = config_json();
        value["chains"][1] = value["chains"][0].clone();
        let config: RegistryConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            Registry::from_config(config),
            Err(RegistryError::DuplicateChain(_))
        ));
    }
}
