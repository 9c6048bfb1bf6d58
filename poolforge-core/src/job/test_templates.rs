//! Shared golden fixtures for job tests.
//!
//! Templates mirror the JSON a coin daemon's `getblocktemplate` returns,
//! trimmed to the fields the core reads. The main chain uses the original
//! genesis difficulty (hard to hit by accident); aux chains use the loosest
//! positive compact target so solve-path tests can exercise them.

use crate::registry::{builtin, Algo, ChainConfig, ChainSpec, Network, Registry, RegistryConfig};
use crate::template::BlockTemplate;

/// The genesis payout address; decodes under version byte 0x00.
pub(crate) const SUBSIDY_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

pub(crate) const MAIN_PREV_HASH: &str =
    "000000000000000000021a3bdfb5dec7a7a5e2dcd04512dbbde6a721e9d45e27";
const AUX_PREV_HASH: &str =
    "00000000000000000aa11bc5dc39954f2643b97fed4e8ef27c2056e238b45e7a";

pub(crate) fn main_template_bytes() -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "version": 536870912u32,
        "bits": "1d00ffff",
        "curtime": 1694000000u32,
        "previousblockhash": MAIN_PREV_HASH,
        "height": 100,
        "coinbasevalue": 5_000_000_000i64,
        "transactions": [
            {
                "data": "0100",
                "hash": "00000000000000000000000000000000000000000000000000000000000000aa"
            }
        ]
    }))
    .unwrap()
}

pub(crate) fn aux_template_bytes(height: i64, chain_id: u32) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "version": 4u32,
        "bits": "207fffff",
        "curtime": 1694000100u32,
        "previousblockhash": AUX_PREV_HASH,
        "height": height,
        "coinbasevalue": 1_000_000_000i64,
        "transactions": [
            {
                "data": "0200",
                "hash": "00000000000000000000000000000000000000000000000000000000000000bb"
            }
        ],
        "extras": { "chainid": chain_id }
    }))
    .unwrap()
}

pub(crate) fn main_template() -> BlockTemplate {
    BlockTemplate::from_bytes(&main_template_bytes()).unwrap()
}

pub(crate) fn aux_template(height: i64, chain_id: u32) -> BlockTemplate {
    BlockTemplate::from_bytes(&aux_template_bytes(height, chain_id)).unwrap()
}

pub(crate) fn chain_config(code: &str, chain_id: u32, flush_aux: bool) -> ChainConfig {
    ChainConfig::from_spec(ChainSpec {
        code: code.to_string(),
        network: Network::Mainnet,
        address_version: 0,
        block_subsidy_address: SUBSIDY_ADDRESS.to_string(),
        chain_id,
        multi_algo: None,
        flush_aux,
    })
    .unwrap()
}

pub(crate) fn sha256d_algo() -> Algo {
    Algo::new("sha256d", builtin("sha256d").unwrap())
}

/// Registry with one main-capable chain and two aux chains (IDs 1 and 42).
pub(crate) fn test_registry() -> Registry {
    let config = serde_json::json!({
        "chains": [
            {
                "code": "LTC",
                "network": "mainnet",
                "address_version": 0,
                "block_subsidy_address": SUBSIDY_ADDRESS,
                "chain_id": 0
            },
            {
                "code": "AUX1",
                "network": "mainnet",
                "address_version": 0,
                "block_subsidy_address": SUBSIDY_ADDRESS,
                "chain_id": 1,
                "flush_aux": true
            },
            {
                "code": "AUX42",
                "network": "mainnet",
                "address_version": 0,
                "block_subsidy_address": SUBSIDY_ADDRESS,
                "chain_id": 42,
                "flush_aux": false
            }
        ]
    });
    let config: RegistryConfig = serde_json::from_value(config).unwrap();
    Registry::from_config(config).unwrap()
}
