//! Coinbase construction.
//!
//! The miner-facing coinbase is handed out split around the extranonce slot:
//! `coinbase1 || extranonce1 || extranonce2 || coinbase2` must reassemble
//! into a well-formed transaction for any extranonce bytes of the agreed
//! width. The scriptSig carries the BIP-34 height push, then the
//! merge-mining blob when aux chains are present, then the extranonce
//! placeholder.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::VarInt;
use bitcoin::transaction::{self, OutPoint, TxIn, TxOut};
use bitcoin::{Amount, ScriptBuf, Sequence, Transaction, Witness};

use super::JobError;
use crate::registry::ChainConfig;
use crate::template::{BlockTemplate, TemplateError};

/// Extranonce width assigned per connection by the stratum layer.
pub const EXTRANONCE1_SIZE: usize = 4;
/// Extranonce width rolled by the miner.
pub const EXTRANONCE2_SIZE: usize = 4;
/// Total bytes reserved in the scriptSig for extranonces.
pub const EXTRANONCE_SIZE: usize = EXTRANONCE1_SIZE + EXTRANONCE2_SIZE;

/// A coinbase split at the extranonce insertion point.
#[derive(Debug, Clone)]
pub(crate) struct CoinbaseSplit {
    pub coinbase1: Vec<u8>,
    pub coinbase2: Vec<u8>,
}

/// Build the split coinbase for the main chain.
pub(crate) fn build_split(
    template: &BlockTemplate,
    chain: &ChainConfig,
    mm_blob: &[u8],
) -> Result<CoinbaseSplit, JobError> {
    let mut script_sig = height_push(template.height());
    script_sig.extend_from_slice(mm_blob);
    script_sig.extend_from_slice(&[0u8; EXTRANONCE_SIZE]);
    let script_len = script_sig.len();
    let serialized = serialize_coinbase(template, chain, script_sig)?;

    // version || input count || null outpoint || scriptSig length varint,
    // then the scriptSig itself whose final bytes are the placeholder
    let split =
        4 + 1 + 36 + VarInt(script_len as u64).size() + script_len - EXTRANONCE_SIZE;
    Ok(CoinbaseSplit {
        coinbase1: serialized[..split].to_vec(),
        coinbase2: serialized[split + EXTRANONCE_SIZE..].to_vec(),
    })
}

/// Build a complete coinbase with no extranonce slot, as used by aux chain
/// headers.
pub(crate) fn build_full(
    template: &BlockTemplate,
    chain: &ChainConfig,
    mm_blob: &[u8],
) -> Result<Vec<u8>, JobError> {
    let mut script_sig = height_push(template.height());
    script_sig.extend_from_slice(mm_blob);
    serialize_coinbase(template, chain, script_sig)
}

fn height_push(height: i64) -> Vec<u8> {
    bitcoin::script::Builder::new()
        .push_int(height)
        .into_script()
        .into_bytes()
}

fn serialize_coinbase(
    template: &BlockTemplate,
    chain: &ChainConfig,
    script_sig: Vec<u8>,
) -> Result<Vec<u8>, JobError> {
    debug_assert!(script_sig.len() <= 100, "coinbase scriptSig exceeds consensus limit");
    let value = u64::try_from(template.coinbase_value())
        .map_err(|_| TemplateError::Invalid("negative coinbasevalue".to_string()))?;
    let tx = Transaction {
        version: transaction::Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::from_bytes(script_sig),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey: ScriptBuf::from_bytes(chain.payout_script().to_vec()),
        }],
    };
    Ok(bitcoin::consensus::serialize(&tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_templates::{chain_config, main_template};
    use bitcoin::consensus::deserialize;
    use bitcoin::hashes::{sha256d, Hash};

    #[test]
    fn test_split_reassembles_to_valid_transaction() {
        let template = main_template();
        let chain = chain_config("LTC", 0, false);
        let split = build_split(&template, &chain, &[]).unwrap();

        let en1 = [0x11u8; EXTRANONCE1_SIZE];
        let en2 = [0x22u8; EXTRANONCE2_SIZE];
        let mut assembled = split.coinbase1.clone();
        assembled.extend_from_slice(&en1);
        assembled.extend_from_slice(&en2);
        assembled.extend_from_slice(&split.coinbase2);

        let tx: Transaction = deserialize(&assembled).unwrap();
        assert_eq!(tx.version, transaction::Version::ONE);
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.output.len(), 1);
        assert!(tx.is_coinbase());
        assert_eq!(tx.output[0].value.to_sat(), 5_000_000_000);

        // The extranonces sit at the tail of the scriptSig
        let script = tx.input[0].script_sig.as_bytes();
        assert_eq!(&script[script.len() - 8..], &[0x11, 0x11, 0x11, 0x11, 0x22, 0x22, 0x22, 0x22]);

        // Its hash is the double-SHA256 of the raw bytes
        let txid = tx.compute_txid();
        assert_eq!(
            txid.to_byte_array(),
            sha256d::Hash::hash(&assembled).to_byte_array()
        );
    }

    #[test]
    fn test_split_point_is_extranonce_width_invariant() {
        // Any extranonce contents parse identically: the placeholder build
        // and a concrete build differ only in those bytes.
        let template = main_template();
        let chain = chain_config("LTC", 0, false);
        let split = build_split(&template, &chain, &[]).unwrap();

        let zeroed: Vec<u8> = split
            .coinbase1
            .iter()
            .chain([0u8; EXTRANONCE_SIZE].iter())
            .chain(split.coinbase2.iter())
            .copied()
            .collect();
        let full = build_full(&template, &chain, &[]).unwrap();
        // build_full omits the placeholder, so lengths differ by exactly it
        assert_eq!(zeroed.len(), full.len() + EXTRANONCE_SIZE);
    }

    #[test]
    fn test_script_carries_height_then_blob() {
        let template = main_template();
        let chain = chain_config("LTC", 0, false);
        let blob = [0xfa, 0xbe, b'm', b'm', 0xaa, 0xbb];
        let split = build_split(&template, &chain, &blob).unwrap();

        let mut assembled = split.coinbase1.clone();
        assembled.extend_from_slice(&[0u8; EXTRANONCE_SIZE]);
        assembled.extend_from_slice(&split.coinbase2);
        let tx: Transaction = deserialize(&assembled).unwrap();
        let script = tx.input[0].script_sig.as_bytes();

        // BIP-34: minimal push of height 100
        assert_eq!(&script[..2], &[0x01, 100]);
        assert_eq!(&script[2..2 + blob.len()], &blob);
        assert_eq!(&script[2 + blob.len()..], &[0u8; EXTRANONCE_SIZE]);
    }

    #[test]
    fn test_negative_coinbase_value_rejected() {
        let template = main_template().with_coinbase_value(-1);
        let chain = chain_config("LTC", 0, false);
        assert!(build_split(&template, &chain, &[]).is_err());
    }
}
