//! Chains mined via AuxPoW.
//!
//! An aux chain's own block header never carries proof of work. It is built
//! once at job construction with a zero nonce, and its double-SHA256 becomes
//! the leaf committed into the parent coinbase's blockchain merkle tree. On
//! a solve, the serialized block follows the AuxPoW layout: the standalone
//! header, the parent coinbase, and the two merkle proofs linking them.

use bitcoin::consensus::encode::VarInt;
use bitcoin::hashes::{sha256d, Hash};

use super::{coinbase, merkle, JobError};
use crate::registry::{Algo, ChainConfig};
use crate::template::BlockTemplate;
use crate::u256::U256;

/// AuxPoW flag bit within the version word.
const AUXPOW_VERSION_FLAG: u32 = 1 << 8;
/// Lowest bit of the chain-ID region within the version word.
const CHAIN_ID_SHIFT: u32 = 16;

/// Job state for one auxiliary chain.
#[derive(Debug, Clone)]
pub struct AuxChainJob {
    pub(crate) chain: ChainConfig,
    pub(crate) subsidy: i64,
    pub(crate) height: i64,

    pub(crate) header_hash: [u8; 32],
    pub(crate) block_header: Vec<u8>,
    pub(crate) chain_id: u32,
    pub(crate) blockchain_merkle_branch: Vec<[u8; 32]>,
    pub(crate) blockchain_merkle_mask: u32,
    pub(crate) transactions: Vec<Vec<u8>>,
    pub(crate) coinbase: Vec<u8>,
    pub(crate) coinbase_hash: [u8; 32],
    pub(crate) target: U256,
}

impl AuxChainJob {
    pub(crate) fn new(
        template: &BlockTemplate,
        chain: &ChainConfig,
        algo: &Algo,
    ) -> Result<Self, JobError> {
        if template.chain_id() == 0 {
            return Err(JobError::NullChainId {
                currency: chain.code().to_string(),
            });
        }

        let mut version = template.version();
        version |= AUXPOW_VERSION_FLAG;
        version |= template.chain_id() << CHAIN_ID_SHIFT;
        version = chain.algo_version(version, algo.name());

        // The aux chain's own coinbase carries no merge-mining blob and no
        // extranonce slot; its hash and the template transactions fix the
        // header's merkle root once and for all.
        let aux_coinbase = coinbase::build_full(template, chain, &[])?;
        let coinbase_hash = sha256d::Hash::hash(&aux_coinbase).to_byte_array();
        let merkle_root = merkle::fold_coinbase(
            coinbase_hash,
            &merkle::coinbase_branch(&template.tx_hashes()),
        );

        let mut block_header = Vec::with_capacity(80);
        block_header.extend_from_slice(&version.to_le_bytes());
        block_header.extend_from_slice(&template.prev_block_hash());
        block_header.extend_from_slice(&merkle_root);
        block_header.extend_from_slice(&template.curtime().to_le_bytes());
        block_header.extend_from_slice(&template.bits());
        block_header.extend_from_slice(&[0u8; 4]);

        let header_hash = sha256d::Hash::hash(&block_header).to_byte_array();

        Ok(Self {
            chain: chain.clone(),
            subsidy: template.coinbase_value(),
            height: template.height(),
            header_hash,
            block_header,
            chain_id: template.chain_id(),
            blockchain_merkle_branch: Vec::new(),
            blockchain_merkle_mask: 0,
            transactions: template
                .transactions()
                .iter()
                .map(|tx| tx.raw().to_vec())
                .collect(),
            coinbase: aux_coinbase,
            coinbase_hash,
            target: template.target(),
        })
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    pub fn target(&self) -> U256 {
        self.target
    }

    /// Double-SHA256 of the standalone header; the chain's leaf in the
    /// blockchain merkle tree.
    pub fn header_hash(&self) -> [u8; 32] {
        self.header_hash
    }

    /// Serialize the AuxPoW block for daemon submission.
    ///
    /// Layout: standalone header, parent coinbase, parent header hash, the
    /// coinbase's branch through the parent transaction tree (index mask
    /// always zero), the chain's branch through the blockchain merkle tree
    /// with its side mask, the parent header, then this chain's own
    /// transactions.
    pub(crate) fn block_bytes(
        &self,
        parent_coinbase: &[u8],
        parent_header_hash: &[u8; 32],
        coinbase_branch: &[[u8; 32]],
        parent_header: &[u8],
    ) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(&self.block_header);
        block.extend_from_slice(parent_coinbase);
        block.extend_from_slice(parent_header_hash);

        block.extend_from_slice(&bitcoin::consensus::serialize(&VarInt(
            coinbase_branch.len() as u64,
        )));
        for sibling in coinbase_branch {
            block.extend_from_slice(sibling);
        }
        block.extend_from_slice(&[0u8; 4]);

        block.extend_from_slice(&bitcoin::consensus::serialize(&VarInt(
            self.blockchain_merkle_branch.len() as u64,
        )));
        for sibling in &self.blockchain_merkle_branch {
            block.extend_from_slice(sibling);
        }
        block.extend_from_slice(&self.blockchain_merkle_mask.to_le_bytes());

        block.extend_from_slice(parent_header);
        block.extend_from_slice(&bitcoin::consensus::serialize(&VarInt(
            self.transactions.len() as u64 + 1,
        )));
        block.extend_from_slice(&self.coinbase);
        for tx in &self.transactions {
            block.extend_from_slice(tx);
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_templates::{aux_template, chain_config, sha256d_algo};

    #[test]
    fn test_null_chain_id_rejected() {
        let template = aux_template(42, 0);
        let chain = chain_config("AUX", 0, true);
        assert!(matches!(
            AuxChainJob::new(&template, &chain, &sha256d_algo()),
            Err(JobError::NullChainId { .. })
        ));
    }

    #[test]
    fn test_version_word_flags() {
        let template = aux_template(42, 7);
        let chain = chain_config("AUX", 7, true);
        let job = AuxChainJob::new(&template, &chain, &sha256d_algo()).unwrap();

        let version = u32::from_le_bytes(job.block_header[..4].try_into().unwrap());
        assert_eq!(version & AUXPOW_VERSION_FLAG, AUXPOW_VERSION_FLAG);
        assert_eq!(version >> 16, 7);
        // low byte of the template version survives
        assert_eq!(version & 0xff, template.version() & 0xff);
    }

    #[test]
    fn test_standalone_header_shape() {
        let template = aux_template(42, 7);
        let chain = chain_config("AUX", 7, true);
        let job = AuxChainJob::new(&template, &chain, &sha256d_algo()).unwrap();

        assert_eq!(job.block_header.len(), 80);
        assert_eq!(&job.block_header[4..36], &template.prev_block_hash());
        assert_eq!(&job.block_header[68..72], &template.curtime().to_le_bytes());
        assert_eq!(&job.block_header[72..76], &template.bits());
        assert_eq!(&job.block_header[76..], &[0u8; 4]);
        assert_eq!(
            job.header_hash(),
            sha256d::Hash::hash(&job.block_header).to_byte_array()
        );
    }

    #[test]
    fn test_block_bytes_layout() {
        let template = aux_template(42, 7);
        let chain = chain_config("AUX", 7, true);
        let mut job = AuxChainJob::new(&template, &chain, &sha256d_algo()).unwrap();
        job.blockchain_merkle_branch = vec![[0x55; 32]];
        job.blockchain_merkle_mask = 1;

        let parent_coinbase = [0xcbu8; 50];
        let parent_header = [0xaau8; 80];
        let coinbase_branch = [[0x11u8; 32]];
        let block = job.block_bytes(
            &parent_coinbase,
            &[0x99; 32],
            &coinbase_branch,
            &parent_header,
        );

        let mut cursor = 0;
        assert_eq!(&block[cursor..cursor + 80], &job.block_header[..]);
        cursor += 80;
        assert_eq!(&block[cursor..cursor + 50], &parent_coinbase);
        cursor += 50;
        assert_eq!(&block[cursor..cursor + 32], &[0x99; 32]);
        cursor += 32;
        // coinbase branch: count, sibling, zero index mask
        assert_eq!(block[cursor], 1);
        cursor += 1;
        assert_eq!(&block[cursor..cursor + 32], &[0x11; 32]);
        cursor += 32;
        assert_eq!(&block[cursor..cursor + 4], &[0u8; 4]);
        cursor += 4;
        // blockchain branch: count, sibling, side mask
        assert_eq!(block[cursor], 1);
        cursor += 1;
        assert_eq!(&block[cursor..cursor + 32], &[0x55; 32]);
        cursor += 32;
        assert_eq!(&block[cursor..cursor + 4], &1u32.to_le_bytes());
        cursor += 4;
        assert_eq!(&block[cursor..cursor + 80], &parent_header);
        cursor += 80;
        // aux transactions: count includes this chain's own coinbase
        assert_eq!(block[cursor], 2);
        cursor += 1;
        assert_eq!(&block[cursor..cursor + job.coinbase.len()], &job.coinbase[..]);
        cursor += job.coinbase.len();
        assert_eq!(&block[cursor..], template.transactions()[0].raw());
    }
}
