//! The chain whose header carries the proof of work.

use bitcoin::consensus::encode::VarInt;

use super::merkle;
use super::JobError;
use crate::registry::{Algo, ChainConfig};
use crate::template::BlockTemplate;
use crate::u256::U256;

/// Job state for the parent (main) chain.
///
/// Header fields are kept as the little-endian byte strings written into the
/// final 80-byte header. The coinbase halves are spliced in by the composite
/// job once the merge-mining blob is known.
#[derive(Debug, Clone)]
pub struct MainChainJob {
    pub(crate) chain: ChainConfig,
    pub(crate) subsidy: i64,
    pub(crate) height: i64,

    pub(crate) bits: [u8; 4],
    pub(crate) time: [u8; 4],
    pub(crate) version: [u8; 4],
    pub(crate) prev_block_hash: [u8; 32],
    pub(crate) coinbase1: Vec<u8>,
    pub(crate) coinbase2: Vec<u8>,
    pub(crate) merkle_branch: Vec<[u8; 32]>,

    pub(crate) target: U256,
    pub(crate) transactions: Vec<Vec<u8>>,

    pub(crate) clean_jobs: bool,
}

impl MainChainJob {
    pub(crate) fn new(
        template: &BlockTemplate,
        chain: &ChainConfig,
        algo: &Algo,
    ) -> Result<Self, JobError> {
        let version = chain.algo_version(template.version(), algo.name());
        Ok(Self {
            chain: chain.clone(),
            subsidy: template.coinbase_value(),
            height: template.height(),
            bits: template.bits(),
            time: template.curtime().to_le_bytes(),
            version: version.to_le_bytes(),
            prev_block_hash: template.prev_block_hash(),
            coinbase1: Vec::new(),
            coinbase2: Vec::new(),
            merkle_branch: merkle::coinbase_branch(&template.tx_hashes()),
            target: template.target(),
            transactions: template
                .transactions()
                .iter()
                .map(|tx| tx.raw().to_vec())
                .collect(),
            clean_jobs: true,
        })
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn target(&self) -> U256 {
        self.target
    }

    pub fn clean_jobs(&self) -> bool {
        self.clean_jobs
    }

    /// Assemble the 80-byte header for a nonce and coinbase hash, folding
    /// the coinbase hash up the transaction merkle branch.
    pub(crate) fn block_header(&self, nonce: [u8; 4], coinbase_hash: [u8; 32]) -> Vec<u8> {
        let root = merkle::fold_coinbase(coinbase_hash, &self.merkle_branch);
        let mut header = Vec::with_capacity(80);
        header.extend_from_slice(&self.version);
        header.extend_from_slice(&self.prev_block_hash);
        header.extend_from_slice(&root);
        header.extend_from_slice(&self.time);
        header.extend_from_slice(&self.bits);
        header.extend_from_slice(&nonce);
        header
    }

    /// Serialize the full block for daemon submission.
    pub(crate) fn block_bytes(&self, header: &[u8], coinbase: &[u8]) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(header);
        block.extend_from_slice(&bitcoin::consensus::serialize(&VarInt(
            self.transactions.len() as u64 + 1,
        )));
        block.extend_from_slice(coinbase);
        for tx in &self.transactions {
            block.extend_from_slice(tx);
        }
        block
    }
}
