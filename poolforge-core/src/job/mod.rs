//! Mining jobs.
//!
//! A [`Job`] binds one main-chain template to any number of AuxPoW templates
//! sharing its proof of work. Construction packs the aux chains into the
//! blockchain merkle tree, splices the merge-mining commitment into the main
//! coinbase, and precomputes everything submission checking needs. Jobs are
//! immutable once published: a template refresh builds a new job and the
//! stratum layer swaps its current-job reference.

use std::collections::HashMap;

use bitcoin::hashes::{sha256d, Hash};
use serde_json::{json, Value};
use thiserror::Error;

use crate::registry::{Algo, AlgoError, Registry, RegistryError};
use crate::template::{BlockTemplate, TemplateError, TemplateKey, TemplateType};
use crate::tracing::prelude::*;
use crate::u256::U256;

mod aux_chain;
mod coinbase;
mod main_chain;
mod merkle;
mod packer;
mod solve;

#[cfg(test)]
pub(crate) mod test_templates;

pub use aux_chain::AuxChainJob;
pub use coinbase::{EXTRANONCE1_SIZE, EXTRANONCE2_SIZE, EXTRANONCE_SIZE};
pub use main_chain::MainChainJob;
pub use packer::PackerError;
pub use solve::{BlockSolve, Solve, SolveOutcome};

/// Merge-mining magic marker preceding the merkle commitment in the parent
/// coinbase scriptSig.
const MERGE_MINING_MAGIC: [u8; 4] = [0xfa, 0xbe, b'm', b'm'];

/// Errors aborting job construction. No partially built job is ever
/// exposed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("only one main chain template is allowed")]
    DuplicateMainChain,

    #[error("a main chain template is required")]
    MissingMainChain,

    #[error("aux template for {currency} has a null chain ID")]
    NullChainId { currency: String },

    #[error("aux chains {0} and {1} share chain ID {2}")]
    DuplicateChainId(String, String, u32),

    #[error(transparent)]
    Packer(#[from] PackerError),
}

/// Errors from submission verification. These are per-submission and do not
/// taint the job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SolveError {
    #[error(transparent)]
    PowHash(#[from] AlgoError),
}

/// Outcome of re-evaluating a job against the previously published heights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushDecision {
    /// Some chain's height went backward: the templates are stale and the
    /// job must be discarded.
    Stale,
    /// Publish the job; `heights` become the new reference heights.
    Publish { heights: HashMap<String, i64> },
}

/// A composed merge-mining job.
#[derive(Debug, Clone)]
pub struct Job {
    main: MainChainJob,
    aux_chains: Vec<AuxChainJob>,
    algo: Algo,
    heights: HashMap<String, i64>,
}

impl Job {
    /// Build a job from one main and any number of aux templates.
    pub fn from_templates(
        registry: &Registry,
        templates: &HashMap<TemplateKey, Vec<u8>>,
        algo: &Algo,
    ) -> Result<Self, JobError> {
        let mut main: Option<(MainChainJob, BlockTemplate)> = None;
        let mut aux_chains: Vec<AuxChainJob> = Vec::new();
        let mut heights = HashMap::new();

        for (key, raw) in templates {
            let template = BlockTemplate::from_bytes(raw)?;
            let chain = registry.chain(&key.currency)?;
            debug!(
                currency = %chain.code(),
                template_type = ?key.template_type,
                height = template.height(),
                "ingesting template"
            );
            match key.template_type {
                TemplateType::Aux => {
                    let aux = AuxChainJob::new(&template, chain, algo)?;
                    heights.insert(chain.code().to_string(), aux.height());
                    aux_chains.push(aux);
                }
                TemplateType::Main => {
                    if main.is_some() {
                        return Err(JobError::DuplicateMainChain);
                    }
                    let job = MainChainJob::new(&template, chain, algo)?;
                    heights.insert(chain.code().to_string(), job.height());
                    main = Some((job, template));
                }
            }
        }
        let (mut main, main_template) = main.ok_or(JobError::MissingMainChain)?;

        for (i, a) in aux_chains.iter().enumerate() {
            for b in &aux_chains[i + 1..] {
                if a.chain_id() == b.chain_id() {
                    return Err(JobError::DuplicateChainId(
                        a.chain().code().to_string(),
                        b.chain().code().to_string(),
                        a.chain_id(),
                    ));
                }
            }
        }

        let mm_blob = Self::merge_mining_blob(&mut aux_chains)?;
        let split = coinbase::build_split(&main_template, main.chain(), &mm_blob)?;
        main.coinbase1 = split.coinbase1;
        main.coinbase2 = split.coinbase2;

        info!(
            chain = %main.chain().code(),
            height = main.height(),
            aux_chains = aux_chains.len(),
            algo = %algo.name(),
            "constructed job"
        );
        Ok(Self {
            main,
            aux_chains,
            algo: algo.clone(),
            heights,
        })
    }

    /// Pack the aux chains and compose the merge-mining blob for the parent
    /// coinbase. Empty when there are no aux chains.
    fn merge_mining_blob(aux_chains: &mut [AuxChainJob]) -> Result<Vec<u8>, JobError> {
        if aux_chains.is_empty() {
            return Ok(Vec::new());
        }
        let leaves: Vec<(u32, [u8; 32])> = aux_chains
            .iter()
            .map(|aux| (aux.chain_id(), aux.header_hash()))
            .collect();
        let base = packer::pack(&leaves)?;
        for aux in aux_chains.iter_mut() {
            let (branch, mask) = merkle::slot_branch(&base.slots, &aux.header_hash());
            aux.blockchain_merkle_branch = branch;
            aux.blockchain_merkle_mask = mask;
        }

        // Committed root in big-endian display order; a lone aux chain
        // commits its header hash directly.
        let mut commitment = if aux_chains.len() > 1 {
            merkle::base_root(&base.slots)
        } else {
            aux_chains[0].header_hash()
        };
        commitment.reverse();

        let mut blob = Vec::with_capacity(44);
        blob.extend_from_slice(&MERGE_MINING_MAGIC);
        blob.extend_from_slice(&commitment);
        blob.extend_from_slice(&base.size.to_le_bytes());
        blob.extend_from_slice(&base.nonce.to_le_bytes());
        Ok(blob)
    }

    pub fn main(&self) -> &MainChainJob {
        &self.main
    }

    pub fn aux_chains(&self) -> &[AuxChainJob] {
        &self.aux_chains
    }

    pub fn algo(&self) -> &Algo {
        &self.algo
    }

    /// Published heights by currency code.
    pub fn heights(&self) -> &HashMap<String, i64> {
        &self.heights
    }

    pub fn clean_jobs(&self) -> bool {
        self.main.clean_jobs
    }

    /// Decide whether this job supersedes the previously published heights.
    ///
    /// A height regression on any chain marks the job stale. A main-chain
    /// advance, or an advance on an aux chain configured with `flush_aux`,
    /// promotes the job to clean (miners must abandon outstanding work).
    pub fn set_flush(&mut self, prev_heights: &HashMap<String, i64>) -> FlushDecision {
        for (code, height) in &self.heights {
            if let Some(prev) = prev_heights.get(code) {
                if height < prev {
                    warn!(chain = %code, height, prev, "stale template, dropping job");
                    return FlushDecision::Stale;
                }
            }
        }

        let prev_main = prev_heights
            .get(self.main.chain().code())
            .copied()
            .unwrap_or(0);
        if self.main.height() > prev_main {
            debug!(chain = %self.main.chain().code(), "main height advanced, flushing");
            self.main.clean_jobs = true;
        } else {
            for aux in &self.aux_chains {
                let prev = prev_heights.get(aux.chain().code()).copied().unwrap_or(0);
                if aux.chain().flush_aux() && aux.height() > prev {
                    debug!(chain = %aux.chain().code(), "aux height advanced, flushing");
                    self.main.clean_jobs = true;
                    break;
                }
            }
        }
        FlushDecision::Publish {
            heights: self.heights.clone(),
        }
    }

    /// Classic `mining.notify` parameter tail; the stratum layer prepends
    /// its job ID.
    pub fn stratum_params(&self) -> Vec<Value> {
        let branch: Vec<String> = self
            .main
            .merkle_branch
            .iter()
            .map(hex::encode)
            .collect();
        vec![
            json!(hex::encode(self.main.prev_block_hash)),
            json!(hex::encode(&self.main.coinbase1)),
            json!(hex::encode(&self.main.coinbase2)),
            json!(branch),
            json!(hex::encode(self.main.version)),
            json!(hex::encode(self.main.bits)),
            json!(hex::encode(self.main.time)),
            json!(self.main.clean_jobs),
        ]
    }

    /// JSON-RPC-2 (Monero-family) blob parameters.
    ///
    /// Those miners do not pick extranonces, so extranonce2 is fixed to four
    /// zero bytes and the nonce region ships zeroed inside the 76-byte
    /// hashing blob.
    pub fn stratum2_params(&self, extranonce1: &[u8]) -> Value {
        let mut cb = self.main.coinbase1.clone();
        cb.extend_from_slice(extranonce1);
        cb.extend_from_slice(&[0u8; EXTRANONCE2_SIZE]);
        cb.extend_from_slice(&self.main.coinbase2);
        let coinbase_hash = sha256d::Hash::hash(&cb).to_byte_array();
        let header = self.main.block_header([0u8; 4], coinbase_hash);
        json!({ "blob": hex::encode(&header[..76]) })
    }

    /// ZCash-style notify parameters.
    ///
    /// The coinbase is finalized with a zeroed extranonce slot, so the
    /// merkle root is fixed and miners roll only the header nonce and
    /// solution.
    pub fn zcash_stratum_params(&self) -> Vec<Value> {
        let mut cb = self.main.coinbase1.clone();
        cb.extend_from_slice(&[0u8; EXTRANONCE_SIZE]);
        cb.extend_from_slice(&self.main.coinbase2);
        let coinbase_hash = sha256d::Hash::hash(&cb).to_byte_array();
        let root = merkle::fold_coinbase(coinbase_hash, &self.main.merkle_branch);
        vec![
            json!(hex::encode(self.main.version)),
            json!(hex::encode(self.main.prev_block_hash)),
            json!(hex::encode(root)),
            json!(hex::encode([0u8; 32])),
            json!(hex::encode(self.main.time)),
            json!(hex::encode(self.main.bits)),
            json!(self.main.clean_jobs),
        ]
    }

    /// Verify a submission against the share target and every chain's
    /// network target.
    pub fn check_solves(
        &self,
        solve: &Solve,
        share_target: Option<&U256>,
    ) -> Result<SolveOutcome, SolveError> {
        match solve {
            Solve::Extranonce {
                extranonce1,
                extranonce2,
                nonce,
                ..
            } => {
                let mut cb = self.main.coinbase1.clone();
                cb.extend_from_slice(extranonce1);
                cb.extend_from_slice(extranonce2);
                cb.extend_from_slice(&self.main.coinbase2);
                let coinbase_hash = sha256d::Hash::hash(&cb).to_byte_array();
                // The job's stored time goes into the header; a rolled
                // n_time is accepted upstream but not serialized here.
                let header = self.main.block_header(*nonce, coinbase_hash);
                let pow = self.algo.pow_hash(&header)?;
                Ok(self.evaluate(&header, &cb, coinbase_hash, pow, share_target))
            }
            Solve::Solution {
                nonce1,
                nonce2,
                n_time,
                solution,
            } => {
                let mut cb = self.main.coinbase1.clone();
                cb.extend_from_slice(&[0u8; EXTRANONCE_SIZE]);
                cb.extend_from_slice(&self.main.coinbase2);
                let coinbase_hash = sha256d::Hash::hash(&cb).to_byte_array();
                let root = merkle::fold_coinbase(coinbase_hash, &self.main.merkle_branch);

                let mut header = Vec::new();
                header.extend_from_slice(&self.main.version);
                header.extend_from_slice(&self.main.prev_block_hash);
                header.extend_from_slice(&root);
                header.extend_from_slice(&[0u8; 32]);
                header.extend_from_slice(n_time);
                header.extend_from_slice(&self.main.bits);
                header.extend_from_slice(nonce1);
                header.extend_from_slice(nonce2);
                header.extend_from_slice(solution);

                // Solution-bearing headers are always checked with sha256d;
                // solution validity itself belongs to the daemon.
                let pow = sha256d::Hash::hash(&header).to_byte_array();
                Ok(self.evaluate(&header, &cb, coinbase_hash, pow, share_target))
            }
        }
    }

    fn evaluate(
        &self,
        header: &[u8],
        coinbase: &[u8],
        coinbase_hash: [u8; 32],
        pow: [u8; 32],
        share_target: Option<&U256>,
    ) -> SolveOutcome {
        let pow_int = U256::from_le_bytes(pow);
        let mut outcome = SolveOutcome::default();

        // Share targets use the inverted comparison vs network targets.
        if let Some(share_target) = share_target {
            if pow_int >= *share_target {
                outcome.valid_share = true;
                debug!(chain = %self.main.chain().code(), "valid share");
            }
        }

        outcome.chains.push(self.main.chain().code().to_string());
        if pow_int <= self.main.target {
            info!(
                chain = %self.main.chain().code(),
                height = self.main.height(),
                "main chain block solve"
            );
            outcome.solves.insert(
                self.main.chain().code().to_string(),
                BlockSolve {
                    data: self.main.block_bytes(header, coinbase),
                    coinbase_hash,
                    subsidy: self.main.subsidy,
                    height: self.main.height(),
                    pow_hash: pow_int,
                    target: self.main.target,
                    algo: self.algo.name().to_string(),
                    subsidy_address: self.main.chain().block_subsidy_address().to_string(),
                },
            );
        }

        for aux in &self.aux_chains {
            outcome.chains.push(aux.chain().code().to_string());
            if pow_int <= aux.target {
                info!(
                    chain = %aux.chain().code(),
                    height = aux.height(),
                    "aux chain block solve"
                );
                outcome.solves.insert(
                    aux.chain().code().to_string(),
                    BlockSolve {
                        data: aux.block_bytes(coinbase, &pow, &self.main.merkle_branch, header),
                        coinbase_hash: aux.coinbase_hash,
                        subsidy: aux.subsidy,
                        height: aux.height(),
                        pow_hash: pow_int,
                        target: aux.target,
                        algo: self.algo.name().to_string(),
                        subsidy_address: aux.chain().block_subsidy_address().to_string(),
                    },
                );
            }
        }
        outcome
    }
}
