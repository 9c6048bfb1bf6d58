//! Miner solution submissions and their outcomes.

use std::collections::HashMap;

use crate::u256::U256;

/// A miner-submitted solution, in one of the shapes the stratum protocols
/// produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solve {
    /// Classic stratum submission: the miner rolled extranonce2 and the
    /// 32-bit header nonce.
    Extranonce {
        extranonce1: Vec<u8>,
        extranonce2: Vec<u8>,
        n_time: Vec<u8>,
        nonce: [u8; 4],
    },
    /// Equihash-style submission carrying the solution bytes and a split
    /// nonce.
    Solution {
        nonce1: Vec<u8>,
        nonce2: Vec<u8>,
        n_time: Vec<u8>,
        solution: Vec<u8>,
    },
}

impl Solve {
    /// Deterministic duplicate-share key over the submission's variable
    /// fields. The stratum layer rejects resubmissions with an equal key.
    pub fn key(&self) -> Vec<u8> {
        let mut key = Vec::new();
        match self {
            Self::Extranonce {
                extranonce1,
                extranonce2,
                n_time,
                nonce,
            } => {
                key.extend_from_slice(extranonce2);
                key.extend_from_slice(extranonce1);
                key.extend_from_slice(n_time);
                key.extend_from_slice(nonce);
            }
            Self::Solution {
                nonce2,
                n_time,
                solution,
                ..
            } => {
                key.extend_from_slice(nonce2);
                key.extend_from_slice(solution);
                key.extend_from_slice(n_time);
            }
        }
        key
    }
}

/// A block solved on one chain, ready for daemon submission.
#[derive(Debug, Clone)]
pub struct BlockSolve {
    /// Serialized block bytes as the daemon expects them
    pub data: Vec<u8>,
    /// Hash of the coinbase credited by this block
    pub coinbase_hash: [u8; 32],
    /// Block subsidy in base units
    pub subsidy: i64,
    pub height: i64,
    /// Proof-of-work hash as a 256-bit integer
    pub pow_hash: U256,
    /// Network target the hash met
    pub target: U256,
    /// Name of the algorithm that produced the hash
    pub algo: String,
    /// Payout address credited by the coinbase
    pub subsidy_address: String,
}

/// Result of verifying one submission against every chain in a job.
#[derive(Debug, Clone, Default)]
pub struct SolveOutcome {
    /// Solved chains by currency code
    pub solves: HashMap<String, BlockSolve>,
    /// Whether the submission met the pool share target
    pub valid_share: bool,
    /// Every chain the submission was checked against
    pub chains: Vec<String>,
}
