//! Merge-mined job construction and solve verification.
//!
//! This crate is the mining core of a pool sidekick: it turns block
//! templates from one or more coin daemons into [`Job`]s that merge-mine a
//! main chain together with any number of AuxPoW chains, emits the
//! per-miner parameters the stratum wire protocols need, and verifies
//! submitted solutions against per-share and per-network targets.
//!
//! # Architecture
//!
//! - [`registry`]: initialize-once tables of chain parameters, share chains,
//!   and proof-of-work algorithms
//! - [`template`]: parsed `getblocktemplate` / `getblocktemplate_aux`
//!   payloads
//! - [`job`]: the composite [`Job`] plus its per-chain parts, the
//!   blockchain-merkle packer, and submission verification
//!
//! Template fetching, stratum connection handling, and persistence of
//! accepted work live in collaborating services; the core is pure CPU and
//! every published job is immutable, so submission checking runs lock-free
//! from any number of workers.
//!
//! # Usage
//!
//! ```ignore
//! use poolforge_core::{Job, Registry, Solve, TemplateKey, TemplateType};
//!
//! let registry = Registry::from_config(config)?;
//! let algo = registry.algo("sha256d")?;
//!
//! // One main template plus aux templates, as fetched from the daemons
//! let job = Job::from_templates(&registry, &templates, algo)?;
//!
//! // Publish to miners
//! let params = job.stratum_params();
//!
//! // Check a submission
//! let outcome = job.check_solves(&solve, Some(&share_target))?;
//! ```

pub mod job;
pub mod registry;
pub mod template;
pub mod tracing;
pub mod types;
pub mod u256;

pub use job::{
    AuxChainJob, BlockSolve, FlushDecision, Job, JobError, MainChainJob, Solve, SolveError,
    SolveOutcome,
};
pub use registry::{Algo, ChainConfig, Registry, RegistryConfig, RegistryError};
pub use template::{BlockTemplate, TemplateError, TemplateKey, TemplateType};
pub use u256::U256;
