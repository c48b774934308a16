//! Error types for the BrightChain block store.

use std::fmt;

use thiserror::Error;

use crate::checksum::BlockId;
use crate::pool::PoolId;

/// Result type alias for block store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Position in a CBL hierarchy where a failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CblLevel {
    /// The CBL handed to the caller's operation.
    TopLevel,
    /// A nested CBL reached through its sub-CBL address.
    SubCbl {
        /// Magnet address of the failing node.
        address: String,
    },
}

impl fmt::Display for CblLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CblLevel::TopLevel => write!(f, "top-level CBL"),
            CblLevel::SubCbl { address } => write!(f, "sub-CBL {}", address),
        }
    }
}

/// Error variants for block store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Pool identifier does not match `[a-zA-Z0-9_-]{1,64}`.
    #[error("Invalid pool id: {0:?}")]
    InvalidPoolId(String),

    /// Input could not be decoded as a CBL.
    #[error("Invalid CBL encoding: {0}")]
    InvalidCblEncoding(String),

    /// The CBL carries a version this crate does not understand.
    #[error("Unsupported CBL version: {0}")]
    UnsupportedCblVersion(u64),

    /// Resolved leaf count differs from the count declared by the node.
    #[error("Block count mismatch at {level}: expected {expected}, got {actual}")]
    BlockCountMismatch {
        /// Count declared by the CBL.
        expected: u64,
        /// Count actually resolved.
        actual: u64,
        /// Hierarchy level that declared the count.
        level: CblLevel,
    },

    /// The requested block is not present in the pool.
    #[error("Block {block} not found in pool {pool}")]
    BlockNotFoundInPool {
        /// Pool that was searched.
        pool: PoolId,
        /// Missing block.
        block: BlockId,
    },

    /// Pool deletion was rejected because CBLs in other pools depend on it.
    #[error("Pool {pool} has dependents: {dependent_pools:?}")]
    PoolHasDependents {
        /// Pool whose deletion was requested.
        pool: PoolId,
        /// Pools holding CBLs that reference blocks in `pool`.
        dependent_pools: Vec<PoolId>,
    },

    /// Not enough cached material in the pool and fresh generation is disabled.
    #[error("Insufficient whitener material in pool {pool}: requested {requested}, available {available}")]
    InsufficientWhitenerMaterial {
        /// Pool the whiteners were drawn from.
        pool: PoolId,
        /// Number of cached whiteners requested.
        requested: usize,
        /// Number of suitable blocks the pool holds.
        available: usize,
    },

    /// Reconstruction aborted for a reason other than a count mismatch.
    #[error("Reconstruction failed at {level}: {reason}")]
    ReconstructionFailed {
        /// Hierarchy level that failed.
        level: CblLevel,
        /// Description of the failure.
        reason: String,
    },

    /// A configuration value is outside its allowed bounds.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// XOR operands of different lengths.
    #[error("Block size mismatch: expected {expected} bytes, got {actual}")]
    BlockSizeMismatch {
        /// Length of the data block.
        expected: usize,
        /// Length of the offending operand.
        actual: usize,
    },

    /// Serialized CBL does not fit in a single block.
    #[error("CBL of {size} bytes exceeds block size {block_size}")]
    CblExceedsBlockSize {
        /// Serialized size including the length prefix.
        size: usize,
        /// Block size the CBL must fit in.
        block_size: usize,
    },

    /// Malformed sub-CBL magnet address.
    #[error("Invalid magnet URL: {0}")]
    InvalidMagnetUrl(String),

    /// Reed-Solomon parity encode or reconstruct failed.
    #[error("Erasure coding failed: {0}")]
    ErasureCoding(String),

    /// Failure reported by the backing block store.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Config file could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Wraps standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
