#![warn(missing_docs)]

//! BrightChain storage subsystem: whitened block storage (BLAKE3-512), hierarchical CBLs, pool isolation
//!
//! Write path: File → Blocks → Whiten (XOR tuples) → Pool → CBL (Regular | Sub + Super) → Whitened CBL → Magnet URL
//! Read path:  Magnet URL → Whitened CBL → Reconstruct leaves → De-whiten tuples → File

pub mod backend;
pub mod capacity;
pub mod cbl;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod file;
pub mod magnet;
pub mod parity;
pub mod pool;
pub mod pooled_store;
pub mod random;
pub mod reconstruction;
pub mod whitening;

pub use backend::{BlockStore, MemoryBlockStore};
pub use capacity::{
    calculate_cbl_overhead, calculate_cbl_size, calculate_max_block_references,
    calculate_max_sub_cbl_references, requires_super_cbl, CblExtraFields,
    BYTES_PER_BLOCK_REFERENCE, BYTES_PER_SUB_CBL_REFERENCE,
};
pub use cbl::{CblData, CblKind, CblV1, RegularCbl, SubCbl, SuperCbl};
pub use checksum::{blake3_512, Blake3Checksum, BlockId, ChecksumService};
pub use codec::{encode_cbl_payload, parse_cbl_data, serialize_cbl, CblInput};
pub use config::StoreConfig;
pub use error::{CblLevel, StoreError, StoreResult};
pub use file::{retrieve_file, retrieve_file_by_magnet, store_file, StoredFile};
pub use magnet::CblAddress;
pub use pool::{BlockPage, PoolDeletionValidationResult, PoolId, PoolStats, StorageKey};
pub use pooled_store::{PoolRetriever, PooledBlockStore, WhitenedCbl};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use reconstruction::{
    Reconstruction, ReconstructionConfig, ReconstructionEngine, ReconstructionState,
    SubCblRetriever,
};
pub use whitening::{
    combine, decombine, WhitenedTuple, Whitener, WhitenerOrigin, WhitenerPlan, WhitenerSource,
    WhiteningConfig, WhiteningEngine,
};
