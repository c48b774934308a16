//! Pool namespaces, storage keys and per-pool bookkeeping records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::checksum::BlockId;
use crate::error::{StoreError, StoreResult};

/// Maximum pool id length.
pub const MAX_POOL_ID_LEN: usize = 64;

/// Separator between pool and hash in a storage key.
pub const KEY_SEPARATOR: char = ':';

/// Name of the pool that holds unpooled and legacy blocks.
pub const DEFAULT_POOL_NAME: &str = "default";

/// A case-sensitive pool namespace matching `[a-zA-Z0-9_-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PoolId(String);

impl PoolId {
    /// Validate and wrap a pool id.
    pub fn new(id: impl Into<String>) -> StoreResult<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_POOL_ID_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(StoreError::InvalidPoolId(id));
        }
        Ok(PoolId(id))
    }

    /// The reserved `default` pool.
    pub fn default_pool() -> Self {
        PoolId(DEFAULT_POOL_NAME.to_string())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PoolId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoolId::new(s)
    }
}

impl TryFrom<String> for PoolId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PoolId::new(value)
    }
}

impl From<PoolId> for String {
    fn from(id: PoolId) -> Self {
        id.0
    }
}

/// Backing-store key `{pool}:{hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    /// Owning pool.
    pub pool: PoolId,
    /// Content hash.
    pub id: BlockId,
}

impl StorageKey {
    /// Build a key for `id` in `pool`.
    pub fn new(pool: PoolId, id: BlockId) -> Self {
        Self { pool, id }
    }

    /// Parse `{pool}:{hash}`. A key without a separator belongs to `default_pool`.
    pub fn parse(key: &str, default_pool: &PoolId) -> StoreResult<Self> {
        match key.split_once(KEY_SEPARATOR) {
            Some((pool, hash)) => Ok(Self {
                pool: PoolId::new(pool)?,
                id: BlockId::from_hex(hash)?,
            }),
            None => Ok(Self {
                pool: default_pool.clone(),
                id: BlockId::from_hex(key)?,
            }),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pool, KEY_SEPARATOR, self.id)
    }
}

/// Running statistics for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Blocks currently in the pool.
    pub block_count: u64,
    /// Sum of their lengths in bytes.
    pub total_bytes: u64,
    /// First block write.
    pub created_at: DateTime<Utc>,
    /// Most recent read or write.
    pub last_accessed_at: DateTime<Utc>,
}

impl PoolStats {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            block_count: 0,
            total_bytes: 0,
            created_at: now,
            last_accessed_at: now,
        }
    }
}

/// Outcome of checking whether a pool can be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDeletionValidationResult {
    /// True if no other pool depends on blocks in this one.
    pub safe: bool,
    /// Pools whose CBLs reference blocks in this pool.
    pub dependent_pools: Vec<PoolId>,
    /// Blocks in this pool those CBLs reference.
    pub referenced_blocks: Vec<BlockId>,
}

/// One page of a cursor-paginated block listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPage {
    /// Block ids in ascending order.
    pub blocks: Vec<BlockId>,
    /// Pass as the cursor to fetch the next page; `None` on the last page.
    pub next_cursor: Option<BlockId>,
}
