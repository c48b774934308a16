//! Block whitening: XOR-combining data blocks with random whitener blocks
//!
//! Whitener material is drawn partly from blocks already in the target pool
//! and partly from fresh CSPRNG output. The split is a tunable heuristic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::checksum::BlockId;
use crate::error::{StoreError, StoreResult};
use crate::pool::PoolId;
use crate::random::RandomSource;

/// Configuration for whitener selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteningConfig {
    /// Whiteners combined with each data block.
    pub whiteners_per_block: usize,
    /// Lower bound for `whiteners_per_block`.
    pub min_whiteners: usize,
    /// Upper bound for `whiteners_per_block`.
    pub max_whiteners: usize,
    /// Fraction of whiteners reused from the pool, in `[0, 1]`.
    pub cached_ratio: f64,
    /// Allow generating fresh random whiteners.
    pub allow_fresh: bool,
}

impl Default for WhiteningConfig {
    fn default() -> Self {
        Self {
            whiteners_per_block: 2,
            min_whiteners: 2,
            max_whiteners: 5,
            cached_ratio: 0.7,
            allow_fresh: true,
        }
    }
}

impl WhiteningConfig {
    /// Check tuple bounds and the cache ratio.
    pub fn validate(&self) -> StoreResult<()> {
        if self.min_whiteners == 0 {
            return Err(StoreError::InvalidConfiguration(
                "min_whiteners must be at least 1".to_string(),
            ));
        }
        if self.min_whiteners > self.max_whiteners {
            return Err(StoreError::InvalidConfiguration(format!(
                "min_whiteners {} exceeds max_whiteners {}",
                self.min_whiteners, self.max_whiteners
            )));
        }
        if self.whiteners_per_block < self.min_whiteners
            || self.whiteners_per_block > self.max_whiteners
        {
            return Err(StoreError::InvalidConfiguration(format!(
                "whiteners_per_block {} outside [{}, {}]",
                self.whiteners_per_block, self.min_whiteners, self.max_whiteners
            )));
        }
        if !(0.0..=1.0).contains(&self.cached_ratio) {
            return Err(StoreError::InvalidConfiguration(format!(
                "cached_ratio {} outside [0, 1]",
                self.cached_ratio
            )));
        }
        Ok(())
    }
}

/// XOR-fold `data` with every whitener. Order-independent and self-inverse.
pub fn combine<W: AsRef<[u8]>>(data: &[u8], whiteners: &[W]) -> StoreResult<Vec<u8>> {
    let mut out = data.to_vec();
    for whitener in whiteners {
        let whitener = whitener.as_ref();
        if whitener.len() != out.len() {
            return Err(StoreError::BlockSizeMismatch {
                expected: out.len(),
                actual: whitener.len(),
            });
        }
        out.iter_mut().zip(whitener).for_each(|(o, w)| *o ^= w);
    }
    Ok(out)
}

/// Undo [`combine`]; the same XOR fold.
pub fn decombine<W: AsRef<[u8]>>(stored: &[u8], whiteners: &[W]) -> StoreResult<Vec<u8>> {
    combine(stored, whiteners)
}

/// Where a whitener came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitenerOrigin {
    /// Reused from blocks already in the pool.
    Cached,
    /// Freshly generated and written to the pool.
    Fresh,
}

/// A whitener block and its pool id.
#[derive(Debug, Clone)]
pub struct Whitener {
    /// Block id in the pool.
    pub id: BlockId,
    /// Block content.
    pub data: Vec<u8>,
    /// Whether it was reused or generated.
    pub origin: WhitenerOrigin,
}

impl AsRef<[u8]> for Whitener {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// A whitened data block: the stored block followed by its whiteners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitenedTuple {
    /// Id of the stored (XOR-combined) block.
    pub stored: BlockId,
    /// Ids of the whiteners, in combination order.
    pub whiteners: Vec<BlockId>,
}

impl WhitenedTuple {
    /// Flatten as `[stored, w1, .., wn]`, the order used in CBL leaf lists.
    pub fn block_ids(&self) -> Vec<BlockId> {
        let mut ids = Vec::with_capacity(1 + self.whiteners.len());
        ids.push(self.stored);
        ids.extend_from_slice(&self.whiteners);
        ids
    }
}

/// How many whiteners to take from each origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitenerPlan {
    /// Target number of cached whiteners.
    pub cached: usize,
    /// Target number of fresh whiteners.
    pub fresh: usize,
}

/// Pool-scoped access to whitener candidates and block persistence.
#[async_trait]
pub trait WhitenerSource: Send + Sync {
    /// Up to `count` random blocks of exactly `block_size` bytes, drawn only from `pool`.
    async fn cached_whiteners(
        &self,
        pool: &PoolId,
        block_size: usize,
        count: usize,
    ) -> StoreResult<Vec<(BlockId, Vec<u8>)>>;

    /// Write a block into `pool`, returning its id.
    async fn store_block(&self, pool: &PoolId, data: Vec<u8>) -> StoreResult<BlockId>;
}

/// Whitening engine: sources whiteners and produces whitened tuples.
pub struct WhiteningEngine {
    config: WhiteningConfig,
    random: Arc<dyn RandomSource>,
}

impl WhiteningEngine {
    /// Create an engine; fails if the config violates its bounds.
    pub fn new(config: WhiteningConfig, random: Arc<dyn RandomSource>) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self { config, random })
    }

    /// Access engine configuration
    pub fn config(&self) -> &WhiteningConfig {
        &self.config
    }

    /// Split `count` whiteners between cached and fresh material.
    pub fn plan(&self, count: usize) -> WhitenerPlan {
        let cached = if self.config.allow_fresh {
            ((count as f64) * self.config.cached_ratio).floor() as usize
        } else {
            count
        };
        WhitenerPlan {
            cached: cached.min(count),
            fresh: count - cached.min(count),
        }
    }

    /// Pick `count` whiteners of `block_size` bytes for `pool`.
    /// Any shortfall in cached material is covered with fresh blocks when allowed.
    #[instrument(skip(self, source, pool), fields(pool = %pool))]
    pub async fn select_whiteners<S: WhitenerSource + ?Sized>(
        &self,
        source: &S,
        pool: &PoolId,
        block_size: usize,
        count: usize,
    ) -> StoreResult<Vec<Whitener>> {
        let plan = self.plan(count);
        let cached = if plan.cached > 0 {
            source.cached_whiteners(pool, block_size, plan.cached).await?
        } else {
            Vec::new()
        };

        if cached.len() < plan.cached && !self.config.allow_fresh {
            return Err(StoreError::InsufficientWhitenerMaterial {
                pool: pool.clone(),
                requested: plan.cached,
                available: cached.len(),
            });
        }

        let mut whiteners: Vec<Whitener> = cached
            .into_iter()
            .map(|(id, data)| Whitener {
                id,
                data,
                origin: WhitenerOrigin::Cached,
            })
            .collect();
        let reused = whiteners.len();

        while whiteners.len() < count {
            let data = self.random.random_block(block_size);
            let id = source.store_block(pool, data.clone()).await?;
            whiteners.push(Whitener {
                id,
                data,
                origin: WhitenerOrigin::Fresh,
            });
        }

        debug!(
            reused,
            fresh = count - reused,
            block_size,
            "selected whiteners"
        );
        Ok(whiteners)
    }

    /// Whiten one data block into `pool` with the configured tuple size.
    pub async fn whiten_block<S: WhitenerSource + ?Sized>(
        &self,
        source: &S,
        pool: &PoolId,
        data: &[u8],
    ) -> StoreResult<WhitenedTuple> {
        let whiteners = self
            .select_whiteners(source, pool, data.len(), self.config.whiteners_per_block)
            .await?;
        let stored = combine(data, &whiteners)?;
        let stored = source.store_block(pool, stored).await?;
        Ok(WhitenedTuple {
            stored,
            whiteners: whiteners.into_iter().map(|w| w.id).collect(),
        })
    }

    /// Seed `pool` with `count` fresh random blocks so first writes have
    /// cached material to draw from.
    #[instrument(skip(self, source, pool), fields(pool = %pool))]
    pub async fn bootstrap_pool<S: WhitenerSource + ?Sized>(
        &self,
        source: &S,
        pool: &PoolId,
        block_size: usize,
        count: usize,
    ) -> StoreResult<Vec<BlockId>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let block = self.random.random_block(block_size);
            ids.push(source.store_block(pool, block).await?);
        }
        debug!(count, block_size, "bootstrapped pool");
        Ok(ids)
    }

    /// Random filler for padding a partial block.
    pub fn random_fill(&self, dest: &mut [u8]) {
        self.random.fill_bytes(dest);
    }
}
