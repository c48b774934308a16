//! Pool-scoped block store.
//!
//! Every block lives in exactly one pool namespace. Whitener material for a
//! pool is drawn only from that pool, and deleting a pool is gated on CBLs in
//! other pools that still reference its blocks.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::backend::{BlockStore, MemoryBlockStore};
use crate::cbl::CblData;
use crate::checksum::{Blake3Checksum, BlockId, ChecksumService};
use crate::codec::{encode_cbl_payload, parse_cbl_data};
use crate::config::StoreConfig;
use crate::error::{CblLevel, StoreError, StoreResult};
use crate::magnet::CblAddress;
use crate::parity::{encode_parity, recover_components};
use crate::pool::{BlockPage, PoolDeletionValidationResult, PoolId, PoolStats, StorageKey};
use crate::random::{RandomSource, ThreadRandom};
use crate::reconstruction::{Reconstruction, ReconstructionEngine, SubCblRetriever};
use crate::whitening::{combine, WhitenedTuple, WhitenerSource, WhiteningEngine};

/// A CBL stored as two whitened component blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitenedCbl {
    /// Components needed to rebuild the CBL.
    pub address: CblAddress,
    /// Optional Reed-Solomon parity blocks over the components.
    pub parity: Vec<BlockId>,
}

impl WhitenedCbl {
    /// The address as a magnet URL.
    pub fn magnet_url(&self) -> String {
        self.address.to_magnet_url()
    }
}

struct PoolIndex {
    blocks: BTreeMap<BlockId, u64>,
    stats: PoolStats,
}

impl PoolIndex {
    fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            stats: PoolStats::new(Utc::now()),
        }
    }

    fn remove_block(&mut self, id: &BlockId) -> bool {
        match self.blocks.remove(id) {
            Some(len) => {
                self.stats.block_count -= 1;
                self.stats.total_bytes -= len;
                true
            }
            None => false,
        }
    }
}

/// References held by one whitened CBL, keyed by `(pool, b1)`.
struct CblRecord {
    b2: BlockId,
    references: Vec<BlockId>,
}

#[derive(Default)]
struct StoreIndex {
    pools: HashMap<PoolId, PoolIndex>,
    /// Block hash -> pools holding CBLs that reference it, with reference counts.
    referencing_pools: HashMap<BlockId, BTreeMap<PoolId, u64>>,
    /// (pool, whitened CBL block) -> what that CBL references.
    cbl_records: HashMap<(PoolId, BlockId), CblRecord>,
    /// (pool, whitened CBL block) -> parity blocks written for that CBL.
    cbl_parity: HashMap<(PoolId, BlockId), Vec<BlockId>>,
}

impl StoreIndex {
    /// Count `references` against `pool` once per `(pool, b1)`.
    fn register_cbl(
        &mut self,
        pool: &PoolId,
        b1: BlockId,
        b2: BlockId,
        references: Vec<BlockId>,
    ) -> bool {
        let key = (pool.clone(), b1);
        if self.cbl_records.contains_key(&key) {
            return false;
        }
        for id in &references {
            *self
                .referencing_pools
                .entry(*id)
                .or_default()
                .entry(pool.clone())
                .or_insert(0) += 1;
        }
        self.cbl_records.insert(key, CblRecord { b2, references });
        true
    }

    /// Drop every CBL in `pool` that has `id` as a component.
    fn forget_cbls_using(&mut self, pool: &PoolId, id: &BlockId) -> usize {
        let keys: Vec<(PoolId, BlockId)> = self
            .cbl_records
            .iter()
            .filter(|((p, b1), record)| p == pool && (b1 == id || record.b2 == *id))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            if let Some(record) = self.cbl_records.remove(key) {
                for referenced in &record.references {
                    self.release(pool, referenced);
                }
            }
        }
        keys.len()
    }

    fn release(&mut self, pool: &PoolId, id: &BlockId) {
        let Some(pools) = self.referencing_pools.get_mut(id) else {
            return;
        };
        if let Some(count) = pools.get_mut(pool) {
            *count -= 1;
            if *count == 0 {
                pools.remove(pool);
            }
        }
        if pools.is_empty() {
            self.referencing_pools.remove(id);
        }
    }

    fn validate_deletion(&self, pool: &PoolId) -> PoolDeletionValidationResult {
        let mut dependent_pools = BTreeSet::new();
        let mut referenced_blocks = Vec::new();
        if let Some(entry) = self.pools.get(pool) {
            for id in entry.blocks.keys() {
                let Some(refs) = self.referencing_pools.get(id) else {
                    continue;
                };
                let mut external = refs.keys().filter(|p| *p != pool).peekable();
                if external.peek().is_some() {
                    dependent_pools.extend(external.cloned());
                    referenced_blocks.push(*id);
                }
            }
        }
        PoolDeletionValidationResult {
            safe: dependent_pools.is_empty(),
            dependent_pools: dependent_pools.into_iter().collect(),
            referenced_blocks,
        }
    }
}

/// Block store partitioned into isolated pools.
pub struct PooledBlockStore {
    backend: Arc<dyn BlockStore>,
    checksum: Arc<dyn ChecksumService>,
    random: Arc<dyn RandomSource>,
    whitening: WhiteningEngine,
    reconstruction: ReconstructionEngine,
    config: StoreConfig,
    index: RwLock<StoreIndex>,
}

impl PooledBlockStore {
    /// Create with BLAKE3 checksums and the thread-local CSPRNG.
    pub fn new(backend: Arc<dyn BlockStore>, config: StoreConfig) -> StoreResult<Self> {
        Self::with_collaborators(
            backend,
            Arc::new(Blake3Checksum),
            Arc::new(ThreadRandom),
            config,
        )
    }

    /// Create over a fresh [`MemoryBlockStore`].
    pub fn in_memory(config: StoreConfig) -> StoreResult<Self> {
        Self::new(Arc::new(MemoryBlockStore::new()), config)
    }

    /// Create with explicit checksum and random collaborators.
    pub fn with_collaborators(
        backend: Arc<dyn BlockStore>,
        checksum: Arc<dyn ChecksumService>,
        random: Arc<dyn RandomSource>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        config.validate()?;
        let whitening = WhiteningEngine::new(config.whitening.clone(), random.clone())?;
        let reconstruction = ReconstructionEngine::new(config.reconstruction.clone())?;
        info!(default_pool = %config.default_pool, "pooled block store ready");
        Ok(Self {
            backend,
            checksum,
            random,
            whitening,
            reconstruction,
            config,
            index: RwLock::new(StoreIndex::default()),
        })
    }

    /// Access store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Pool used by the legacy non-pooled calls.
    pub fn default_pool(&self) -> &PoolId {
        &self.config.default_pool
    }

    /// Access the whitening engine
    pub fn whitening(&self) -> &WhiteningEngine {
        &self.whitening
    }

    /// Parse a raw `{pool}:{hash}` key, mapping unprefixed keys to the default pool.
    pub fn parse_key(&self, key: &str) -> StoreResult<StorageKey> {
        StorageKey::parse(key, &self.config.default_pool)
    }

    fn not_found(pool: &PoolId, id: &BlockId) -> StoreError {
        StoreError::BlockNotFoundInPool {
            pool: pool.clone(),
            block: *id,
        }
    }

    async fn touch(&self, pool: &PoolId) {
        if let Some(entry) = self.index.write().await.pools.get_mut(pool) {
            entry.stats.last_accessed_at = Utc::now();
        }
    }

    /// True if `id` is stored in `pool`.
    pub async fn has_in_pool(&self, pool: &PoolId, id: &BlockId) -> StoreResult<bool> {
        self.backend.has(&StorageKey::new(pool.clone(), *id)).await
    }

    /// Read `id` from `pool`.
    pub async fn get_from_pool(&self, pool: &PoolId, id: &BlockId) -> StoreResult<Bytes> {
        let data = self
            .backend
            .get(&StorageKey::new(pool.clone(), *id))
            .await?
            .ok_or_else(|| Self::not_found(pool, id))?;
        self.touch(pool).await;
        Ok(data)
    }

    /// Write `data` into `pool`, returning its content hash. Identical content
    /// in the same pool is stored once.
    pub async fn put_in_pool(&self, pool: &PoolId, data: impl Into<Bytes>) -> StoreResult<BlockId> {
        let data: Bytes = data.into();
        let id = self.checksum.checksum(&data);

        if let Some(entry) = self.index.write().await.pools.get_mut(pool) {
            if entry.blocks.contains_key(&id) {
                entry.stats.last_accessed_at = Utc::now();
                debug!(pool = %pool, block = ?id, "dedup hit");
                return Ok(id);
            }
        }

        let len = data.len() as u64;
        self.backend
            .put(&StorageKey::new(pool.clone(), id), data)
            .await?;

        let mut index = self.index.write().await;
        let entry = index.pools.entry(pool.clone()).or_insert_with(PoolIndex::new);
        if entry.blocks.insert(id, len).is_none() {
            entry.stats.block_count += 1;
            entry.stats.total_bytes += len;
        }
        entry.stats.last_accessed_at = Utc::now();
        debug!(pool = %pool, block = ?id, size = len, "stored block");
        Ok(id)
    }

    /// Remove `id` from `pool`.
    pub async fn delete_from_pool(&self, pool: &PoolId, id: &BlockId) -> StoreResult<()> {
        let mut index = self.index.write().await;
        if let Some(refs) = index.referencing_pools.get(id) {
            if refs.keys().any(|p| p != pool) {
                warn!(pool = %pool, block = ?id, "deleting block referenced by another pool's CBL");
            }
        }
        let removed = self
            .backend
            .delete(&StorageKey::new(pool.clone(), *id))
            .await?;
        let indexed = index
            .pools
            .get_mut(pool)
            .map(|entry| entry.remove_block(id))
            .unwrap_or(false);
        if !removed && !indexed {
            return Err(Self::not_found(pool, id));
        }
        let dropped = index.forget_cbls_using(pool, id);
        if dropped > 0 {
            debug!(pool = %pool, block = ?id, cbls = dropped, "released references of broken CBLs");
        }
        if index.pools.get(pool).is_some_and(|entry| entry.blocks.is_empty()) {
            index.pools.remove(pool);
            debug!(pool = %pool, "pool emptied");
        }
        Ok(())
    }

    /// Legacy `has`: the default pool.
    pub async fn has(&self, id: &BlockId) -> StoreResult<bool> {
        self.has_in_pool(&self.config.default_pool, id).await
    }

    /// Legacy `get`: the default pool.
    pub async fn get(&self, id: &BlockId) -> StoreResult<Bytes> {
        self.get_from_pool(&self.config.default_pool, id).await
    }

    /// Legacy `put`: the default pool.
    pub async fn put(&self, data: impl Into<Bytes>) -> StoreResult<BlockId> {
        self.put_in_pool(&self.config.default_pool, data).await
    }

    /// Legacy `delete`: the default pool.
    pub async fn delete(&self, id: &BlockId) -> StoreResult<()> {
        self.delete_from_pool(&self.config.default_pool, id).await
    }

    /// All pools holding at least one block, sorted. A pool whose last block
    /// is deleted is no longer listed.
    pub async fn list_pools(&self) -> Vec<PoolId> {
        let mut pools: Vec<PoolId> = self.index.read().await.pools.keys().cloned().collect();
        pools.sort();
        pools
    }

    /// One page of `pool`'s block ids after `cursor`, ascending.
    pub async fn list_blocks_in_pool(
        &self,
        pool: &PoolId,
        cursor: Option<&BlockId>,
        limit: Option<usize>,
    ) -> BlockPage {
        let limit = limit.unwrap_or(self.config.page_size).max(1);
        let index = self.index.read().await;
        let Some(entry) = index.pools.get(pool) else {
            return BlockPage {
                blocks: Vec::new(),
                next_cursor: None,
            };
        };
        let lower = match cursor {
            Some(c) => Bound::Excluded(*c),
            None => Bound::Unbounded,
        };
        let mut blocks: Vec<BlockId> = entry
            .blocks
            .range((lower, Bound::Unbounded))
            .map(|(id, _)| *id)
            .take(limit + 1)
            .collect();
        let next_cursor = if blocks.len() > limit {
            blocks.truncate(limit);
            blocks.last().copied()
        } else {
            None
        };
        BlockPage {
            blocks,
            next_cursor,
        }
    }

    /// Statistics for `pool`, if it exists.
    pub async fn get_pool_stats(&self, pool: &PoolId) -> Option<PoolStats> {
        self.index
            .read()
            .await
            .pools
            .get(pool)
            .map(|entry| entry.stats.clone())
    }

    /// Up to `count` distinct random block ids, drawn only from `pool`.
    pub async fn get_random_blocks_from_pool(&self, pool: &PoolId, count: usize) -> Vec<BlockId> {
        let index = self.index.read().await;
        let Some(entry) = index.pools.get(pool) else {
            return Vec::new();
        };
        let ids: Vec<&BlockId> = entry.blocks.keys().collect();
        self.random
            .sample_indices(ids.len(), count)
            .into_iter()
            .map(|i| *ids[i])
            .collect()
    }

    /// Check whether CBLs in other pools reference blocks in `pool`.
    pub async fn validate_pool_deletion(&self, pool: &PoolId) -> PoolDeletionValidationResult {
        self.index.read().await.validate_deletion(pool)
    }

    /// Delete every block in `pool` unless another pool depends on it.
    /// Validation and deletion run under one exclusive index lock.
    #[instrument(skip(self, pool), fields(pool = %pool))]
    pub async fn delete_pool(&self, pool: &PoolId) -> StoreResult<()> {
        let mut index = self.index.write().await;
        let validation = index.validate_deletion(pool);
        if !validation.safe {
            warn!(
                dependents = ?validation.dependent_pools,
                referenced = validation.referenced_blocks.len(),
                "pool deletion rejected"
            );
            return Err(StoreError::PoolHasDependents {
                pool: pool.clone(),
                dependent_pools: validation.dependent_pools,
            });
        }
        self.purge_pool(&mut index, pool).await
    }

    /// Delete every block in `pool` without checking dependents. CBLs in other
    /// pools that reference these blocks become unreconstructable.
    #[instrument(skip(self, pool), fields(pool = %pool))]
    pub async fn force_delete_pool(&self, pool: &PoolId) -> StoreResult<()> {
        let mut index = self.index.write().await;
        let validation = index.validate_deletion(pool);
        if !validation.safe {
            warn!(
                dependents = ?validation.dependent_pools,
                "force-deleting pool that other pools depend on"
            );
        }
        self.purge_pool(&mut index, pool).await
    }

    async fn purge_pool(&self, index: &mut StoreIndex, pool: &PoolId) -> StoreResult<()> {
        let ids: Vec<BlockId> = match index.pools.get(pool) {
            Some(entry) => entry.blocks.keys().copied().collect(),
            None => {
                debug!("pool does not exist; nothing to delete");
                return Ok(());
            }
        };
        for id in &ids {
            self.backend
                .delete(&StorageKey::new(pool.clone(), *id))
                .await?;
            if let Some(entry) = index.pools.get_mut(pool) {
                entry.remove_block(id);
            }
        }
        index.pools.remove(pool);
        index.referencing_pools.retain(|_, pools| {
            pools.remove(pool);
            !pools.is_empty()
        });
        index.cbl_parity.retain(|(p, _), _| p != pool);
        index.cbl_records.retain(|(p, _), _| p != pool);
        info!(blocks = ids.len(), "pool deleted");
        Ok(())
    }

    /// Seed `pool` with `count` random blocks of `block_size` bytes.
    pub async fn bootstrap_pool(
        &self,
        pool: &PoolId,
        block_size: usize,
        count: usize,
    ) -> StoreResult<Vec<BlockId>> {
        self.whitening
            .bootstrap_pool(self, pool, block_size, count)
            .await
    }

    /// Whiten one data block into `pool`.
    pub async fn whiten_block_in_pool(
        &self,
        pool: &PoolId,
        data: &[u8],
    ) -> StoreResult<WhitenedTuple> {
        self.whitening.whiten_block(self, pool, data).await
    }

    /// Store `cbl` in `pool` as a whitened block plus its whitener, with
    /// `parity_shards` parity blocks (config default when `None`).
    #[instrument(skip(self, pool, cbl), fields(pool = %pool, kind = cbl.kind().as_str()))]
    pub async fn store_cbl_with_whitening_in_pool(
        &self,
        pool: &PoolId,
        cbl: &CblData,
        parity_shards: Option<usize>,
    ) -> StoreResult<WhitenedCbl> {
        cbl.validate()?;
        let block_size = cbl.block_size() as usize;
        let mut payload = encode_cbl_payload(cbl)?;
        if payload.len() > block_size {
            return Err(StoreError::CblExceedsBlockSize {
                size: payload.len(),
                block_size,
            });
        }
        payload.resize(block_size, 0);

        let whitener = self
            .whitening
            .select_whiteners(self, pool, block_size, 1)
            .await?
            .pop()
            .ok_or_else(|| StoreError::InsufficientWhitenerMaterial {
                pool: pool.clone(),
                requested: 1,
                available: 0,
            })?;
        let whitened = combine(&payload, &[&whitener.data])?;

        let parity_shards = parity_shards.unwrap_or(self.config.parity_shards);
        let parity_blocks = encode_parity(&whitened, &whitener.data, parity_shards)?;

        let b1 = self.put_in_pool(pool, whitened).await?;
        let b2 = whitener.id;
        let mut parity = Vec::with_capacity(parity_blocks.len());
        for block in parity_blocks {
            parity.push(self.put_in_pool(pool, block).await?);
        }

        let mut referenced = referenced_blocks(cbl)?;
        referenced.push(b1);
        referenced.push(b2);
        {
            let mut index = self.index.write().await;
            index.register_cbl(pool, b1, b2, referenced);
            if !parity.is_empty() {
                index.cbl_parity.insert((pool.clone(), b1), parity.clone());
            }
        }

        let address = CblAddress::new(cbl.block_size(), b1, b2);
        debug!(address = %address, parity = parity.len(), "stored whitened CBL");
        Ok(WhitenedCbl { address, parity })
    }

    /// Rebuild a CBL from its components in `pool`. When a component is
    /// missing it is recovered from `parity`, or from parity recorded when
    /// the CBL was stored if `parity` is empty.
    #[instrument(skip(self, pool, parity), fields(pool = %pool))]
    pub async fn retrieve_cbl_from_pool(
        &self,
        pool: &PoolId,
        address: &CblAddress,
        parity: &[BlockId],
    ) -> StoreResult<CblData> {
        let b1 = self.fetch(pool, &address.b1).await?;
        let b2 = self.fetch(pool, &address.b2).await?;
        let (b1, b2, recovered) = match (b1, b2) {
            (Some(b1), Some(b2)) => (b1.to_vec(), b2.to_vec(), false),
            (b1, b2) => {
                let (b1, b2) = self.recover_cbl(pool, address, b1, b2, parity).await?;
                (b1, b2, true)
            }
        };
        if b1.len() != address.block_size as usize {
            return Err(StoreError::BlockSizeMismatch {
                expected: address.block_size as usize,
                actual: b1.len(),
            });
        }
        let payload = combine(&b1, &[&b2])?;
        let cbl = parse_cbl_data(payload.as_slice())?;
        if recovered {
            let mut referenced = referenced_blocks(&cbl)?;
            referenced.push(address.b1);
            referenced.push(address.b2);
            self.index
                .write()
                .await
                .register_cbl(pool, address.b1, address.b2, referenced);
        }
        Ok(cbl)
    }

    /// Parse a magnet URL and retrieve the CBL it names.
    pub async fn retrieve_cbl_by_magnet(&self, pool: &PoolId, url: &str) -> StoreResult<CblData> {
        let address = CblAddress::parse(url)?;
        self.retrieve_cbl_from_pool(pool, &address, &[]).await
    }

    /// Resolve `cbl` to its leaf ids, fetching sub-CBLs from `pool` only.
    pub async fn reconstruct_in_pool(
        &self,
        pool: &PoolId,
        cbl: &CblData,
    ) -> StoreResult<Reconstruction> {
        let retriever = PoolRetriever {
            store: self,
            pool: pool.clone(),
        };
        self.reconstruction.reconstruct(cbl, &retriever).await
    }

    async fn fetch(&self, pool: &PoolId, id: &BlockId) -> StoreResult<Option<Bytes>> {
        let data = self
            .backend
            .get(&StorageKey::new(pool.clone(), *id))
            .await?;
        if data.is_some() {
            self.touch(pool).await;
        }
        Ok(data)
    }

    async fn recover_cbl(
        &self,
        pool: &PoolId,
        address: &CblAddress,
        b1: Option<Bytes>,
        b2: Option<Bytes>,
        parity: &[BlockId],
    ) -> StoreResult<(Vec<u8>, Vec<u8>)> {
        let missing: Vec<BlockId> = [(&b1, address.b1), (&b2, address.b2)]
            .iter()
            .filter(|(data, _)| data.is_none())
            .map(|(_, id)| *id)
            .collect();
        let parity_ids = if parity.is_empty() {
            self.index
                .read()
                .await
                .cbl_parity
                .get(&(pool.clone(), address.b1))
                .cloned()
                .unwrap_or_default()
        } else {
            parity.to_vec()
        };
        if parity_ids.is_empty() {
            let block = missing.first().copied().unwrap_or(address.b1);
            return Err(Self::not_found(pool, &block));
        }

        let mut shards: Vec<Option<Vec<u8>>> = vec![b1.map(|b| b.to_vec()), b2.map(|b| b.to_vec())];
        for id in &parity_ids {
            shards.push(self.fetch(pool, id).await?.map(|b| b.to_vec()));
        }
        let (r1, r2) = recover_components(shards)?;

        for (id, data) in [(address.b1, &r1), (address.b2, &r2)] {
            if !missing.contains(&id) {
                continue;
            }
            if !self.checksum.validate(data, &id) {
                return Err(StoreError::ReconstructionFailed {
                    level: CblLevel::TopLevel,
                    reason: format!("recovered component {} failed checksum", id),
                });
            }
            self.put_in_pool(pool, data.clone()).await?;
            info!(pool = %pool, block = ?id, "restored CBL component from parity");
        }
        Ok((r1, r2))
    }
}

/// Block ids a CBL points at: leaf ids, or both components of every child address.
fn referenced_blocks(cbl: &CblData) -> StoreResult<Vec<BlockId>> {
    match cbl {
        CblData::Super(sup) => {
            let mut ids = Vec::with_capacity(sup.sub_cbl_magnet_urls.len() * 2);
            for url in &sup.sub_cbl_magnet_urls {
                let address = CblAddress::parse(url)?;
                ids.push(address.b1);
                ids.push(address.b2);
            }
            Ok(ids)
        }
        leaf => Ok(leaf.leaf_blocks().map(<[BlockId]>::to_vec).unwrap_or_default()),
    }
}

#[async_trait]
impl WhitenerSource for PooledBlockStore {
    async fn cached_whiteners(
        &self,
        pool: &PoolId,
        block_size: usize,
        count: usize,
    ) -> StoreResult<Vec<(BlockId, Vec<u8>)>> {
        let picks: Vec<BlockId> = {
            let index = self.index.read().await;
            let Some(entry) = index.pools.get(pool) else {
                return Ok(Vec::new());
            };
            let candidates: Vec<BlockId> = entry
                .blocks
                .iter()
                .filter(|(_, len)| **len == block_size as u64)
                .map(|(id, _)| *id)
                .collect();
            self.random
                .sample_indices(candidates.len(), count)
                .into_iter()
                .map(|i| candidates[i])
                .collect()
        };

        let mut out = Vec::with_capacity(picks.len());
        for id in picks {
            match self.fetch(pool, &id).await? {
                Some(data) => out.push((id, data.to_vec())),
                None => warn!(pool = %pool, block = ?id, "indexed whitener missing from backend"),
            }
        }
        Ok(out)
    }

    async fn store_block(&self, pool: &PoolId, data: Vec<u8>) -> StoreResult<BlockId> {
        self.put_in_pool(pool, data).await
    }
}

/// Resolves sub-CBL addresses against a single pool.
pub struct PoolRetriever<'a> {
    store: &'a PooledBlockStore,
    pool: PoolId,
}

impl<'a> PoolRetriever<'a> {
    /// Retriever reading from `pool` in `store`.
    pub fn new(store: &'a PooledBlockStore, pool: PoolId) -> Self {
        Self { store, pool }
    }
}

#[async_trait]
impl<'a> SubCblRetriever for PoolRetriever<'a> {
    async fn retrieve_sub_cbl(&self, address: &str) -> StoreResult<CblData> {
        self.store.retrieve_cbl_by_magnet(&self.pool, address).await
    }
}
