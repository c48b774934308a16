//! Whole-file storage on top of [`PooledBlockStore`].
//!
//! A file is cut into blocks, each block is whitened into a tuple, and the
//! flattened tuple ids become the leaves of a CBL. When the leaves overflow a
//! single CBL they are split into sub-CBLs under one or more levels of Super
//! CBLs.

use tracing::{debug, info, instrument};

use crate::capacity::{
    calculate_max_block_references, calculate_max_sub_cbl_references, requires_super_cbl,
    CblExtraFields,
};
use crate::cbl::{CblData, CblKind, RegularCbl, SubCbl, SuperCbl};
use crate::checksum::BlockId;
use crate::error::{CblLevel, StoreError, StoreResult};
use crate::magnet::CblAddress;
use crate::pool::PoolId;
use crate::pooled_store::PooledBlockStore;
use crate::whitening::decombine;

/// Outcome of [`store_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Address of the top-level CBL.
    pub address: CblAddress,
    /// The top-level CBL as stored.
    pub root: CblData,
    /// Leaf block ids across the whole tree.
    pub leaf_count: usize,
    /// CBL nodes written, the root included.
    pub cbl_nodes: usize,
}

impl StoredFile {
    /// The root address as a magnet URL.
    pub fn magnet_url(&self) -> String {
        self.address.to_magnet_url()
    }
}

struct TreeBuilder<'a> {
    store: &'a PooledBlockStore,
    pool: &'a PoolId,
    file_name: &'a str,
    original_size: u64,
    block_size: u32,
    nodes: usize,
}

impl TreeBuilder<'_> {
    async fn put(&mut self, node: &CblData) -> StoreResult<CblAddress> {
        let stored = self
            .store
            .store_cbl_with_whitening_in_pool(self.pool, node, None)
            .await?;
        self.nodes += 1;
        Ok(stored.address)
    }

    fn super_node(&self, children: &[(String, u64)], depth: u32) -> CblData {
        CblData::Super(SuperCbl {
            file_name: self.file_name.to_string(),
            original_size: self.original_size,
            block_size: self.block_size,
            total_block_count: children.iter().map(|(_, n)| n).sum(),
            depth,
            sub_cbl_count: children.len() as u32,
            sub_cbl_magnet_urls: children.iter().map(|(url, _)| url.clone()).collect(),
        })
    }

    async fn build(&mut self, leaves: Vec<BlockId>) -> StoreResult<(CblAddress, CblData)> {
        if !requires_super_cbl(leaves.len(), self.block_size, self.file_name, self.original_size)? {
            let root = CblData::Regular(RegularCbl {
                file_name: self.file_name.to_string(),
                original_size: self.original_size,
                block_size: self.block_size,
                block_count: leaves.len() as u64,
                blocks: leaves,
            });
            let address = self.put(&root).await?;
            return Ok((address, root));
        }

        let bound = leaves.len() as u32;
        let per_sub = calculate_max_block_references(
            self.block_size,
            self.file_name,
            self.original_size,
            CblKind::SubCbl,
            &CblExtraFields {
                sub_cbl_index: bound,
                total_sub_cbls: bound,
                ..Default::default()
            },
        )?;
        if per_sub == 0 {
            return Err(StoreError::InvalidConfiguration(format!(
                "block size {} cannot hold a sub-CBL for {}",
                self.block_size, self.file_name
            )));
        }

        let total_sub_cbls = leaves.len().div_ceil(per_sub) as u32;
        let mut level: Vec<(String, u64)> = Vec::with_capacity(total_sub_cbls as usize);
        for (index, chunk) in leaves.chunks(per_sub).enumerate() {
            let node = CblData::Sub(SubCbl {
                file_name: self.file_name.to_string(),
                original_size: self.original_size,
                block_size: self.block_size,
                sub_cbl_index: index as u32,
                total_sub_cbls,
                block_count: chunk.len() as u64,
                blocks: chunk.to_vec(),
            });
            let address = self.put(&node).await?;
            level.push((address.to_magnet_url(), chunk.len() as u64));
        }
        debug!(sub_cbls = level.len(), per_sub, "split leaves into sub-CBLs");

        let total = leaves.len() as u64;
        let mut depth = 1u32;
        loop {
            let fanout = calculate_max_sub_cbl_references(
                self.block_size,
                self.file_name,
                self.original_size,
                total,
                depth,
            )?;
            if fanout < 2 {
                return Err(StoreError::InvalidConfiguration(format!(
                    "block size {} cannot hold a Super CBL with two children",
                    self.block_size
                )));
            }
            if level.len() <= fanout {
                let root = self.super_node(&level, depth);
                let address = self.put(&root).await?;
                return Ok((address, root));
            }
            let mut next = Vec::with_capacity(level.len().div_ceil(fanout));
            for group in level.chunks(fanout) {
                let node = self.super_node(group, depth);
                let count: u64 = group.iter().map(|(_, n)| n).sum();
                let address = self.put(&node).await?;
                next.push((address.to_magnet_url(), count));
            }
            level = next;
            depth += 1;
        }
    }
}

/// Whiten `data` into `pool` and store the CBL tree describing it, using
/// the store's `default_block_size` when `block_size` is `None`.
#[instrument(skip(store, pool, data), fields(pool = %pool, size = data.len()))]
pub async fn store_file(
    store: &PooledBlockStore,
    pool: &PoolId,
    file_name: &str,
    data: &[u8],
    block_size: Option<u32>,
) -> StoreResult<StoredFile> {
    let block_size = block_size.unwrap_or(store.config().default_block_size);
    if block_size == 0 {
        return Err(StoreError::InvalidConfiguration(
            "block size must be non-zero".to_string(),
        ));
    }
    let block_len = block_size as usize;
    let mut leaves = Vec::new();
    for chunk in data.chunks(block_len) {
        let mut block = chunk.to_vec();
        if block.len() < block_len {
            let filled = block.len();
            block.resize(block_len, 0);
            store.whitening().random_fill(&mut block[filled..]);
        }
        let tuple = store.whiten_block_in_pool(pool, &block).await?;
        leaves.extend(tuple.block_ids());
    }
    let leaf_count = leaves.len();

    let mut builder = TreeBuilder {
        store,
        pool,
        file_name,
        original_size: data.len() as u64,
        block_size,
        nodes: 0,
    };
    let (address, root) = builder.build(leaves).await?;
    info!(
        file = file_name,
        leaves = leaf_count,
        cbl_nodes = builder.nodes,
        kind = root.kind().as_str(),
        "stored file"
    );
    Ok(StoredFile {
        address,
        root,
        leaf_count,
        cbl_nodes: builder.nodes,
    })
}

/// Rebuild a file from the CBL at `address` in `pool`.
#[instrument(skip(store, pool), fields(pool = %pool))]
pub async fn retrieve_file(
    store: &PooledBlockStore,
    pool: &PoolId,
    address: &CblAddress,
) -> StoreResult<Vec<u8>> {
    let root = store.retrieve_cbl_from_pool(pool, address, &[]).await?;
    let leaves = store.reconstruct_in_pool(pool, &root).await?.blocks;

    let block_len = root.block_size() as usize;
    if block_len == 0 {
        return Err(StoreError::InvalidCblEncoding(
            "blockSize must be non-zero".to_string(),
        ));
    }
    let original_size = root.original_size() as usize;
    let data_blocks = original_size.div_ceil(block_len);
    if data_blocks == 0 {
        if !leaves.is_empty() {
            return Err(StoreError::ReconstructionFailed {
                level: CblLevel::TopLevel,
                reason: format!("{} leaves listed for an empty file", leaves.len()),
            });
        }
        return Ok(Vec::new());
    }
    if leaves.len() % data_blocks != 0 || leaves.len() / data_blocks < 2 {
        return Err(StoreError::ReconstructionFailed {
            level: CblLevel::TopLevel,
            reason: format!(
                "{} leaves do not form whitened tuples for {} data blocks",
                leaves.len(),
                data_blocks
            ),
        });
    }
    let tuple_width = leaves.len() / data_blocks;

    let mut out = Vec::with_capacity(data_blocks * block_len);
    for tuple in leaves.chunks(tuple_width) {
        let stored = store.get_from_pool(pool, &tuple[0]).await?;
        let mut whiteners = Vec::with_capacity(tuple_width - 1);
        for id in &tuple[1..] {
            whiteners.push(store.get_from_pool(pool, id).await?);
        }
        out.extend(decombine(&stored, &whiteners)?);
    }
    out.truncate(original_size);
    debug!(size = out.len(), tuple_width, "retrieved file");
    Ok(out)
}

/// [`retrieve_file`] from a magnet URL.
pub async fn retrieve_file_by_magnet(
    store: &PooledBlockStore,
    pool: &PoolId,
    url: &str,
) -> StoreResult<Vec<u8>> {
    let address = CblAddress::parse(url)?;
    retrieve_file(store, pool, &address).await
}
