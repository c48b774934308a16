//! Recursive CBL reconstruction: resolves a (Super) CBL tree into its flat,
//! ordered list of leaf block ids.
//!
//! Sibling sub-CBLs are fetched concurrently but concatenated in address
//! order. A hard depth ceiling applies regardless of the declared `depth`.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cbl::CblData;
use crate::checksum::BlockId;
use crate::error::{CblLevel, StoreError, StoreResult};

/// Fetches the CBL node behind a sub-CBL address.
#[async_trait]
pub trait SubCblRetriever: Send + Sync {
    /// Retrieve and decode the CBL at `address`.
    async fn retrieve_sub_cbl(&self, address: &str) -> StoreResult<CblData>;
}

/// Configuration for reconstruction traversals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Deepest nesting accepted below the top-level CBL.
    pub max_depth: usize,
    /// Sibling retrievals in flight at once per node.
    pub max_concurrent_fetches: usize,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_concurrent_fetches: 8,
        }
    }
}

impl ReconstructionConfig {
    /// Reject zero limits.
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_depth == 0 || self.max_concurrent_fetches == 0 {
            return Err(StoreError::InvalidConfiguration(
                "reconstruction limits must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Traversal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionState {
    /// Nothing resolved yet.
    Start,
    /// Fetching and decoding a node.
    ResolvingNode,
    /// Concatenating child leaf lists.
    Collecting,
    /// Checking declared counts.
    Validating,
    /// Finished with a full leaf list.
    Complete,
    /// Aborted; no partial result is produced.
    Failed,
}

impl ReconstructionState {
    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconstructionState::Complete | ReconstructionState::Failed)
    }
}

/// Result of a completed traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    /// Leaf block ids in file order.
    pub blocks: Vec<BlockId>,
    /// CBL nodes visited, the top-level one included.
    pub nodes_visited: usize,
    /// Deepest nesting reached; 0 for a leaf-only CBL.
    pub max_depth_reached: usize,
}

struct Resolved {
    blocks: Vec<BlockId>,
    nodes: usize,
    depth: usize,
}

/// Walks CBL hierarchies.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionEngine {
    config: ReconstructionConfig,
}

impl ReconstructionEngine {
    /// Create an engine; fails on zero limits.
    pub fn new(config: ReconstructionConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Access engine configuration
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Resolve `cbl` into its ordered leaf block ids.
    pub async fn reconstruct_block_references<R: SubCblRetriever + ?Sized>(
        &self,
        cbl: &CblData,
        retriever: &R,
    ) -> StoreResult<Vec<BlockId>> {
        Ok(self.reconstruct(cbl, retriever).await?.blocks)
    }

    /// Resolve `cbl` and report traversal statistics.
    pub async fn reconstruct<R: SubCblRetriever + ?Sized>(
        &self,
        cbl: &CblData,
        retriever: &R,
    ) -> StoreResult<Reconstruction> {
        debug!(state = ?ReconstructionState::Start, file = cbl.file_name(), "reconstruction");
        match self
            .resolve(cbl.clone(), retriever, 0, CblLevel::TopLevel)
            .await
        {
            Ok(resolved) => {
                debug!(
                    state = ?ReconstructionState::Complete,
                    blocks = resolved.blocks.len(),
                    nodes = resolved.nodes,
                    "reconstruction"
                );
                Ok(Reconstruction {
                    blocks: resolved.blocks,
                    nodes_visited: resolved.nodes,
                    max_depth_reached: resolved.depth,
                })
            }
            Err(e) => {
                warn!(state = ?ReconstructionState::Failed, error = %e, "reconstruction");
                Err(e)
            }
        }
    }

    fn resolve<'a, R: SubCblRetriever + ?Sized>(
        &'a self,
        node: CblData,
        retriever: &'a R,
        depth: usize,
        level: CblLevel,
    ) -> BoxFuture<'a, StoreResult<Resolved>> {
        async move {
            if depth > self.config.max_depth {
                return Err(StoreError::ReconstructionFailed {
                    level,
                    reason: format!("maximum recursion depth {} exceeded", self.config.max_depth),
                });
            }
            node.validate().map_err(|e| StoreError::ReconstructionFailed {
                level: level.clone(),
                reason: e.to_string(),
            })?;

            let sup = match node {
                CblData::Super(sup) => sup,
                leaf => {
                    let blocks = leaf.leaf_blocks().map(<[BlockId]>::to_vec).unwrap_or_default();
                    return Ok(Resolved {
                        blocks,
                        nodes: 1,
                        depth,
                    });
                }
            };

            debug!(
                state = ?ReconstructionState::ResolvingNode,
                depth,
                children = sup.sub_cbl_magnet_urls.len(),
                "super CBL"
            );

            let children: Vec<Resolved> = stream::iter(sup.sub_cbl_magnet_urls.clone())
                .map(|address| async move {
                    let child = retriever.retrieve_sub_cbl(&address).await.map_err(|e| {
                        warn!(address = %address, depth = depth + 1, error = %e, "sub-CBL retrieval failed");
                        e
                    })?;
                    self.resolve(child, retriever, depth + 1, CblLevel::SubCbl { address })
                        .await
                })
                .buffered(self.config.max_concurrent_fetches)
                .try_collect()
                .await?;

            debug!(state = ?ReconstructionState::Collecting, depth, "super CBL");
            let mut blocks = Vec::with_capacity(children.iter().map(|c| c.blocks.len()).sum());
            let mut nodes = 1;
            let mut deepest = depth;
            for child in children {
                blocks.extend(child.blocks);
                nodes += child.nodes;
                deepest = deepest.max(child.depth);
            }

            debug!(state = ?ReconstructionState::Validating, depth, "super CBL");
            if blocks.len() as u64 != sup.total_block_count {
                return Err(StoreError::BlockCountMismatch {
                    expected: sup.total_block_count,
                    actual: blocks.len() as u64,
                    level,
                });
            }

            Ok(Resolved {
                blocks,
                nodes,
                depth: deepest,
            })
        }
        .boxed()
    }
}
