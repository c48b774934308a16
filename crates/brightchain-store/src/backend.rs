//! Raw key-value block store contract and an in-memory implementation.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;
use crate::pool::StorageKey;

/// Physical block storage addressed by `{pool}:{hash}` keys.
/// Implementations own their write serialization.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// True if a block is stored under `key`.
    async fn has(&self, key: &StorageKey) -> StoreResult<bool>;

    /// Fetch the block stored under `key`.
    async fn get(&self, key: &StorageKey) -> StoreResult<Option<Bytes>>;

    /// Store `data` under `key`, replacing any previous value.
    async fn put(&self, key: &StorageKey, data: Bytes) -> StoreResult<()>;

    /// Remove `key`. Returns true if something was removed.
    async fn delete(&self, key: &StorageKey) -> StoreResult<bool>;
}

/// In-memory block store using RwLock for thread-safe access.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<StorageKey, Bytes>>,
}

impl MemoryBlockStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks across all pools.
    pub async fn len(&self) -> usize {
        self.blocks.read().await.len()
    }

    /// True if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.blocks.read().await.is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn has(&self, key: &StorageKey) -> StoreResult<bool> {
        Ok(self.blocks.read().await.contains_key(key))
    }

    async fn get(&self, key: &StorageKey) -> StoreResult<Option<Bytes>> {
        Ok(self.blocks.read().await.get(key).cloned())
    }

    async fn put(&self, key: &StorageKey, data: Bytes) -> StoreResult<()> {
        debug!(key = %key, size = data.len(), "memory store put");
        self.blocks.write().await.insert(key.clone(), data);
        Ok(())
    }

    async fn delete(&self, key: &StorageKey) -> StoreResult<bool> {
        Ok(self.blocks.write().await.remove(key).is_some())
    }
}
