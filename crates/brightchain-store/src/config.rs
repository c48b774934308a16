//! Store configuration, loadable from TOML or JSON files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::pool::PoolId;
use crate::reconstruction::ReconstructionConfig;
use crate::whitening::WhiteningConfig;

/// Configuration for a [`crate::PooledBlockStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Pool that legacy, non-pooled calls read and write.
    pub default_pool: PoolId,
    /// Block size used when callers do not pick one.
    pub default_block_size: u32,
    /// Reed-Solomon parity blocks written alongside each whitened CBL.
    pub parity_shards: usize,
    /// Default page length for block listings.
    pub page_size: usize,
    /// Whitener selection.
    pub whitening: WhiteningConfig,
    /// CBL tree traversal limits.
    pub reconstruction: ReconstructionConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_pool: PoolId::default_pool(),
            default_block_size: 4096,
            parity_shards: 0,
            page_size: 256,
            whitening: WhiteningConfig::default(),
            reconstruction: ReconstructionConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Load from a `.toml` or `.json` file and validate.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let config: StoreConfig = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| StoreError::Config(e.to_string()))?,
            "json" => {
                serde_json::from_str(&contents).map_err(|e| StoreError::Config(e.to_string()))?
            }
            _ => {
                return Err(StoreError::Config(format!(
                    "Unsupported config file extension: {}",
                    ext
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every nested bound.
    pub fn validate(&self) -> StoreResult<()> {
        self.whitening.validate()?;
        self.reconstruction.validate()?;
        if self.default_block_size == 0 {
            return Err(StoreError::InvalidConfiguration(
                "default_block_size must be non-zero".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(StoreError::InvalidConfiguration(
                "page_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
