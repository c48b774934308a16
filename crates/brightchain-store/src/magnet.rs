//! Sub-CBL addresses: `magnet:?xt=urn:brightchain:cbl&bs=<blockSize>&b1=<hex>&b2=<hex>`

use std::fmt;
use std::str::FromStr;

use crate::checksum::BlockId;
use crate::error::{StoreError, StoreResult};

/// URI scheme prefix.
pub const MAGNET_PREFIX: &str = "magnet:?";

/// Exact-topic value identifying a whitened CBL.
pub const CBL_TOPIC: &str = "urn:brightchain:cbl";

/// The two whitened components that together reconstruct one CBL node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CblAddress {
    /// Size of both component blocks.
    pub block_size: u32,
    /// Whitened CBL block.
    pub b1: BlockId,
    /// Whitener it was combined with.
    pub b2: BlockId,
}

impl CblAddress {
    /// Address for the given components.
    pub fn new(block_size: u32, b1: BlockId, b2: BlockId) -> Self {
        Self { block_size, b1, b2 }
    }

    /// Render as a magnet URL.
    pub fn to_magnet_url(&self) -> String {
        self.to_string()
    }

    /// Parse a magnet URL.
    pub fn parse(url: &str) -> StoreResult<Self> {
        let query = url
            .strip_prefix(MAGNET_PREFIX)
            .ok_or_else(|| StoreError::InvalidMagnetUrl("missing magnet:? prefix".to_string()))?;

        let mut topic = None;
        let mut block_size = None;
        let mut b1 = None;
        let mut b2 = None;
        for pair in query.split('&') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| StoreError::InvalidMagnetUrl(format!("malformed pair {:?}", pair)))?;
            match key {
                "xt" => topic = Some(value),
                "bs" => {
                    block_size = Some(value.parse::<u32>().map_err(|_| {
                        StoreError::InvalidMagnetUrl(format!("bad block size {:?}", value))
                    })?)
                }
                "b1" => b1 = Some(component(value)?),
                "b2" => b2 = Some(component(value)?),
                // Unknown parameters are ignored.
                _ => {}
            }
        }

        match topic {
            Some(CBL_TOPIC) => {}
            Some(other) => {
                return Err(StoreError::InvalidMagnetUrl(format!(
                    "unexpected topic {:?}",
                    other
                )))
            }
            None => return Err(StoreError::InvalidMagnetUrl("missing xt".to_string())),
        }

        Ok(Self {
            block_size: block_size
                .ok_or_else(|| StoreError::InvalidMagnetUrl("missing bs".to_string()))?,
            b1: b1.ok_or_else(|| StoreError::InvalidMagnetUrl("missing b1".to_string()))?,
            b2: b2.ok_or_else(|| StoreError::InvalidMagnetUrl("missing b2".to_string()))?,
        })
    }
}

fn component(value: &str) -> StoreResult<BlockId> {
    BlockId::from_hex(value).map_err(|e| StoreError::InvalidMagnetUrl(e.to_string()))
}

impl fmt::Display for CblAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}xt={}&bs={}&b1={}&b2={}",
            MAGNET_PREFIX, CBL_TOPIC, self.block_size, self.b1, self.b2
        )
    }
}

impl FromStr for CblAddress {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CblAddress::parse(s)
    }
}
