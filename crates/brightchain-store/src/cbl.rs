//! Constituent Block List records: the four CBL variants and their invariants

use serde::{Deserialize, Serialize};

use crate::checksum::BlockId;
use crate::error::{StoreError, StoreResult};

/// Explicit `type` tag carried by version 2 CBLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CblKind {
    /// Flat list of leaf blocks for a whole file.
    #[serde(rename = "regular")]
    Regular,
    /// Flat list of leaf blocks for one fragment of a file.
    #[serde(rename = "sub-cbl")]
    SubCbl,
    /// List of addresses of child CBLs.
    #[serde(rename = "super-cbl")]
    SuperCbl,
}

impl CblKind {
    /// Wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CblKind::Regular => "regular",
            CblKind::SubCbl => "sub-cbl",
            CblKind::SuperCbl => "super-cbl",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "regular" => Some(CblKind::Regular),
            "sub-cbl" => Some(CblKind::SubCbl),
            "super-cbl" => Some(CblKind::SuperCbl),
            _ => None,
        }
    }
}

/// Legacy version 1 CBL; implicitly regular.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CblV1 {
    /// Original file name.
    pub file_name: String,
    /// Original file length in bytes.
    pub original_size: u64,
    /// Block size used to split the file.
    pub block_size: u32,
    /// Number of entries in `blocks`.
    pub block_count: u64,
    /// Leaf block ids in file order.
    pub blocks: Vec<BlockId>,
}

/// Version 2 CBL tagged `regular`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularCbl {
    /// Original file name.
    pub file_name: String,
    /// Original file length in bytes.
    pub original_size: u64,
    /// Block size used to split the file.
    pub block_size: u32,
    /// Number of entries in `blocks`.
    pub block_count: u64,
    /// Leaf block ids in file order.
    pub blocks: Vec<BlockId>,
}

/// Version 2 CBL tagged `sub-cbl`: one leaf fragment of a larger file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCbl {
    /// Original file name.
    pub file_name: String,
    /// Original file length in bytes.
    pub original_size: u64,
    /// Block size used to split the file.
    pub block_size: u32,
    /// Zero-based position among the sibling fragments.
    pub sub_cbl_index: u32,
    /// Number of sibling fragments.
    pub total_sub_cbls: u32,
    /// Number of entries in `blocks`.
    pub block_count: u64,
    /// Leaf block ids of this fragment.
    pub blocks: Vec<BlockId>,
}

/// Version 2 CBL tagged `super-cbl`: addresses of child CBLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperCbl {
    /// Original file name.
    pub file_name: String,
    /// Original file length in bytes.
    pub original_size: u64,
    /// Block size used to split the file.
    pub block_size: u32,
    /// Leaf blocks reachable through all descendants.
    pub total_block_count: u64,
    /// Height of this node above the leaf lists.
    pub depth: u32,
    /// Number of entries in `sub_cbl_magnet_urls`.
    pub sub_cbl_count: u32,
    /// Child CBL addresses in reconstruction order.
    pub sub_cbl_magnet_urls: Vec<String>,
}

/// Any CBL variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CblData {
    /// Legacy version 1.
    V1(CblV1),
    /// Version 2 `regular`.
    Regular(RegularCbl),
    /// Version 2 `sub-cbl`.
    Sub(SubCbl),
    /// Version 2 `super-cbl`.
    Super(SuperCbl),
}

impl CblData {
    /// Wire version number.
    pub fn version(&self) -> u8 {
        match self {
            CblData::V1(_) => 1,
            _ => 2,
        }
    }

    /// Variant kind; version 1 reports `Regular`.
    pub fn kind(&self) -> CblKind {
        match self {
            CblData::V1(_) | CblData::Regular(_) => CblKind::Regular,
            CblData::Sub(_) => CblKind::SubCbl,
            CblData::Super(_) => CblKind::SuperCbl,
        }
    }

    /// Original file name.
    pub fn file_name(&self) -> &str {
        match self {
            CblData::V1(c) => &c.file_name,
            CblData::Regular(c) => &c.file_name,
            CblData::Sub(c) => &c.file_name,
            CblData::Super(c) => &c.file_name,
        }
    }

    /// Original file length in bytes.
    pub fn original_size(&self) -> u64 {
        match self {
            CblData::V1(c) => c.original_size,
            CblData::Regular(c) => c.original_size,
            CblData::Sub(c) => c.original_size,
            CblData::Super(c) => c.original_size,
        }
    }

    /// Block size the file was split with.
    pub fn block_size(&self) -> u32 {
        match self {
            CblData::V1(c) => c.block_size,
            CblData::Regular(c) => c.block_size,
            CblData::Sub(c) => c.block_size,
            CblData::Super(c) => c.block_size,
        }
    }

    /// Leaf ids for leaf nodes; `None` for a Super CBL.
    pub fn leaf_blocks(&self) -> Option<&[BlockId]> {
        match self {
            CblData::V1(c) => Some(&c.blocks),
            CblData::Regular(c) => Some(&c.blocks),
            CblData::Sub(c) => Some(&c.blocks),
            CblData::Super(_) => None,
        }
    }

    /// Leaf blocks this node stands for, declared or listed.
    pub fn total_block_count(&self) -> u64 {
        match self {
            CblData::V1(c) => c.block_count,
            CblData::Regular(c) => c.block_count,
            CblData::Sub(c) => c.block_count,
            CblData::Super(c) => c.total_block_count,
        }
    }

    /// Check the structural invariants of a single node.
    pub fn validate(&self) -> StoreResult<()> {
        let (declared, listed) = match self {
            CblData::V1(c) => (c.block_count, c.blocks.len()),
            CblData::Regular(c) => (c.block_count, c.blocks.len()),
            CblData::Sub(c) => {
                if c.sub_cbl_index >= c.total_sub_cbls {
                    return Err(StoreError::InvalidCblEncoding(format!(
                        "subCblIndex {} out of range for totalSubCbls {}",
                        c.sub_cbl_index, c.total_sub_cbls
                    )));
                }
                (c.block_count, c.blocks.len())
            }
            CblData::Super(c) => (c.sub_cbl_count as u64, c.sub_cbl_magnet_urls.len()),
        };
        if declared != listed as u64 {
            let field = if matches!(self, CblData::Super(_)) {
                "subCblCount"
            } else {
                "blockCount"
            };
            return Err(StoreError::InvalidCblEncoding(format!(
                "{} is {} but {} entries are listed",
                field, declared, listed
            )));
        }
        Ok(())
    }
}

impl From<CblV1> for CblData {
    fn from(c: CblV1) -> Self {
        CblData::V1(c)
    }
}

impl From<RegularCbl> for CblData {
    fn from(c: RegularCbl) -> Self {
        CblData::Regular(c)
    }
}

impl From<SubCbl> for CblData {
    fn from(c: SubCbl) -> Self {
        CblData::Sub(c)
    }
}

impl From<SuperCbl> for CblData {
    fn from(c: SuperCbl) -> Self {
        CblData::Super(c)
    }
}
