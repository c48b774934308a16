//! CBL capacity accounting.
//!
//! Sizes are exact: a CBL's size is the length of its canonical JSON plus the
//! 4-byte length prefix. Reference budgets are fixed per reference kind and
//! only ever rounded down.

use crate::cbl::{CblData, CblKind, RegularCbl, SubCbl, SuperCbl};
use crate::codec::{serialize_cbl, LENGTH_PREFIX_LEN};
use crate::error::StoreResult;

/// Budget for one leaf block id: 128 hex characters, two quotes, a comma and slack.
pub const BYTES_PER_BLOCK_REFERENCE: usize = 132;

/// Budget for one quoted sub-CBL magnet URL plus separator.
///
/// A quoted address with its comma takes 301 bytes plus the digits of `bs`,
/// so the budget holds for block sizes up to 999_999_999. A ten-digit block
/// size needs 311 bytes per reference.
pub const BYTES_PER_SUB_CBL_REFERENCE: usize = 310;

/// Variant-specific fields that contribute to the fixed metadata cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CblExtraFields {
    /// `subCblIndex` of a sub-CBL.
    pub sub_cbl_index: u32,
    /// `totalSubCbls` of a sub-CBL.
    pub total_sub_cbls: u32,
    /// `totalBlockCount` of a Super CBL.
    pub total_block_count: u64,
    /// `depth` of a Super CBL.
    pub depth: u32,
}

/// Per-reference budget for the references a CBL kind holds.
pub fn bytes_per_reference(kind: CblKind) -> usize {
    match kind {
        CblKind::SuperCbl => BYTES_PER_SUB_CBL_REFERENCE,
        CblKind::Regular | CblKind::SubCbl => BYTES_PER_BLOCK_REFERENCE,
    }
}

/// Exact serialized size of `cbl`, length prefix included.
pub fn calculate_cbl_size(cbl: &CblData) -> StoreResult<usize> {
    Ok(LENGTH_PREFIX_LEN + serialize_cbl(cbl)?.len())
}

/// Size of a CBL of `kind` with an empty reference list.
pub fn calculate_cbl_overhead(
    kind: CblKind,
    file_name: &str,
    original_size: u64,
    block_size: u32,
    extra: &CblExtraFields,
) -> StoreResult<usize> {
    let file_name = file_name.to_string();
    let empty = match kind {
        CblKind::Regular => CblData::Regular(RegularCbl {
            file_name,
            original_size,
            block_size,
            block_count: 0,
            blocks: Vec::new(),
        }),
        CblKind::SubCbl => CblData::Sub(SubCbl {
            file_name,
            original_size,
            block_size,
            sub_cbl_index: extra.sub_cbl_index,
            total_sub_cbls: extra.total_sub_cbls,
            block_count: 0,
            blocks: Vec::new(),
        }),
        CblKind::SuperCbl => CblData::Super(SuperCbl {
            file_name,
            original_size,
            block_size,
            total_block_count: extra.total_block_count,
            depth: extra.depth,
            sub_cbl_count: 0,
            sub_cbl_magnet_urls: Vec::new(),
        }),
    };
    calculate_cbl_size(&empty)
}

/// `floor((block_size - overhead) / bytes_per_reference)`, zero if the
/// metadata alone does not fit.
pub fn calculate_max_block_references(
    block_size: u32,
    file_name: &str,
    original_size: u64,
    kind: CblKind,
    extra: &CblExtraFields,
) -> StoreResult<usize> {
    let overhead = calculate_cbl_overhead(kind, file_name, original_size, block_size, extra)?;
    Ok((block_size as usize).saturating_sub(overhead) / bytes_per_reference(kind))
}

/// True iff `block_count` leaf references overflow a single regular CBL.
pub fn requires_super_cbl(
    block_count: usize,
    block_size: u32,
    file_name: &str,
    original_size: u64,
) -> StoreResult<bool> {
    let max = calculate_max_block_references(
        block_size,
        file_name,
        original_size,
        CblKind::Regular,
        &CblExtraFields::default(),
    )?;
    Ok(block_count > max)
}

/// Number of sub-CBL addresses that fit in one Super CBL.
pub fn calculate_max_sub_cbl_references(
    block_size: u32,
    file_name: &str,
    original_size: u64,
    total_block_count: u64,
    depth: u32,
) -> StoreResult<usize> {
    calculate_max_block_references(
        block_size,
        file_name,
        original_size,
        CblKind::SuperCbl,
        &CblExtraFields {
            total_block_count,
            depth,
            ..Default::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{blake3_512, BlockId};
    use crate::magnet::CblAddress;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<BlockId> {
        (0..n).map(|i| blake3_512(&(i as u64).to_le_bytes())).collect()
    }

    fn regular(file_name: &str, original_size: u64, block_size: u32, n: usize) -> CblData {
        CblData::Regular(RegularCbl {
            file_name: file_name.to_string(),
            original_size,
            block_size,
            block_count: n as u64,
            blocks: ids(n),
        })
    }

    #[test]
    fn large_txt_threshold() {
        let max = calculate_max_block_references(
            4096,
            "large.txt",
            100_000,
            CblKind::Regular,
            &CblExtraFields::default(),
        )
        .unwrap();
        assert!(max > 0);
        assert!(!requires_super_cbl(max, 4096, "large.txt", 100_000).unwrap());
        assert!(requires_super_cbl(max + 1, 4096, "large.txt", 100_000).unwrap());
    }

    #[test]
    fn size_is_prefix_plus_json() {
        let cbl = regular("x.bin", 10, 1024, 3);
        let json = serialize_cbl(&cbl).unwrap();
        assert_eq!(calculate_cbl_size(&cbl).unwrap(), 4 + json.len());
    }

    #[test]
    fn overhead_matches_empty_cbl() {
        let overhead = calculate_cbl_overhead(
            CblKind::Regular,
            "x.bin",
            10,
            1024,
            &CblExtraFields::default(),
        )
        .unwrap();
        assert_eq!(overhead, calculate_cbl_size(&regular("x.bin", 10, 1024, 0)).unwrap());
    }

    #[test]
    fn max_regular_references_fit_in_block() {
        for block_size in [1024u32, 4096, 8192] {
            let max = calculate_max_block_references(
                block_size,
                "fits.dat",
                1 << 20,
                CblKind::Regular,
                &CblExtraFields::default(),
            )
            .unwrap();
            let cbl = regular("fits.dat", 1 << 20, block_size, max);
            assert!(calculate_cbl_size(&cbl).unwrap() <= block_size as usize);
        }
    }

    #[test]
    fn max_sub_cbl_references_fit_in_block() {
        let block_size = 4096;
        let max = calculate_max_sub_cbl_references(block_size, "f", 1 << 30, 1 << 20, 3).unwrap();
        let url = CblAddress::new(block_size, blake3_512(b"a"), blake3_512(b"b")).to_string();
        let cbl = CblData::Super(SuperCbl {
            file_name: "f".into(),
            original_size: 1 << 30,
            block_size,
            total_block_count: 1 << 20,
            depth: 3,
            sub_cbl_count: max as u32,
            sub_cbl_magnet_urls: vec![url; max],
        });
        assert!(max >= 2);
        assert!(calculate_cbl_size(&cbl).unwrap() <= block_size as usize);
    }

    #[test]
    fn tiny_block_holds_nothing() {
        let max = calculate_max_block_references(
            16,
            "name",
            1,
            CblKind::Regular,
            &CblExtraFields::default(),
        )
        .unwrap();
        assert_eq!(max, 0);
    }

    #[test]
    fn longer_names_reduce_capacity() {
        let extra = CblExtraFields::default();
        let short = calculate_max_block_references(4096, "a", 1, CblKind::Regular, &extra).unwrap();
        let long_name = "n".repeat(600);
        let long =
            calculate_max_block_references(4096, &long_name, 1, CblKind::Regular, &extra).unwrap();
        assert!(long < short);
    }

    proptest! {
        #[test]
        fn prop_threshold_exact(
            block_size in 1024u32..=8192,
            name in "[a-zA-Z0-9 ._\"\\\\-]{0,40}",
            original_size in 0u64..u64::MAX / 2,
        ) {
            let max = calculate_max_block_references(
                block_size,
                &name,
                original_size,
                CblKind::Regular,
                &CblExtraFields::default(),
            ).unwrap();
            prop_assert!(!requires_super_cbl(max, block_size, &name, original_size).unwrap());
            prop_assert!(requires_super_cbl(max + 1, block_size, &name, original_size).unwrap());
        }

        #[test]
        fn prop_size_exact_for_sub_cbl(
            n in 0usize..20,
            index in 0u32..100,
            name in "[a-z]{1,20}",
        ) {
            let cbl = CblData::Sub(SubCbl {
                file_name: name,
                original_size: 12345,
                block_size: 4096,
                sub_cbl_index: index,
                total_sub_cbls: index + 1,
                block_count: n as u64,
                blocks: ids(n),
            });
            let json = serialize_cbl(&cbl).unwrap();
            prop_assert_eq!(calculate_cbl_size(&cbl).unwrap(), 4 + json.len());
        }
    }
}
