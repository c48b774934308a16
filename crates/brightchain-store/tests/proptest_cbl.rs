//! Property-based tests for CBL encoding, capacity and addressing.

use brightchain_store::{
    blake3_512, calculate_cbl_size, calculate_max_block_references, encode_cbl_payload,
    parse_cbl_data, requires_super_cbl, BlockId, CblAddress, CblData, CblExtraFields, CblKind,
    CblV1, RegularCbl, StoreError, SubCbl, SuperCbl,
};
use proptest::prelude::*;

/// Generator for block ids.
fn any_block_id() -> impl Strategy<Value = BlockId> {
    any::<u64>().prop_map(|n| blake3_512(&n.to_le_bytes()))
}

/// Generator for file names without characters JSON must escape.
fn any_file_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._-]{1,40}"
}

/// Generator for sub-CBL magnet URLs with any 32-bit block size.
fn any_magnet_url() -> impl Strategy<Value = String> {
    (any::<u32>(), any_block_id(), any_block_id())
        .prop_map(|(bs, b1, b2)| CblAddress::new(bs, b1, b2).to_magnet_url())
}

fn regular(file_name: &str, original_size: u64, block_size: u32, blocks: Vec<BlockId>) -> CblData {
    CblData::Regular(RegularCbl {
        file_name: file_name.to_string(),
        original_size,
        block_size,
        block_count: blocks.len() as u64,
        blocks,
    })
}

proptest! {
    #[test]
    fn prop_padded_payload_parses_back(
        name in any_file_name(),
        size in any::<u32>(),
        blocks in prop::collection::vec(any_block_id(), 0..20),
        padding in 0usize..64,
    ) {
        let cbl = regular(&name, size as u64, 4096, blocks);
        let mut payload = encode_cbl_payload(&cbl).unwrap();
        payload.resize(payload.len() + padding, 0);
        prop_assert_eq!(parse_cbl_data(payload.as_slice()).unwrap(), cbl);
    }

    #[test]
    fn prop_size_is_payload_length(
        name in any_file_name(),
        index in 0u32..1000,
        blocks in prop::collection::vec(any_block_id(), 0..10),
    ) {
        let cbl = CblData::Sub(SubCbl {
            file_name: name,
            original_size: 1 << 20,
            block_size: 8192,
            sub_cbl_index: index,
            total_sub_cbls: index + 1,
            block_count: blocks.len() as u64,
            blocks,
        });
        prop_assert_eq!(
            calculate_cbl_size(&cbl).unwrap(),
            encode_cbl_payload(&cbl).unwrap().len()
        );
    }

    #[test]
    fn prop_super_size_is_payload_length(
        name in any_file_name(),
        original_size in any::<u64>(),
        total_block_count in any::<u64>(),
        depth in 1u32..u32::MAX,
        urls in prop::collection::vec(any_magnet_url(), 0..6),
    ) {
        let cbl = CblData::Super(SuperCbl {
            file_name: name,
            original_size,
            block_size: 1 << 20,
            total_block_count,
            depth,
            sub_cbl_count: urls.len() as u32,
            sub_cbl_magnet_urls: urls,
        });
        prop_assert_eq!(
            calculate_cbl_size(&cbl).unwrap(),
            encode_cbl_payload(&cbl).unwrap().len()
        );
    }

    #[test]
    fn prop_v1_size_is_payload_length(
        name in any_file_name(),
        original_size in any::<u64>(),
        block_size in any::<u32>(),
        blocks in prop::collection::vec(any_block_id(), 0..10),
    ) {
        let cbl = CblData::V1(CblV1 {
            file_name: name,
            original_size,
            block_size,
            block_count: blocks.len() as u64,
            blocks,
        });
        prop_assert_eq!(
            calculate_cbl_size(&cbl).unwrap(),
            encode_cbl_payload(&cbl).unwrap().len()
        );
    }

    #[test]
    fn prop_max_references_always_fit(
        name in any_file_name(),
        original_size in any::<u32>(),
        block_size in 256u32..8192,
    ) {
        let max = calculate_max_block_references(
            block_size,
            &name,
            original_size as u64,
            CblKind::Regular,
            &CblExtraFields::default(),
        )
        .unwrap();
        let blocks: Vec<BlockId> = (0..max as u64).map(|n| blake3_512(&n.to_le_bytes())).collect();
        let cbl = regular(&name, original_size as u64, block_size, blocks);
        prop_assert!(calculate_cbl_size(&cbl).unwrap() <= block_size as usize);
        prop_assert!(!requires_super_cbl(max, block_size, &name, original_size as u64).unwrap());
        prop_assert!(requires_super_cbl(max + 1, block_size, &name, original_size as u64).unwrap());
    }

    #[test]
    fn prop_magnet_params_in_any_order(
        block_size in 1u32..1_000_000,
        b1 in any_block_id(),
        b2 in any_block_id(),
    ) {
        let address = CblAddress::new(block_size, b1, b2);
        let url = format!(
            "magnet:?b2={}&xt=urn:brightchain:cbl&b1={}&bs={}",
            b2.to_hex(),
            b1.to_hex(),
            block_size
        );
        prop_assert_eq!(CblAddress::parse(&url).unwrap(), address);
    }

    #[test]
    fn prop_declared_count_mismatch_rejected(
        blocks in prop::collection::vec(any_block_id(), 0..8),
        extra in 1u64..5,
    ) {
        let cbl = CblData::Regular(RegularCbl {
            file_name: "f".into(),
            original_size: 1,
            block_size: 4096,
            block_count: blocks.len() as u64 + extra,
            blocks,
        });
        prop_assert!(matches!(
            parse_cbl_data(cbl),
            Err(StoreError::InvalidCblEncoding(_))
        ));
    }
}

#[test]
fn test_legacy_v1_json_is_accepted() {
    let id = blake3_512(b"leaf").to_hex();
    let json = format!(
        r#"{{"version":1,"fileName":"old.txt","originalSize":10,"blockSize":1024,"blockCount":1,"blocks":["{id}"]}}"#
    );
    let cbl = parse_cbl_data(json.as_str()).unwrap();
    assert_eq!(cbl.version(), 1);
    assert_eq!(cbl.kind(), CblKind::Regular);
    assert_eq!(cbl.leaf_blocks().unwrap().len(), 1);
}

#[test]
fn test_unknown_version_is_rejected() {
    let json = r#"{"version":3,"type":"regular","fileName":"x","originalSize":0,"blockSize":1,"blockCount":0,"blocks":[]}"#;
    assert!(matches!(
        parse_cbl_data(json),
        Err(StoreError::UnsupportedCblVersion(3))
    ));
}
