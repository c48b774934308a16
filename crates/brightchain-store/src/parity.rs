//! Reed-Solomon parity over the two whitened components of a stored CBL.
//! Lets a CBL be recovered when one component block goes missing.

use reed_solomon_erasure::galois_8::ReedSolomon;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Data shards per stripe: the whitened CBL block and its whitener.
pub const COMPONENT_SHARDS: usize = 2;

fn codec(parity_shards: usize) -> StoreResult<ReedSolomon> {
    ReedSolomon::new(COMPONENT_SHARDS, parity_shards)
        .map_err(|e| StoreError::ErasureCoding(e.to_string()))
}

/// Compute `parity_shards` parity blocks over two equal-length components.
pub fn encode_parity(b1: &[u8], b2: &[u8], parity_shards: usize) -> StoreResult<Vec<Vec<u8>>> {
    if parity_shards == 0 {
        return Ok(Vec::new());
    }
    if b1.len() != b2.len() {
        return Err(StoreError::BlockSizeMismatch {
            expected: b1.len(),
            actual: b2.len(),
        });
    }
    let rs = codec(parity_shards)?;
    let mut shards: Vec<Vec<u8>> = Vec::with_capacity(COMPONENT_SHARDS + parity_shards);
    shards.push(b1.to_vec());
    shards.push(b2.to_vec());
    shards.extend((0..parity_shards).map(|_| vec![0u8; b1.len()]));
    rs.encode(&mut shards)
        .map_err(|e| StoreError::ErasureCoding(e.to_string()))?;
    debug!(parity_shards, shard_size = b1.len(), "encoded CBL parity");
    Ok(shards.split_off(COMPONENT_SHARDS))
}

/// Rebuild missing components. `shards` holds `[b1, b2, parity..]`, `None` where missing.
/// Returns `(b1, b2)`.
pub fn recover_components(mut shards: Vec<Option<Vec<u8>>>) -> StoreResult<(Vec<u8>, Vec<u8>)> {
    if shards.len() <= COMPONENT_SHARDS {
        return Err(StoreError::ErasureCoding(
            "no parity shards available".to_string(),
        ));
    }
    let rs = codec(shards.len() - COMPONENT_SHARDS)?;
    rs.reconstruct_data(&mut shards)
        .map_err(|e| StoreError::ErasureCoding(e.to_string()))?;
    let mut data = shards.into_iter().take(COMPONENT_SHARDS).flatten();
    match (data.next(), data.next()) {
        (Some(b1), Some(b2)) => Ok((b1, b2)),
        _ => Err(StoreError::ErasureCoding(
            "components missing after reconstruction".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components() -> (Vec<u8>, Vec<u8>) {
        let b1: Vec<u8> = (0..256u32).map(|i| (i * 3) as u8).collect();
        let b2: Vec<u8> = (0..256u32).map(|i| (i * 11 + 5) as u8).collect();
        (b1, b2)
    }

    #[test]
    fn zero_parity_is_empty() {
        let (b1, b2) = components();
        assert!(encode_parity(&b1, &b2, 0).unwrap().is_empty());
    }

    #[test]
    fn recovers_either_component() {
        let (b1, b2) = components();
        let parity = encode_parity(&b1, &b2, 1).unwrap();
        assert_eq!(parity.len(), 1);

        let shards = vec![None, Some(b2.clone()), Some(parity[0].clone())];
        assert_eq!(recover_components(shards).unwrap(), (b1.clone(), b2.clone()));

        let shards = vec![Some(b1.clone()), None, Some(parity[0].clone())];
        assert_eq!(recover_components(shards).unwrap(), (b1, b2));
    }

    #[test]
    fn two_parity_shards_recover_both() {
        let (b1, b2) = components();
        let parity = encode_parity(&b1, &b2, 2).unwrap();
        let shards = vec![None, None, Some(parity[0].clone()), Some(parity[1].clone())];
        assert_eq!(recover_components(shards).unwrap(), (b1, b2));
    }

    #[test]
    fn too_many_missing_fails() {
        let (b1, b2) = components();
        let parity = encode_parity(&b1, &b2, 1).unwrap();
        let shards = vec![None, None, Some(parity[0].clone())];
        assert!(matches!(
            recover_components(shards),
            Err(StoreError::ErasureCoding(_))
        ));
    }

    #[test]
    fn mismatched_components_rejected() {
        assert!(matches!(
            encode_parity(&[0u8; 4], &[0u8; 5], 1),
            Err(StoreError::BlockSizeMismatch { .. })
        ));
    }
}
