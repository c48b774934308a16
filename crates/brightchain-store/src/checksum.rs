//! Content checksums: 512-bit BLAKE3 digests used as block identifiers

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Digest length in bytes.
pub const BLOCK_ID_LEN: usize = 64;

/// Digest length as lowercase hex.
pub const BLOCK_ID_HEX_LEN: usize = BLOCK_ID_LEN * 2;

/// A 64-byte content hash identifying a stored block.
/// Serialized everywhere as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub [u8; BLOCK_ID_LEN]);

impl BlockId {
    /// Return the id as a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex string of exactly [`BLOCK_ID_HEX_LEN`] characters.
    pub fn from_hex(s: &str) -> StoreResult<Self> {
        if s.len() != BLOCK_ID_HEX_LEN {
            return Err(StoreError::InvalidCblEncoding(format!(
                "block id must be {} hex characters, got {}",
                BLOCK_ID_HEX_LEN,
                s.len()
            )));
        }
        let mut out = [0u8; BLOCK_ID_LEN];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| StoreError::InvalidCblEncoding(format!("bad block id: {}", e)))?;
        Ok(BlockId(out))
    }

    /// Return the raw bytes
    pub fn as_bytes(&self) -> &[u8; BLOCK_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "BlockId({}..)", &hex[..16])
    }
}

impl FromStr for BlockId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockId::from_hex(s)
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BlockId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Produces and validates content hashes for stored blocks.
pub trait ChecksumService: Send + Sync {
    /// Hash `data` into its block id.
    fn checksum(&self, data: &[u8]) -> BlockId;

    /// True if `data` hashes to `expected`.
    fn validate(&self, data: &[u8], expected: &BlockId) -> bool {
        self.checksum(data) == *expected
    }
}

/// BLAKE3 in extendable-output mode, truncated to 512 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Checksum;

impl ChecksumService for Blake3Checksum {
    fn checksum(&self, data: &[u8]) -> BlockId {
        blake3_512(data)
    }
}

/// Compute the 512-bit BLAKE3 digest of data
pub fn blake3_512(data: &[u8]) -> BlockId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data);
    let mut out = [0u8; BLOCK_ID_LEN];
    hasher.finalize_xof().fill(&mut out);
    BlockId(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn blake3_512_is_deterministic() {
        assert_eq!(blake3_512(b"hello world"), blake3_512(b"hello world"));
    }

    #[test]
    fn different_data_produces_different_ids() {
        assert_ne!(blake3_512(b"hello"), blake3_512(b"world"));
    }

    #[test]
    fn xof_prefix_matches_standard_digest() {
        let id = blake3_512(b"prefix");
        assert_eq!(&id.0[..32], blake3::hash(b"prefix").as_bytes());
    }

    #[test]
    fn hex_is_lowercase_and_fixed_length() {
        let hex = blake3_512(b"abc").to_hex();
        assert_eq!(hex.len(), BLOCK_ID_HEX_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(matches!(
            BlockId::from_hex("abcd"),
            Err(StoreError::InvalidCblEncoding(_))
        ));
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let bad = "z".repeat(BLOCK_ID_HEX_LEN);
        assert!(BlockId::from_hex(&bad).is_err());
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = blake3_512(b"serde");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let back: BlockId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn service_validates() {
        let svc = Blake3Checksum;
        let id = svc.checksum(b"payload");
        assert!(svc.validate(b"payload", &id));
        assert!(!svc.validate(b"tampered", &id));
    }

    proptest! {
        #[test]
        fn prop_hex_parse_inverts_display(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            let id = blake3_512(&data);
            prop_assert_eq!(BlockId::from_hex(&id.to_string()).unwrap(), id);
        }
    }
}
