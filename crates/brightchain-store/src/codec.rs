//! CBL codec: canonical JSON serialization, length-prefixed framing and parsing
//!
//! Wire payload: `[4 bytes: big-endian JSON length] [JSON] [padding...]`.
//! The JSON object carries `version` first and, for version 2, `type`.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cbl::{CblData, CblKind, CblV1, RegularCbl, SubCbl, SuperCbl};
use crate::error::{StoreError, StoreResult};

/// Size of the length prefix in front of every CBL payload.
pub const LENGTH_PREFIX_LEN: usize = 4;

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    version: u8,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<CblKind>,
    #[serde(flatten)]
    body: &'a T,
}

fn tagged<T: Serialize>(version: u8, kind: Option<CblKind>, body: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(&Tagged {
        version,
        kind,
        body,
    })
    .map_err(|e| StoreError::InvalidCblEncoding(e.to_string()))
}

/// Canonical JSON encoding of a CBL, without the length prefix.
pub fn serialize_cbl(cbl: &CblData) -> StoreResult<Vec<u8>> {
    match cbl {
        CblData::V1(c) => tagged(1, None, c),
        CblData::Regular(c) => tagged(2, Some(CblKind::Regular), c),
        CblData::Sub(c) => tagged(2, Some(CblKind::SubCbl), c),
        CblData::Super(c) => tagged(2, Some(CblKind::SuperCbl), c),
    }
}

/// Length-prefixed wire payload for a CBL.
pub fn encode_cbl_payload(cbl: &CblData) -> StoreResult<Vec<u8>> {
    let json = serialize_cbl(cbl)?;
    let len = u32::try_from(json.len()).map_err(|_| {
        StoreError::InvalidCblEncoding(format!("CBL of {} bytes is too large", json.len()))
    })?;
    let mut out = Vec::with_capacity(LENGTH_PREFIX_LEN + json.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Strip the length prefix and any trailing padding from a payload.
pub fn unframe(payload: &[u8]) -> StoreResult<&[u8]> {
    if payload.len() < LENGTH_PREFIX_LEN {
        return Err(StoreError::InvalidCblEncoding(format!(
            "payload of {} bytes has no length prefix",
            payload.len()
        )));
    }
    let (prefix, rest) = payload.split_at(LENGTH_PREFIX_LEN);
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if len > rest.len() {
        return Err(StoreError::InvalidCblEncoding(format!(
            "length prefix {} exceeds payload of {} bytes",
            len,
            rest.len()
        )));
    }
    Ok(&rest[..len])
}

/// Anything `parse_cbl_data` accepts.
#[derive(Debug, Clone)]
pub enum CblInput<'a> {
    /// Length-prefixed wire payload, possibly padded.
    Payload(&'a [u8]),
    /// JSON text.
    Text(&'a str),
    /// Already-decoded JSON value.
    Value(Value),
    /// Already-typed CBL; only validated.
    Structured(CblData),
}

impl<'a> From<&'a str> for CblInput<'a> {
    fn from(s: &'a str) -> Self {
        CblInput::Text(s)
    }
}

impl<'a> From<&'a [u8]> for CblInput<'a> {
    fn from(b: &'a [u8]) -> Self {
        CblInput::Payload(b)
    }
}

impl From<Value> for CblInput<'_> {
    fn from(v: Value) -> Self {
        CblInput::Value(v)
    }
}

impl From<CblData> for CblInput<'_> {
    fn from(c: CblData) -> Self {
        CblInput::Structured(c)
    }
}

/// Parse any supported input into a validated CBL.
pub fn parse_cbl_data<'a>(input: impl Into<CblInput<'a>>) -> StoreResult<CblData> {
    let cbl = match input.into() {
        CblInput::Payload(bytes) => {
            let json = unframe(bytes)?;
            from_value(decode_json(json)?)?
        }
        CblInput::Text(text) => from_value(decode_json(text.as_bytes())?)?,
        CblInput::Value(value) => from_value(value)?,
        CblInput::Structured(cbl) => cbl,
    };
    cbl.validate()?;
    debug!(
        version = cbl.version(),
        kind = cbl.kind().as_str(),
        "parsed CBL"
    );
    Ok(cbl)
}

fn decode_json(bytes: &[u8]) -> StoreResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::InvalidCblEncoding(e.to_string()))
}

fn from_value(value: Value) -> StoreResult<CblData> {
    let version = value
        .get("version")
        .ok_or_else(|| StoreError::InvalidCblEncoding("missing version".to_string()))?
        .as_u64()
        .ok_or_else(|| StoreError::InvalidCblEncoding("version is not an integer".to_string()))?;

    match version {
        1 => Ok(CblData::V1(typed::<CblV1>(value)?)),
        2 => {
            let tag = value
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::InvalidCblEncoding("missing type".to_string()))?;
            match CblKind::from_tag(tag) {
                Some(CblKind::Regular) => Ok(CblData::Regular(typed::<RegularCbl>(value)?)),
                Some(CblKind::SubCbl) => Ok(CblData::Sub(typed::<SubCbl>(value)?)),
                Some(CblKind::SuperCbl) => Ok(CblData::Super(typed::<SuperCbl>(value)?)),
                None => Err(StoreError::InvalidCblEncoding(format!(
                    "unknown type {:?}",
                    tag
                ))),
            }
        }
        other => Err(StoreError::UnsupportedCblVersion(other)),
    }
}

fn typed<T: serde::de::DeserializeOwned>(value: Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|e| StoreError::InvalidCblEncoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{blake3_512, BlockId};
    use serde_json::json;

    fn ids(n: usize) -> Vec<BlockId> {
        (0..n).map(|i| blake3_512(&i.to_le_bytes())).collect()
    }

    fn samples() -> Vec<CblData> {
        vec![
            CblData::V1(CblV1 {
                file_name: "legacy.bin".into(),
                original_size: 10,
                block_size: 1024,
                block_count: 2,
                blocks: ids(2),
            }),
            CblData::Regular(RegularCbl {
                file_name: "a \"quoted\" name.txt".into(),
                original_size: 5000,
                block_size: 4096,
                block_count: 3,
                blocks: ids(3),
            }),
            CblData::Sub(SubCbl {
                file_name: "big.iso".into(),
                original_size: 1 << 30,
                block_size: 8192,
                sub_cbl_index: 1,
                total_sub_cbls: 4,
                block_count: 2,
                blocks: ids(2),
            }),
            CblData::Super(SuperCbl {
                file_name: "big.iso".into(),
                original_size: 1 << 30,
                block_size: 8192,
                total_block_count: 8,
                depth: 1,
                sub_cbl_count: 2,
                sub_cbl_magnet_urls: vec!["magnet:?a".into(), "magnet:?b".into()],
            }),
        ]
    }

    #[test]
    fn every_variant_round_trips_through_text_payload_and_value() {
        for cbl in samples() {
            let json = serialize_cbl(&cbl).unwrap();
            let text = std::str::from_utf8(&json).unwrap();
            assert_eq!(parse_cbl_data(text).unwrap(), cbl);

            let payload = encode_cbl_payload(&cbl).unwrap();
            assert_eq!(parse_cbl_data(payload.as_slice()).unwrap(), cbl);

            let value: Value = serde_json::from_slice(&json).unwrap();
            assert_eq!(parse_cbl_data(value).unwrap(), cbl);
        }
    }

    #[test]
    fn version_and_type_lead_the_object() {
        let json = serialize_cbl(&samples()[3]).unwrap();
        let text = String::from_utf8(json).unwrap();
        assert!(text.starts_with(r#"{"version":2,"type":"super-cbl","fileName""#));

        let v1 = String::from_utf8(serialize_cbl(&samples()[0]).unwrap()).unwrap();
        assert!(v1.starts_with(r#"{"version":1,"fileName""#));
        assert!(!v1.contains("\"type\""));
    }

    #[test]
    fn prefix_is_big_endian() {
        let payload = encode_cbl_payload(&samples()[1]).unwrap();
        let json_len = payload.len() - LENGTH_PREFIX_LEN;
        assert_eq!(&payload[..4], &(json_len as u32).to_be_bytes());
    }

    #[test]
    fn padded_payload_parses() {
        let cbl = samples()[2].clone();
        let mut payload = encode_cbl_payload(&cbl).unwrap();
        payload.resize(8192, 0);
        assert_eq!(parse_cbl_data(payload.as_slice()).unwrap(), cbl);
    }

    #[test]
    fn truncated_payload_is_invalid() {
        let payload = encode_cbl_payload(&samples()[1]).unwrap();
        let short = &payload[..payload.len() - 1];
        assert!(matches!(
            parse_cbl_data(short),
            Err(StoreError::InvalidCblEncoding(_))
        ));
        assert!(matches!(
            parse_cbl_data(&payload[..2]),
            Err(StoreError::InvalidCblEncoding(_))
        ));
    }

    #[test]
    fn malformed_text_is_invalid() {
        assert!(matches!(
            parse_cbl_data("{not json"),
            Err(StoreError::InvalidCblEncoding(_))
        ));
    }

    #[test]
    fn unknown_version_is_unsupported() {
        let value = json!({"version": 3, "fileName": "x"});
        assert!(matches!(
            parse_cbl_data(value),
            Err(StoreError::UnsupportedCblVersion(3))
        ));
    }

    #[test]
    fn v2_requires_known_type() {
        let missing = json!({"version": 2, "fileName": "x"});
        assert!(matches!(
            parse_cbl_data(missing),
            Err(StoreError::InvalidCblEncoding(_))
        ));
        let unknown = json!({"version": 2, "type": "mega-cbl"});
        assert!(matches!(
            parse_cbl_data(unknown),
            Err(StoreError::InvalidCblEncoding(_))
        ));
    }

    #[test]
    fn structural_violation_is_rejected_on_parse() {
        let value = json!({
            "version": 2,
            "type": "regular",
            "fileName": "x",
            "originalSize": 1,
            "blockSize": 1024,
            "blockCount": 5,
            "blocks": [],
        });
        assert!(matches!(
            parse_cbl_data(value),
            Err(StoreError::InvalidCblEncoding(_))
        ));
    }

    #[test]
    fn structured_input_is_validated() {
        let mut cbl = samples()[1].clone();
        assert!(parse_cbl_data(cbl.clone()).is_ok());
        if let CblData::Regular(c) = &mut cbl {
            c.blocks.pop();
        }
        assert!(parse_cbl_data(cbl).is_err());
    }
}
