//! Decodes the CBOR metadata trailer the Solidity compiler appends to deployed bytecode.
//!
//! Layout: `<runtime code><cbor map><2-byte big-endian length of the cbor map>`. Decoding failure
//! is never fatal to the caller: the original bytecode is kept intact and an empty record is
//! returned, matching the "non-fatal" rule in the component design.

use cid::Cid;
use multihash::Multihash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A decoded metadata trailer, plus the split views of the bytecode it was found in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// IPFS hash of the metadata document, multibase-encoded (`ipfs` key).
    pub ipfs: Option<String>,
    /// Swarm hash, hex-encoded (`bzzr0` key, pre-0.5.9 compilers).
    pub bzzr0: Option<String>,
    /// Swarm hash, hex-encoded (`bzzr1` key, 0.5.9+ compilers).
    pub bzzr1: Option<String>,
    /// Compiler version the trailer claims, dotted (`"0.8.19"`) or `"unknown"` if the claimed
    /// 3-byte encoding doesn't parse.
    pub solc: Option<String>,
    /// Whether the `experimental` flag was set.
    pub experimental: Option<bool>,
    /// Any recognized-but-unmodeled or unknown key, kept verbatim for forward compatibility.
    pub extra: BTreeMap<String, ciborium::Value>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.ipfs.is_none()
            && self.bzzr0.is_none()
            && self.bzzr1.is_none()
            && self.solc.is_none()
            && self.experimental.is_none()
            && self.extra.is_empty()
    }
}

/// Bytecode split into its runtime portion and, if present, the metadata trailer's decoded form
/// plus the raw bytes that made it up (`cbor` + 2-byte length).
pub struct Split {
    pub runtime: Vec<u8>,
    pub metadata: Metadata,
}

/// Attempts to locate and decode a metadata trailer at the tail of `bytecode`. On any failure
/// (too short, length exceeds available bytes, malformed CBOR) this returns the whole input as
/// `runtime` and an empty `Metadata` — per the component design, "no metadata" and "decode
/// failure" are the same outcome to the caller.
pub fn split(bytecode: &[u8]) -> Split {
    let Some((runtime, cbor)) = locate_trailer(bytecode) else {
        return Split { runtime: bytecode.to_vec(), metadata: Metadata::default() };
    };

    match decode_cbor_map(cbor) {
        Some(metadata) => Split { runtime: runtime.to_vec(), metadata },
        None => Split { runtime: bytecode.to_vec(), metadata: Metadata::default() },
    }
}

fn locate_trailer(bytecode: &[u8]) -> Option<(&[u8], &[u8])> {
    if bytecode.len() < 2 {
        return None;
    }
    let (body, length_bytes) = bytecode.split_at(bytecode.len() - 2);
    let length = u16::from_be_bytes([length_bytes[0], length_bytes[1]]) as usize;
    if length == 0 || length > body.len() {
        // claimed length exceeds available bytes: treat as "no metadata", not a failure
        return None;
    }
    let (runtime, cbor) = body.split_at(body.len() - length);
    Some((runtime, cbor))
}

fn decode_cbor_map(cbor: &[u8]) -> Option<Metadata> {
    let value: ciborium::Value = ciborium::de::from_reader(cbor).ok()?;
    let ciborium::Value::Map(entries) = value else { return None };

    let mut metadata = Metadata::default();
    for (key, value) in entries {
        let ciborium::Value::Text(key) = key else { continue };
        let key = key.to_lowercase();
        match key.as_str() {
            "ipfs" => metadata.ipfs = value.into_bytes().ok().map(|b| display_ipfs(&b)),
            "bzzr0" => metadata.bzzr0 = value.into_bytes().ok().map(hex::encode),
            "bzzr1" => metadata.bzzr1 = value.into_bytes().ok().map(hex::encode),
            "solc" => metadata.solc = value.into_bytes().ok().map(|b| display_solc_version(&b)),
            "experimental" => metadata.experimental = value.as_bool(),
            _ => {
                metadata.extra.insert(key, value);
            }
        }
    }
    Some(metadata)
}

/// Renders the raw IPFS hash bytes as a CIDv0 (dag-pb, sha2-256) multibase string. Falls back to
/// plain hex if the bytes don't parse as a valid multihash — a decode failure here must not
/// propagate as a hard error since it only affects one display field.
fn display_ipfs(raw: &[u8]) -> String {
    Multihash::<64>::from_bytes(raw)
        .ok()
        .and_then(|mh| Cid::new_v0(mh).ok())
        .map(|cid| cid.to_string())
        .unwrap_or_else(|| hex::encode(raw))
}

fn display_solc_version(raw: &[u8]) -> String {
    match raw {
        [major, minor, patch] => format!("{major}.{minor}.{patch}"),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_trailer(map: Vec<(&str, ciborium::Value)>) -> Vec<u8> {
        let value = ciborium::Value::Map(
            map.into_iter().map(|(k, v)| (ciborium::Value::Text(k.to_string()), v)).collect(),
        );
        let mut cbor = Vec::new();
        ciborium::ser::into_writer(&value, &mut cbor).unwrap();
        let mut out = b"\x60\x60\x60runtime".to_vec();
        out.extend_from_slice(&cbor);
        out.extend_from_slice(&(cbor.len() as u16).to_be_bytes());
        out
    }

    #[test]
    fn decodes_solc_version_and_bzzr1() {
        let bytecode = encode_trailer(vec![
            ("solc", ciborium::Value::Bytes(vec![0, 8, 19])),
            ("bzzr1", ciborium::Value::Bytes(vec![0xab, 0xcd])),
        ]);
        let split = split(&bytecode);
        assert_eq!(split.metadata.solc.as_deref(), Some("0.8.19"));
        assert_eq!(split.metadata.bzzr1.as_deref(), Some("abcd"));
        assert_eq!(split.runtime, b"\x60\x60\x60runtime");
    }

    #[test]
    fn malformed_trailer_is_non_fatal() {
        let mut bytecode = b"\x60\x60\x60runtime".to_vec();
        bytecode.extend_from_slice(&[0xff, 0xff]); // claims 65535 bytes of cbor, far too long
        let split = split(&bytecode);
        assert!(split.metadata.is_empty());
        assert_eq!(split.runtime, bytecode);
    }

    #[test]
    fn too_short_is_non_fatal() {
        let split = split(&[0x01]);
        assert!(split.metadata.is_empty());
    }
}
