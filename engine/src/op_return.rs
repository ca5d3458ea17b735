//! OP_RETURN payload codec.
//!
//! Current scheme: the data output carries the UTF-8 text `"{cid}::{xid58}"`,
//! where `xid58` is the base58 of the asset UUID's 16 bytes.
//!
//! Legacy scheme (read-only): the data output carries a bare binary CID, 34
//! bytes for a CIDv0 multihash or 36 bytes for a dag-pb CIDv1. The xid then
//! lives in the content store's metadata for that CID.

use notary_types::{Cid, ScriptPubKey, Xid};
use thiserror::Error;

pub const OP_RETURN: u8 = 0x6a;

/// Largest push expressible as a single length byte.
pub const MAX_DIRECT_PUSH: u8 = 0x4b;

pub const SEPARATOR: &str = "::";

/// What a valid data output carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Inline { cid: Cid, xid: Xid, text: String },
    Legacy { cid: Cid },
}

impl Payload {
    pub fn cid(&self) -> &Cid {
        match self {
            Self::Inline { cid, .. } | Self::Legacy { cid } => cid,
        }
    }
}

/// Why an output is not a notarization payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("output script type is {0}, not nulldata")]
    NotNullData(String),

    #[error("transaction has no data output")]
    MissingOutput,

    #[error("script is not valid hex")]
    BadScriptHex,

    #[error("script does not start with OP_RETURN")]
    MissingOpReturn,

    #[error("push declares {declared} bytes, script carries {actual}")]
    UnexpectedPushLength { declared: usize, actual: usize },

    #[error("payload is not UTF-8")]
    NotUtf8,

    #[error("payload has no `::` separator")]
    MissingSeparator,

    #[error("payload has an empty cid")]
    EmptyCid,

    #[error("payload cid is invalid: {0}")]
    InvalidCid(String),

    #[error("payload xid is invalid: {0}")]
    InvalidXid(String),

    #[error("payload is not in canonical form")]
    NonCanonical,

    #[error("no xid in content metadata for {0}")]
    NoXidInMetadata(Cid),
}

/// Payload bytes for `(cid, xid)`.
pub fn encode(cid: &Cid, xid: &Xid) -> Vec<u8> {
    format!("{cid}{SEPARATOR}{}", xid.to_base58()).into_bytes()
}

/// Full nulldata script for a payload: `OP_RETURN <push> <payload>`. Only
/// direct pushes are built; the node assembles production scripts.
#[cfg(test)]
pub(crate) fn script_bytes(payload: &[u8]) -> Vec<u8> {
    let len = u8::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_DIRECT_PUSH)
        .expect("payload too long for a direct push");
    let mut script = Vec::with_capacity(payload.len() + 2);
    script.push(OP_RETURN);
    script.push(len);
    script.extend_from_slice(payload);
    script
}

/// Raw pushed bytes of a nulldata script, checking the push is a single
/// direct push that covers exactly the rest of the script.
pub fn pushed_bytes(script: &ScriptPubKey) -> Result<Vec<u8>, DecodeError> {
    if !script.is_nulldata() {
        return Err(DecodeError::NotNullData(script.kind.clone()));
    }
    let bytes = hex::decode(&script.hex).map_err(|_| DecodeError::BadScriptHex)?;
    match bytes.as_slice() {
        [OP_RETURN, declared, payload @ ..] => {
            if *declared > MAX_DIRECT_PUSH || usize::from(*declared) != payload.len() {
                return Err(DecodeError::UnexpectedPushLength {
                    declared: usize::from(*declared),
                    actual: payload.len(),
                });
            }
            Ok(payload.to_vec())
        }
        [OP_RETURN] => Err(DecodeError::UnexpectedPushLength {
            declared: 0,
            actual: 0,
        }),
        _ => Err(DecodeError::MissingOpReturn),
    }
}

/// Decode and validate a candidate data output.
pub fn decode(script: &ScriptPubKey) -> Result<Payload, DecodeError> {
    let payload = pushed_bytes(script)?;

    match payload.len() {
        Cid::MULTIHASH_LEN => Cid::from_multihash(&payload)
            .map(|cid| Payload::Legacy { cid })
            .map_err(|e| DecodeError::InvalidCid(e.to_string())),
        Cid::V1_BINARY_LEN => Cid::from_v1_bytes(&payload)
            .map(|cid| Payload::Legacy { cid })
            .map_err(|e| DecodeError::InvalidCid(e.to_string())),
        _ => decode_inline(&payload),
    }
}

fn decode_inline(payload: &[u8]) -> Result<Payload, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
    let (cid, xid58) = text
        .split_once(SEPARATOR)
        .ok_or(DecodeError::MissingSeparator)?;
    if cid.is_empty() {
        return Err(DecodeError::EmptyCid);
    }
    let cid = Cid::parse(cid).map_err(|e| DecodeError::InvalidCid(e.to_string()))?;
    let xid = Xid::from_base58(xid58).map_err(|e| DecodeError::InvalidXid(e.to_string()))?;

    // the push length must be the one this encoding produces for (cid, xid)
    if encode(&cid, &xid) != payload {
        return Err(DecodeError::NonCanonical);
    }

    Ok(Payload::Inline {
        cid,
        xid,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const XID: &str = "d59d815c-1b23-4de4-a6a9-ed8ca1060184";
    const CID: &str = "QmQiqxe6DfgmNj1JTe7Xk2hVQkgEqmMjRy6tuffqcTLJaB";

    fn nulldata(script: &[u8]) -> ScriptPubKey {
        ScriptPubKey {
            kind: ScriptPubKey::NULLDATA.to_string(),
            hex: hex::encode(script),
            address: None,
        }
    }

    fn sample() -> (Cid, Xid) {
        (Cid::parse(CID).unwrap(), XID.parse().unwrap())
    }

    #[test]
    fn encodes_cid_and_base58_xid() {
        let (cid, xid) = sample();
        let payload = encode(&cid, &xid);
        let text = String::from_utf8(payload.clone()).unwrap();
        assert!(text.starts_with(&format!("{CID}::")));
        assert_eq!(text, format!("{CID}::{}", xid.to_base58()));
        // 46-char CIDv0, separator, 22-char xid58
        assert_eq!(payload.len(), 70);
    }

    #[test]
    #[should_panic(expected = "direct push")]
    fn script_builder_refuses_long_payloads() {
        script_bytes(&[0x61; 76]);
    }

    #[test]
    fn roundtrip() {
        let (cid, xid) = sample();
        let script = nulldata(&script_bytes(&encode(&cid, &xid)));
        match decode(&script).unwrap() {
            Payload::Inline { cid: c, xid: x, text } => {
                assert_eq!(c, cid);
                assert_eq!(x, xid);
                assert!(text.contains("::"));
            }
            other => panic!("expected inline payload, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_nulldata() {
        let (cid, xid) = sample();
        let mut script = nulldata(&script_bytes(&encode(&cid, &xid)));
        script.kind = "witness_v0_keyhash".into();
        assert_eq!(
            decode(&script),
            Err(DecodeError::NotNullData("witness_v0_keyhash".into()))
        );
    }

    #[test]
    fn rejects_missing_op_return() {
        let (cid, xid) = sample();
        let mut bytes = script_bytes(&encode(&cid, &xid));
        bytes[0] = 0x51;
        assert_eq!(decode(&nulldata(&bytes)), Err(DecodeError::MissingOpReturn));
    }

    #[test]
    fn rejects_wrong_push_length() {
        let (cid, xid) = sample();
        let mut bytes = script_bytes(&encode(&cid, &xid));
        bytes[1] = 69;
        assert!(matches!(
            decode(&nulldata(&bytes)),
            Err(DecodeError::UnexpectedPushLength { declared: 69, actual: 70 })
        ));
    }

    #[test]
    fn rejects_bare_op_return() {
        assert!(matches!(
            decode(&nulldata(&[OP_RETURN])),
            Err(DecodeError::UnexpectedPushLength { .. })
        ));
    }

    #[test]
    fn rejects_missing_separator() {
        let payload = format!("{CID}-{}", "x".repeat(22));
        let script = nulldata(&script_bytes(payload.as_bytes()));
        assert_eq!(decode(&script), Err(DecodeError::MissingSeparator));
    }

    #[test]
    fn rejects_empty_cid() {
        let (_, xid) = sample();
        let payload = format!("::{}", xid.to_base58());
        let script = nulldata(&script_bytes(payload.as_bytes()));
        assert_eq!(decode(&script), Err(DecodeError::EmptyCid));
    }

    #[test]
    fn rejects_short_xid() {
        let payload = format!("{CID}::{}", bs58::encode([1u8; 8]).into_string());
        let script = nulldata(&script_bytes(payload.as_bytes()));
        assert!(matches!(decode(&script), Err(DecodeError::InvalidXid(_))));
    }

    #[test]
    fn rejects_non_utf8() {
        let script = nulldata(&script_bytes(&[0xff; 40]));
        assert_eq!(decode(&script), Err(DecodeError::NotUtf8));
    }

    #[test]
    fn decodes_legacy_v0_multihash() {
        let multihash = bs58::decode(CID).into_vec().unwrap();
        let script = nulldata(&script_bytes(&multihash));
        assert_eq!(
            decode(&script),
            Ok(Payload::Legacy {
                cid: Cid::parse(CID).unwrap()
            })
        );
    }

    #[test]
    fn decodes_legacy_v1_bytes() {
        let mut v1 = vec![0x01, 0x70];
        v1.extend(bs58::decode(CID).into_vec().unwrap());
        let script = nulldata(&script_bytes(&v1));
        assert_eq!(decode(&script).unwrap().cid().as_str(), CID);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(digest in prop::array::uniform32(0u8..), uuid in prop::array::uniform16(0u8..)) {
            let mut multihash = vec![0x12, 0x20];
            multihash.extend_from_slice(&digest);
            let cid = Cid::from_multihash(&multihash).unwrap();
            let xid = Xid::from_bytes(uuid);
            let script = nulldata(&script_bytes(&encode(&cid, &xid)));
            match decode(&script) {
                Ok(Payload::Inline { cid: c, xid: x, .. }) => {
                    prop_assert_eq!(c, cid);
                    prop_assert_eq!(x, xid);
                }
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
