//! Content identifiers (IPFS CIDv0).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Multihash code for sha2-256.
const SHA2_256: u8 = 0x12;
/// Digest length of sha2-256.
const DIGEST_LEN: u8 = 0x20;
/// CID version byte for CIDv1.
const CID_V1: u8 = 0x01;
/// Multicodec for dag-pb, the only codec a CIDv0 can express.
const DAG_PB: u8 = 0x70;

/// A version-0 content identifier: the base58 form of a sha2-256 multihash,
/// always 46 characters starting with `Qm`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid(String);

impl Cid {
    /// Length of a CIDv0 string.
    pub const V0_LEN: usize = 46;
    /// Length of the binary multihash behind a CIDv0.
    pub const MULTIHASH_LEN: usize = 34;
    /// Length of a binary CIDv1 (dag-pb, sha2-256).
    pub const V1_BINARY_LEN: usize = 36;

    pub fn parse(s: &str) -> Result<Self, TypesError> {
        if s.len() != Self::V0_LEN || !s.starts_with("Qm") {
            return Err(TypesError::InvalidCid(s.to_string()));
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TypesError::InvalidCid(format!("{s}: {e}")))?;
        Self::from_multihash(&bytes).map_err(|_| TypesError::InvalidCid(s.to_string()))
    }

    /// Build from a raw sha2-256 multihash (`0x12 0x20 <32 bytes>`).
    pub fn from_multihash(bytes: &[u8]) -> Result<Self, TypesError> {
        match bytes {
            [SHA2_256, DIGEST_LEN, digest @ ..] if digest.len() == DIGEST_LEN as usize => {
                Ok(Self(bs58::encode(bytes).into_string()))
            }
            _ => Err(TypesError::InvalidCid(format!(
                "not a sha2-256 multihash ({} bytes)",
                bytes.len()
            ))),
        }
    }

    /// Build from a binary CIDv1, converting it to v0. Only dag-pb with a
    /// sha2-256 digest has a v0 form.
    pub fn from_v1_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        match bytes {
            [CID_V1, DAG_PB, multihash @ ..] => Self::from_multihash(multihash),
            _ => Err(TypesError::InvalidCid(format!(
                "not a dag-pb CIDv1 ({} bytes)",
                bytes.len()
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Cid {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cid {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID_A: &str = "QmQiqxe6DfgmNj1JTe7Xk2hVQkgEqmMjRy6tuffqcTLJaB";
    const CID_B: &str = "QmbNcW8SqNvJ7QuX5zQhQ7fgUtFK8W2gx7GnEgCsPaqGf4";

    #[test]
    fn parses_v0() {
        assert_eq!(Cid::parse(CID_A).unwrap().as_str(), CID_A);
        assert_eq!(Cid::parse(CID_B).unwrap().as_str(), CID_B);
    }

    #[test]
    fn rejects_non_cids() {
        assert!(Cid::parse("not-a-cid").is_err());
        assert!(Cid::parse("").is_err());
        // right length, wrong prefix
        assert!(Cid::parse("Xm7Qiqxe6DfgmNj1JTe7Xk2hVQkgEqmMjRy6tuffqcTLJa").is_err());
        // CIDv1 base32 string
        assert!(Cid::parse("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").is_err());
    }

    #[test]
    fn multihash_roundtrip() {
        let cid = Cid::parse(CID_A).unwrap();
        let bytes = bs58::decode(CID_A).into_vec().unwrap();
        assert_eq!(bytes.len(), Cid::MULTIHASH_LEN);
        assert_eq!(Cid::from_multihash(&bytes).unwrap(), cid);
    }

    #[test]
    fn v1_converts_to_v0() {
        let multihash = bs58::decode(CID_B).into_vec().unwrap();
        let mut v1 = vec![CID_V1, DAG_PB];
        v1.extend_from_slice(&multihash);
        assert_eq!(v1.len(), Cid::V1_BINARY_LEN);
        assert_eq!(Cid::from_v1_bytes(&v1).unwrap().as_str(), CID_B);
    }

    #[test]
    fn v1_with_raw_codec_rejected() {
        let multihash = bs58::decode(CID_B).into_vec().unwrap();
        let mut v1 = vec![CID_V1, 0x55];
        v1.extend_from_slice(&multihash);
        assert!(Cid::from_v1_bytes(&v1).is_err());
    }

    #[test]
    fn serde_validates() {
        let ok: Result<Cid, _> = serde_json::from_str(&format!("\"{CID_A}\""));
        assert!(ok.is_ok());
        let bad: Result<Cid, _> = serde_json::from_str("\"not-a-cid\"");
        assert!(bad.is_err());
    }
}
