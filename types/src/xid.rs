//! External asset identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TypesError;
use crate::hash::Txid;

/// A UUID naming a logical asset independently of its current content.
///
/// Also used for certificate identities, which are name-based (v5) UUIDs
/// derived from an asset xid and a transaction id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Xid(Uuid);

impl Xid {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Base58 (Bitcoin alphabet) of the 16 raw bytes, as carried on-chain.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0.as_bytes()).into_string()
    }

    /// Parse the base58 form back into an xid. The decoded value must be
    /// exactly 16 bytes.
    pub fn from_base58(s: &str) -> Result<Self, TypesError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TypesError::InvalidXid(format!("{s}: {e}")))?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| TypesError::InvalidXid(format!("{s}: {} bytes", v.len())))?;
        Ok(Self::from_bytes(bytes))
    }

    /// Deterministic name-based identity of the certificate for `txid`,
    /// namespaced by this asset xid.
    pub fn certificate_id(&self, txid: &Txid) -> Xid {
        Xid(Uuid::new_v5(&self.0, txid.to_string().as_bytes()))
    }
}

impl FromStr for Xid {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypesError::InvalidXid(format!("{s}: {e}")))
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XID: &str = "d59d815c-1b23-4de4-a6a9-ed8ca1060184";

    #[test]
    fn parses_hyphenated_uuid() {
        let xid: Xid = XID.parse().unwrap();
        assert_eq!(xid.to_string(), XID);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-uuid".parse::<Xid>().is_err());
        assert!("".parse::<Xid>().is_err());
    }

    #[test]
    fn base58_roundtrip() {
        let xid: Xid = XID.parse().unwrap();
        let encoded = xid.to_base58();
        assert_eq!(Xid::from_base58(&encoded).unwrap(), xid);
    }

    #[test]
    fn base58_wrong_length_rejected() {
        // 32 bytes of a sha256 digest, not a UUID
        let encoded = bs58::encode([7u8; 32]).into_string();
        assert!(Xid::from_base58(&encoded).is_err());
        assert!(Xid::from_base58("0OIl").is_err());
    }

    #[test]
    fn certificate_id_is_stable() {
        let xid: Xid = XID.parse().unwrap();
        let txid: Txid = "772fbd4d043f30d6843bd2c68eeb5b5b6e80d1579da41f8281b3511fc26cb798"
            .parse()
            .unwrap();
        let a = xid.certificate_id(&txid);
        let b = xid.certificate_id(&txid);
        assert_eq!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 5);
        assert_ne!(a, xid);
    }

    #[test]
    fn certificate_id_depends_on_namespace() {
        let a: Xid = XID.parse().unwrap();
        let b: Xid = "00000000-0000-4000-8000-000000000001".parse().unwrap();
        let txid = Txid::new([1u8; 32]);
        assert_ne!(a.certificate_id(&txid), b.certificate_id(&txid));
    }
}
