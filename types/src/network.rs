//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Which Bitcoin network the ledger node runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
    Signet,
    Regtest,
}

impl Network {
    /// Default JSON-RPC port of the node on this network.
    pub fn default_rpc_port(&self) -> u16 {
        match self {
            Self::Main => 8332,
            Self::Test => 18332,
            Self::Signet => 38332,
            Self::Regtest => 18443,
        }
    }

    /// Ledger label used in chain position URNs.
    pub fn ledger_label(&self) -> &'static str {
        "BTC"
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Signet => "signet",
            Self::Regtest => "regtest",
        }
    }
}

impl FromStr for Network {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" | "bitcoin" => Ok(Self::Main),
            "test" | "testnet" => Ok(Self::Test),
            "signet" => Ok(Self::Signet),
            "regtest" => Ok(Self::Regtest),
            other => Err(TypesError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
