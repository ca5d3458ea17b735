//! Notary configuration with TOML file support.

use notary_types::{Network, NotaryParams};
use notary_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::escalate::FeePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration for the notary CLI.
///
/// Loaded from a TOML file via [`NotaryConfig::from_toml_file`]; command-line
/// flags and `NOTARY_*` environment variables override individual fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryConfig {
    /// Network the ledger node runs on.
    #[serde(default = "default_network")]
    pub network: Network,

    /// JSON-RPC endpoint of the ledger node, including the wallet path if the
    /// node has several wallets loaded.
    #[serde(default = "default_node_url")]
    pub node_url: String,

    #[serde(default)]
    pub rpc_user: String,

    #[serde(default)]
    pub rpc_password: String,

    /// Per-request timeout for the node and the content store.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// IPFS HTTP API base URL.
    #[serde(default = "default_ipfs_url")]
    pub ipfs_url: String,

    /// Confirmation target for fee estimation, in blocks.
    #[serde(default = "default_fee_target_blocks")]
    pub fee_target_blocks: u32,

    /// Directory holding the transaction log and certificates.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Schedule for overdue notarizations (`[escalation]` table).
    #[serde(default)]
    pub escalation: FeePolicy,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> Network {
    Network::Main
}

fn default_node_url() -> String {
    format!("http://127.0.0.1:{}", Network::Main.default_rpc_port())
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

fn default_ipfs_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_fee_target_blocks() -> u32 {
    NotaryParams::FEE_TARGET_BLOCKS
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NotaryConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Engine parameters for this deployment.
    pub fn params(&self) -> NotaryParams {
        NotaryParams {
            fee_target_blocks: self.fee_target_blocks,
            ..NotaryParams::for_network(self.network)
        }
    }
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            node_url: default_node_url(),
            rpc_user: String::new(),
            rpc_password: String::new(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            ipfs_url: default_ipfs_url(),
            fee_target_blocks: default_fee_target_blocks(),
            data_dir: default_data_dir(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            escalation: FeePolicy::default(),
        }
    }
}
