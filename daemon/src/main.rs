//! `notary`: notarize asset states on Bitcoin and certify them.

mod config;
mod escalate;
mod monitor;
mod txnlog;

use anyhow::Context;
use clap::Parser;
use config::NotaryConfig;
use notary_engine::{NotarizeOutcome, Notary};
use notary_rpc::{BitcoindClient, IpfsClient};
use notary_types::{Amount, Network, Timestamp, Txid};
use notary_utils::{format_btc, LogFormat};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use txnlog::TxnLog;

type RpcNotary = Notary<BitcoindClient, IpfsClient>;

#[derive(Parser)]
#[command(name = "notary", about = "Notarize asset states on Bitcoin", version)]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "NOTARY_CONFIG")]
    config: Option<PathBuf>,

    /// Network the node runs on: "main", "test", "signet" or "regtest".
    #[arg(long, env = "NOTARY_NETWORK")]
    network: Option<Network>,

    /// Node JSON-RPC URL, including `/wallet/<name>` if needed.
    #[arg(long, env = "NOTARY_NODE_URL")]
    node_url: Option<String>,

    #[arg(long, env = "NOTARY_RPC_USER")]
    rpc_user: Option<String>,

    #[arg(long, env = "NOTARY_RPC_PASSWORD", hide_env_values = true)]
    rpc_password: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "NOTARY_RPC_TIMEOUT")]
    rpc_timeout_secs: Option<u64>,

    #[arg(long, env = "NOTARY_IPFS_URL")]
    ipfs_url: Option<String>,

    /// Directory for the transaction log and certificates.
    #[arg(long, env = "NOTARY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log output: "human" or "json".
    #[arg(long, env = "NOTARY_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "NOTARY_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Register a new asset at its first content id.
    Register {
        xid: String,
        cid: String,
        /// Fee ceiling in satoshi.
        #[arg(long)]
        fee_limit: Option<u64>,
    },
    /// Point a registered asset at a new content id.
    Notarize {
        xid: String,
        cid: String,
        /// Fee ceiling in satoshi.
        #[arg(long)]
        fee_limit: Option<u64>,
    },
    /// Replace a pending notarization with one paying a higher fee.
    Bump {
        txid: Txid,
        /// New absolute fee in satoshi.
        #[arg(long)]
        fee: u64,
    },
    /// Print the certificate of a confirmed notarization.
    Certify {
        txid: Txid,
        /// Also write it under the data directory.
        #[arg(long)]
        save: bool,
    },
    /// Staked and spendable totals, plus the assets held.
    Balance,
    /// A fresh address to fund the wallet.
    Fund,
    /// Wallet summary and how many notarizations it affords.
    Walletinfo,
    /// Certify the pending notarization if it has confirmed.
    Monitor,
    /// Re-notarize an overdue asset, raising the fee with each hour late.
    Escalate { xid: String, cid: String },
    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    /// File settings (or defaults) with flags and env vars applied on top.
    fn resolve_config(&self) -> anyhow::Result<NotaryConfig> {
        let mut config = match &self.config {
            Some(path) => NotaryConfig::from_toml_file(path)?,
            None => NotaryConfig::default(),
        };
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(url) = &self.node_url {
            config.node_url = url.clone();
        }
        if let Some(user) = &self.rpc_user {
            config.rpc_user = user.clone();
        }
        if let Some(password) = &self.rpc_password {
            config.rpc_password = password.clone();
        }
        if let Some(secs) = self.rpc_timeout_secs {
            config.rpc_timeout_secs = secs;
        }
        if let Some(url) = &self.ipfs_url {
            config.ipfs_url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}

fn build_notary(config: &NotaryConfig) -> anyhow::Result<RpcNotary> {
    let node = BitcoindClient::new(
        config.node_url.as_str(),
        config.rpc_user.as_str(),
        config.rpc_password.as_str(),
        config.rpc_timeout(),
    )
    .context("creating node client")?;
    let content = IpfsClient::new(config.ipfs_url.as_str(), config.rpc_timeout())
        .context("creating IPFS client")?;
    Ok(Notary::new(node, content, config.params()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    notary_utils::init_logging(config.log_format, &config.log_level)?;

    info!(
        network = %config.network,
        node = %config.node_url,
        data_dir = %config.data_dir.display(),
        "notary starting"
    );

    let notary = build_notary(&config)?;
    let data_dir = config.data_dir.as_path();

    match cli.command {
        Command::Register {
            xid,
            cid,
            fee_limit,
        } => notarize(&notary, &config, &xid, &cid, true, fee_limit).await?,
        Command::Notarize {
            xid,
            cid,
            fee_limit,
        } => notarize(&notary, &config, &xid, &cid, false, fee_limit).await?,
        Command::Bump { txid, fee } => {
            let replacement = notary.bump_fee(&txid, Amount::from_sat(fee)).await?;
            let mut log = TxnLog::load(data_dir)?;
            if log.pending.is_none() || log.pending == Some(txid) {
                log.record_pending(replacement);
                log.save(data_dir)?;
            }
            print_json(&json!({ "replaced": txid, "txid": replacement }))?;
        }
        Command::Certify { txid, save } => {
            let cert = notary.certify(&txid).await?;
            if save {
                let path = txnlog::write_certificate(data_dir, &cert)?;
                info!(path = %path.display(), "certificate written");
            }
            print_json(&cert)?;
        }
        Command::Balance => {
            let snapshot = notary.wallet_snapshot().await?;
            let assets: Vec<_> = snapshot
                .assets
                .iter()
                .map(|a| json!({ "xid": a.auth.xid, "cid": a.auth.cid, "txid": a.utxo.txid }))
                .collect();
            print_json(&json!({
                "staked": format_btc(snapshot.staked_total),
                "spendable": format_btc(snapshot.spendable_total),
                "funds": snapshot.funds.len(),
                "assets": assets,
            }))?;
        }
        Command::Fund => {
            let address = notary.funding_address().await?;
            print_json(&json!({ "address": address }))?;
        }
        Command::Walletinfo => print_json(&notary.wallet_report().await?)?,
        Command::Monitor => {
            let mut log = TxnLog::load(data_dir)?;
            let outcome = monitor::check_pending(&notary, &mut log, data_dir).await?;
            print_json(&outcome)?;
        }
        Command::Escalate { xid, cid } => {
            let mut log = TxnLog::load(data_dir)?;
            let outcome = escalate::escalate(
                &notary,
                &mut log,
                &xid,
                &cid,
                &config.escalation,
                Timestamp::now(),
            )
            .await?;
            log.save(data_dir)?;
            print_json(&outcome)?;
        }
        Command::Config => print!("{}", config.to_toml_string()?),
    }

    Ok(())
}

async fn notarize(
    notary: &RpcNotary,
    config: &NotaryConfig,
    xid: &str,
    cid: &str,
    register: bool,
    fee_limit: Option<u64>,
) -> anyhow::Result<()> {
    let outcome = notary
        .notarize(xid, cid, register, fee_limit.map(Amount::from_sat))
        .await?;
    if let NotarizeOutcome::Broadcast(txid) = outcome {
        let mut log = TxnLog::load(&config.data_dir)?;
        log.record_pending(txid);
        log.save(&config.data_dir)?;
    }
    print_json(&outcome)
}
