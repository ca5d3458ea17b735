//! bitcoind JSON-RPC client.

use async_trait::async_trait;
use notary_ledger::{LedgerError, LedgerNode};
use notary_types::{
    Address, Amount, BlockHash, BlockInfo, FeeRate, LedgerTransaction, MempoolEntry, TxInput,
    TxOutput, Txid, Utxo, WalletInfo,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::RpcError;

/// Default timeout for node requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a bitcoind node and its loaded wallet.
///
/// Speaks JSON-RPC 1.0 with HTTP basic auth. Every call is a single request
/// with no retry.
#[derive(Clone)]
pub struct BitcoindClient {
    http: reqwest::Client,
    url: String,
    user: String,
    password: String,
}

impl BitcoindClient {
    /// Create a client for `url` (e.g. `http://127.0.0.1:8332/wallet/notary`).
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| RpcError::Client(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            user: user.into(),
            password: password.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a request and return the `result` field.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, "bitcoind call");
        let body = json!({
            "jsonrpc": "1.0",
            "id": "notary",
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(RpcError::from_reqwest)?;

        // bitcoind reports RPC errors with a non-2xx status and a JSON body
        let status = response.status();
        let bytes = response.bytes().await.map_err(RpcError::from_reqwest)?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(json) => parse_response(json),
            Err(_) if !status.is_success() => Err(RpcError::Status(status.as_u16())),
            Err(e) => Err(RpcError::InvalidResponse(format!("invalid JSON response: {e}"))),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let result = self.rpc_call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
    }
}

/// Split a JSON-RPC response into its result or error.
pub(crate) fn parse_response(json: Value) -> Result<Value, RpcError> {
    match json.get("error") {
        Some(err) if !err.is_null() => Err(RpcError::Node {
            code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }),
        _ => json
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::InvalidResponse("missing result".into())),
    }
}

/// `createrawtransaction` inputs.
pub(crate) fn inputs_json(inputs: &[TxInput]) -> Value {
    Value::Array(
        inputs
            .iter()
            .map(|i| json!({ "txid": i.txid.to_string(), "vout": i.vout, "sequence": i.sequence }))
            .collect(),
    )
}

/// `createrawtransaction` outputs in array form, which keeps their order.
/// Amounts are exact decimal strings.
pub(crate) fn outputs_json(outputs: &[TxOutput]) -> Value {
    Value::Array(
        outputs
            .iter()
            .map(|o| match o {
                TxOutput::Data(payload) => json!({ "data": hex::encode(payload) }),
                TxOutput::Payment { address, amount } => {
                    let mut entry = serde_json::Map::new();
                    entry.insert(address.to_string(), Value::String(amount.to_btc_string()));
                    Value::Object(entry)
                }
            })
            .collect(),
    )
}

#[derive(Deserialize)]
struct FeeEstimate {
    #[serde(default)]
    feerate: Option<f64>,
}

pub(crate) fn parse_fee_estimate(result: Value, target_blocks: u32) -> Result<FeeRate, LedgerError> {
    let estimate: FeeEstimate = serde_json::from_value(result)
        .map_err(|e| LedgerError::InvalidResponse(format!("estimatesmartfee: {e}")))?;
    let btc = estimate
        .feerate
        .ok_or(LedgerError::NoFeeEstimate { target_blocks })?;
    FeeRate::from_btc_per_kvb(btc).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
}

#[derive(Deserialize)]
struct SignResult {
    hex: String,
    complete: bool,
}

#[derive(Deserialize)]
struct RawMempoolEntry {
    #[serde(default)]
    vsize: u64,
    #[serde(default)]
    fees: Option<MempoolFees>,
    /// Pre-0.22 nodes report the fee at the top level.
    #[serde(default)]
    fee: Option<f64>,
}

#[derive(Deserialize)]
struct MempoolFees {
    base: f64,
}

pub(crate) fn parse_mempool_entry(result: Value) -> Result<MempoolEntry, LedgerError> {
    let raw: RawMempoolEntry = serde_json::from_value(result)
        .map_err(|e| LedgerError::InvalidResponse(format!("getmempoolentry: {e}")))?;
    let btc = raw
        .fees
        .map(|f| f.base)
        .or(raw.fee)
        .ok_or_else(|| LedgerError::InvalidResponse("getmempoolentry: no fee".into()))?;
    Ok(MempoolEntry {
        fee: Amount::from_btc(btc).map_err(|e| LedgerError::InvalidResponse(e.to_string()))?,
        vsize: raw.vsize,
    })
}

#[async_trait]
impl LedgerNode for BitcoindClient {
    async fn list_unspent(&self, min_conf: u32) -> Result<Vec<Utxo>, LedgerError> {
        // bitcoind defaults to minconf=1
        Ok(self.call("listunspent", json!([min_conf])).await?)
    }

    async fn get_raw_transaction(&self, txid: &Txid) -> Result<LedgerTransaction, LedgerError> {
        Ok(self
            .call("getrawtransaction", json!([txid.to_string(), true]))
            .await?)
    }

    async fn get_block(&self, hash: &BlockHash) -> Result<BlockInfo, LedgerError> {
        Ok(self.call("getblock", json!([hash.to_string(), 1])).await?)
    }

    async fn estimate_fee_rate(&self, target_blocks: u32) -> Result<FeeRate, LedgerError> {
        let result = self
            .rpc_call("estimatesmartfee", json!([target_blocks]))
            .await?;
        parse_fee_estimate(result, target_blocks)
    }

    async fn get_new_address(&self, label: &str) -> Result<Address, LedgerError> {
        let raw: String = self.call("getnewaddress", json!([label])).await?;
        Address::new(raw).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn create_raw_transaction(
        &self,
        inputs: &[TxInput],
        outputs: &[TxOutput],
    ) -> Result<String, LedgerError> {
        let params = json!([inputs_json(inputs), outputs_json(outputs), 0, true]);
        Ok(self.call("createrawtransaction", params).await?)
    }

    async fn sign_raw_transaction(&self, raw_hex: &str) -> Result<String, LedgerError> {
        let signed: SignResult = self
            .call("signrawtransactionwithwallet", json!([raw_hex]))
            .await?;
        if !signed.complete {
            return Err(LedgerError::Rpc {
                code: -4,
                message: "wallet could not sign every input".into(),
            });
        }
        Ok(signed.hex)
    }

    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<Txid, LedgerError> {
        let raw: String = self.call("sendrawtransaction", json!([signed_hex])).await?;
        raw.parse::<Txid>()
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn get_mempool_entry(&self, txid: &Txid) -> Result<MempoolEntry, LedgerError> {
        let result = self
            .rpc_call("getmempoolentry", json!([txid.to_string()]))
            .await?;
        parse_mempool_entry(result)
    }

    async fn get_wallet_info(&self) -> Result<WalletInfo, LedgerError> {
        Ok(self.call("getwalletinfo", json!([])).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;

    #[test]
    fn result_and_error_split() {
        let ok = json!({ "result": 42, "error": null, "id": "notary" });
        assert_eq!(parse_response(ok).unwrap(), json!(42));

        let err = json!({
            "result": null,
            "error": { "code": -5, "message": "No such mempool or blockchain transaction" },
            "id": "notary"
        });
        match parse_response(err) {
            Err(RpcError::Node { code, message }) => {
                assert_eq!(code, -5);
                assert!(message.starts_with("No such"));
            }
            other => panic!("expected node error, got {other:?}"),
        }
    }

    #[test]
    fn outputs_keep_order_and_exact_amounts() {
        let outputs = vec![
            TxOutput::Data(b"Qm::x".to_vec()),
            TxOutput::Payment {
                address: Address::new("bc1qstake").unwrap(),
                amount: Amount::from_sat(1111),
            },
            TxOutput::Payment {
                address: Address::new("bc1qchange").unwrap(),
                amount: Amount::from_sat(123_456_789),
            },
        ];
        assert_eq!(
            outputs_json(&outputs),
            json!([
                { "data": hex::encode(b"Qm::x") },
                { "bc1qstake": "0.00001111" },
                { "bc1qchange": "1.23456789" },
            ])
        );
    }

    #[test]
    fn inputs_carry_sequence() {
        let input = TxInput {
            txid: Txid::new([0xab; 32]),
            vout: 1,
            sequence: notary_types::SEQUENCE_REPLACEABLE,
        };
        let json = inputs_json(&[input]);
        assert_eq!(json[0]["vout"], 1);
        assert_eq!(json[0]["sequence"], 4_294_967_293u64);
        assert_eq!(json[0]["txid"], "ab".repeat(32));
    }

    #[test]
    fn fee_estimate_in_btc_per_kvb() {
        let rate = parse_fee_estimate(json!({ "feerate": 0.0002, "blocks": 3 }), 3).unwrap();
        assert_eq!(rate, FeeRate::from_sat_per_kvb(20_000));
    }

    #[test]
    fn missing_fee_estimate() {
        let result = json!({ "errors": ["Insufficient data or no feerate found"], "blocks": 0 });
        assert_eq!(
            parse_fee_estimate(result, 3),
            Err(LedgerError::NoFeeEstimate { target_blocks: 3 })
        );
    }

    #[test]
    fn mempool_fee_prefers_base_fee() {
        let entry = parse_mempool_entry(json!({
            "vsize": 255,
            "fee": 0.00000999,
            "fees": { "base": 0.00000255, "modified": 0.00000255 }
        }))
        .unwrap();
        assert_eq!(entry.fee, Amount::from_sat(255));
        assert_eq!(entry.vsize, 255);

        let legacy = parse_mempool_entry(json!({ "vsize": 200, "fee": 0.00000300 })).unwrap();
        assert_eq!(legacy.fee, Amount::from_sat(300));
    }

    #[test]
    fn block_summary_decodes() {
        let block: BlockInfo = serde_json::from_value(json!({
            "hash": "00".repeat(32),
            "height": 820000,
            "time": 1700000000,
            "confirmations": 2,
            "tx": ["11".repeat(32), "22".repeat(32)],
        }))
        .unwrap();
        assert_eq!(block.height, 820_000);
        assert_eq!(block.position_of(&Txid::new([0x22; 32])), Some(1));
    }

    #[tokio::test]
    async fn list_unspent_sends_min_conf() {
        let (url, server) = test_server::serve(vec![(
            200,
            r#"{"result":[{"txid":"1111111111111111111111111111111111111111111111111111111111111111","vout":0,"amount":0.0001,"confirmations":0}],"error":null,"id":"notary"}"#,
        )])
        .await;
        let client = BitcoindClient::new(url, "user", "pass", DEFAULT_TIMEOUT).unwrap();

        let utxos = client.list_unspent(0).await.unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].amount, Amount::from_sat(10_000));
        assert_eq!(utxos[0].confirmations, 0);

        let requests = server.await.unwrap();
        let request: Value = serde_json::from_str(test_server::body(&requests[0])).unwrap();
        assert_eq!(request["method"], "listunspent");
        assert_eq!(request["params"], json!([0]));
    }
}
