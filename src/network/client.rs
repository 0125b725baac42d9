//! JSON-RPC client wrapper - executes ledger calls over HTTP

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::encoding::{decode_base58_array, TransactionEncoding};
use crate::error::ClientError;
use crate::models::{Address, Commitment, Lamports, LatestBlockhash, Signature, SignatureStatus};
use crate::network::ledger::LedgerRpc;
use crate::transaction::Transaction;

/// JSON-RPC error codes the node uses for rejected transactions
const TRANSACTION_ERROR_CODES: &[i64] = &[
    -32002, // preflight simulation failed
    -32003, // signature verification failed
    -32013, // signature count mismatch
    -32015, // unsupported transaction version
];

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    slot: u64,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

impl From<RpcSignatureStatus> for SignatureStatus {
    fn from(status: RpcSignatureStatus) -> Self {
        SignatureStatus {
            slot: status.slot,
            confirmation: status
                .confirmation_status
                .as_deref()
                .and_then(Commitment::parse),
            err: status.err.filter(|e| !e.is_null()).map(|e| e.to_string()),
        }
    }
}

/// Unwrap a JSON-RPC response body into its typed result
fn parse_envelope<T: DeserializeOwned>(method: &str, body: Value) -> Result<T, ClientError> {
    let envelope: RpcEnvelope = serde_json::from_value(body)
        .map_err(|e| ClientError::Malformed(format!("{method}: {e}")))?;

    if let Some(error) = envelope.error {
        let message = match error.data.as_ref().and_then(|d| d.get("err")) {
            Some(err) if !err.is_null() => format!("{} ({})", error.message, err),
            _ => error.message,
        };
        if method == "sendTransaction" && TRANSACTION_ERROR_CODES.contains(&error.code) {
            return Err(ClientError::Transaction(message));
        }
        return Err(ClientError::Rpc {
            code: error.code,
            message,
        });
    }

    let result = envelope
        .result
        .ok_or_else(|| ClientError::Malformed(format!("{method}: missing result")))?;
    serde_json::from_value(result).map_err(|e| ClientError::Malformed(format!("{method}: {e}")))
}

/// Ledger RPC over HTTP JSON-RPC 2.0
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    encoding: TransactionEncoding,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration, encoding: TransactionEncoding) -> Self {
        RpcClient {
            client: create_client(timeout),
            url: url.into(),
            encoding,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let start = Instant::now();
        let result = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                tracing::warn!(id, method, reason, error = %e, "RPC call failed");
                return Err(ClientError::Http(e));
            }
        };
        let value: Value = resp.json().await?;
        tracing::debug!(id, method, time_ms = start.elapsed().as_millis() as u64, "RPC call completed");
        parse_envelope(method, value)
    }
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn get_balance(
        &self,
        address: &Address,
        commitment: Commitment,
    ) -> Result<Lamports, ClientError> {
        let res: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": commitment.as_str() }]),
            )
            .await?;
        Ok(Lamports(res.value))
    }

    async fn request_airdrop(
        &self,
        address: &Address,
        amount: Lamports,
        commitment: Commitment,
    ) -> Result<Signature, ClientError> {
        let sig: String = self
            .call(
                "requestAirdrop",
                json!([address.to_string(), amount.0, { "commitment": commitment.as_str() }]),
            )
            .await?;
        Ok(sig.parse::<Signature>()?)
    }

    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, ClientError> {
        let res: WithContext<RpcBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": commitment.as_str() }]),
            )
            .await?;
        Ok(LatestBlockhash {
            blockhash: decode_base58_array::<32>(&res.value.blockhash)?,
            last_valid_block_height: res.value.last_valid_block_height,
        })
    }

    async fn get_block_height(&self, commitment: Commitment) -> Result<u64, ClientError> {
        self.call("getBlockHeight", json!([{ "commitment": commitment.as_str() }]))
            .await
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, ClientError> {
        let sigs: Vec<String> = signatures.iter().map(|s| s.to_string()).collect();
        let res: WithContext<Vec<Option<RpcSignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([sigs, { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(res
            .value
            .into_iter()
            .map(|s| s.map(SignatureStatus::from))
            .collect())
    }

    async fn send_transaction(
        &self,
        tx: &Transaction,
        preflight: Commitment,
    ) -> Result<Signature, ClientError> {
        let wire = self.encoding.encode(&tx.serialize()?);
        let sig: String = self
            .call(
                "sendTransaction",
                json!([wire, {
                    "encoding": self.encoding.as_str(),
                    "preflightCommitment": preflight.as_str(),
                }]),
            )
            .await?;
        Ok(sig.parse::<Signature>()?)
    }
}

/// Create an HTTP client with default configuration
pub fn create_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balance_result() {
        let body = json!({
            "jsonrpc": "2.0",
            "result": { "context": { "slot": 1 }, "value": 2000000000u64 },
            "id": 1
        });
        let res: WithContext<u64> = parse_envelope("getBalance", body).unwrap();
        assert_eq!(res.value, 2_000_000_000);
    }

    #[test]
    fn test_parse_signature_statuses() {
        let body = json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 82 },
                "value": [
                    { "slot": 72, "confirmations": 10, "err": null, "status": { "Ok": null }, "confirmationStatus": "confirmed" },
                    null,
                    { "slot": 48, "confirmations": null, "err": { "InstructionError": [0, { "Custom": 1 }] }, "confirmationStatus": "finalized" }
                ]
            },
            "id": 1
        });
        let res: WithContext<Vec<Option<RpcSignatureStatus>>> =
            parse_envelope("getSignatureStatuses", body).unwrap();
        let statuses: Vec<Option<SignatureStatus>> =
            res.value.into_iter().map(|s| s.map(Into::into)).collect();

        let first = statuses[0].as_ref().unwrap();
        assert_eq!(first.confirmation, Some(Commitment::Confirmed));
        assert_eq!(first.err, None);
        assert!(statuses[1].is_none());
        let third = statuses[2].as_ref().unwrap();
        assert!(third.err.as_deref().unwrap().contains("Custom"));
    }

    #[test]
    fn test_preflight_failure_is_transaction_error() {
        let body = json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32002,
                "message": "Transaction simulation failed: Attempt to debit an account but found no record of a prior credit.",
                "data": { "err": "AccountNotFound", "logs": [] }
            },
            "id": 1
        });
        let err = parse_envelope::<String>("sendTransaction", body).unwrap_err();
        assert!(matches!(err, ClientError::Transaction(_)));
        assert!(err.to_string().contains("AccountNotFound"));
    }

    #[test]
    fn test_other_rpc_errors_stay_network_errors() {
        let body = json!({
            "jsonrpc": "2.0",
            "error": { "code": -32603, "message": "airdrop request failed" },
            "id": 1
        });
        let err = parse_envelope::<String>("requestAirdrop", body).unwrap_err();
        assert!(matches!(err, ClientError::Rpc { code: -32603, .. }));

        let err = parse_envelope::<String>("getBalance", json!({ "jsonrpc": "2.0", "id": 1 }))
            .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }
}
