//! Minimal async Solana JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use crate::config::Commitment;
use crate::error::RpcError;
use crate::keys::Pubkey;

/// Raw account contents as returned by `getAccountInfo`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureStatus {
    pub confirmation: Option<Commitment>,
    pub err: Option<String>,
}

pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            commitment,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, id, "rpc request");

        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let v: Value = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                RpcError::Response(e.to_string())
            } else {
                RpcError::Transport(format!("HTTP {status}"))
            }
        })?;
        parse_result(v)
    }

    /// `None` when the account does not exist.
    pub async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([
                    pubkey.to_string(),
                    { "encoding": "base64", "commitment": self.commitment.as_str() }
                ]),
            )
            .await?;
        parse_account(&result["value"])
    }

    pub async fn get_latest_blockhash(&self) -> Result<String, RpcError> {
        let result = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        // Response: {"result":{"value":{"blockhash":"...","lastValidBlockHeight":N}}}
        result["value"]["blockhash"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| RpcError::Response("missing blockhash".into()))
    }

    /// Submit a signed, base64-encoded transaction. Returns its signature.
    pub async fn send_transaction(&self, tx_base64: &str) -> Result<String, RpcError> {
        let result = self
            .call(
                "sendTransaction",
                json!([
                    tx_base64,
                    { "encoding": "base64", "preflightCommitment": self.commitment.as_str() }
                ]),
            )
            .await?;
        result
            .as_str()
            .map(String::from)
            .ok_or_else(|| RpcError::Response("missing result string".into()))
    }

    pub async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let result = self
            .call("getSignatureStatuses", json!([[signature]]))
            .await?;
        // Response: {"result":{"value":[{"confirmationStatus":"finalized","err":null,...}]}}
        let status = &result["value"][0];
        if status.is_null() {
            return Ok(None);
        }
        let err = match &status["err"] {
            Value::Null => None,
            other => Some(other.to_string()),
        };
        Ok(Some(SignatureStatus {
            confirmation: status["confirmationStatus"]
                .as_str()
                .and_then(Commitment::parse),
            err,
        }))
    }
}

fn parse_result(mut v: Value) -> Result<Value, RpcError> {
    if let Some(err) = v.get("error") {
        return Err(RpcError::Server {
            code: err["code"].as_i64().unwrap_or_default(),
            message: err["message"]
                .as_str()
                .unwrap_or("unknown RPC error")
                .to_string(),
        });
    }
    match v.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(RpcError::Response("missing result".into())),
    }
}

fn parse_account(value: &Value) -> Result<Option<AccountInfo>, RpcError> {
    if value.is_null() {
        return Ok(None);
    }
    let owner = value["owner"]
        .as_str()
        .ok_or_else(|| RpcError::Response("missing owner".into()))?
        .parse::<Pubkey>()
        .map_err(|e| RpcError::Response(format!("owner: {e}")))?;
    let encoded = value["data"][0]
        .as_str()
        .ok_or_else(|| RpcError::Response("missing account data".into()))?;
    let data = STANDARD
        .decode(encoded)
        .map_err(|e| RpcError::Response(format!("account data: {e}")))?;
    Ok(Some(AccountInfo {
        owner,
        lamports: value["lamports"].as_u64().unwrap_or_default(),
        data,
    }))
}
