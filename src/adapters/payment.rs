//! Payment submitter against an Ethereum JSON-RPC node.
//!
//! Sends the run fee to the payment contract from a node-managed
//! account via `eth_sendTransaction` and waits for inclusion by polling
//! `eth_getTransactionReceipt`. The run id travels as the transaction
//! calldata so the engine can match the payment to the run.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::domain::{run_id_hex, RunId};

use super::{AdapterError, PaymentSubmitter, TransactionReceipt};

const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(600);

/// Payment submitter speaking Ethereum JSON-RPC.
pub struct EthRpcSubmitter {
    rpc_url: String,
    /// Sender account, managed (and unlocked) by the node
    from: String,
    client: reqwest::Client,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl EthRpcSubmitter {
    pub fn new(rpc_url: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            from: from.into(),
            client: reqwest::Client::new(),
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Override how often and how long to poll for the receipt
    pub fn with_receipt_timing(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.receipt_poll_interval = poll_interval;
        self.receipt_timeout = timeout;
        self
    }

    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AdapterError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        if let Some(err) = response.error {
            return Err(AdapterError::Remote(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }

        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl PaymentSubmitter for EthRpcSubmitter {
    async fn submit(
        &self,
        contract: &str,
        run_id: &RunId,
        value: u128,
    ) -> Result<Option<String>, AdapterError> {
        let tx = json!({
            "from": self.from,
            "to": contract,
            "value": format!("{:#x}", value),
            "data": run_id_hex(run_id),
        });

        let result = self.rpc_call("eth_sendTransaction", json!([tx])).await?;

        // A null result means the node accepted the call but produced
        // no hash; the workflow treats that as a failure
        Ok(result.as_str().map(|s| s.to_string()))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt, AdapterError> {
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;

        loop {
            let result = self
                .rpc_call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if !result.is_null() {
                return parse_receipt(&result);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(AdapterError::Transport(format!(
                    "no receipt for {} within {}s",
                    tx_hash,
                    self.receipt_timeout.as_secs()
                )));
            }

            debug!(tx = %tx_hash, "transaction not mined yet");
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

fn parse_receipt(value: &serde_json::Value) -> Result<TransactionReceipt, AdapterError> {
    let transaction_hash = value
        .get("transactionHash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AdapterError::Transport("receipt is missing transactionHash".to_string()))?
        .to_string();

    let block_number = value
        .get("blockNumber")
        .and_then(|v| v.as_str())
        .and_then(parse_hex_u64);

    let status = value
        .get("status")
        .and_then(|v| v.as_str())
        .map(|s| s == "0x1");

    Ok(TransactionReceipt {
        transaction_hash,
        block_number,
        status,
    })
}

fn parse_hex_u64(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_receipt() {
        let value = json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x1",
        });

        let receipt = parse_receipt(&value).unwrap();
        assert_eq!(receipt.transaction_hash, "0xabc");
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.status, Some(true));
    }

    #[test]
    fn test_parse_receipt_without_hash_fails() {
        let value = json!({ "blockNumber": "0x10" });
        assert!(parse_receipt(&value).is_err());
    }

    #[test]
    fn test_parse_receipt_failed_status() {
        let value = json!({ "transactionHash": "0xabc", "status": "0x0" });
        let receipt = parse_receipt(&value).unwrap();
        assert_eq!(receipt.status, Some(false));
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x10"), Some(16));
        assert_eq!(parse_hex_u64("10"), Some(16));
        assert_eq!(parse_hex_u64("0xzz"), None);
    }

    #[test]
    fn test_wei_value_encoding() {
        assert_eq!(format!("{:#x}", 100u128), "0x64");
        assert_eq!(format!("{:#x}", 0u128), "0x0");
    }
}
