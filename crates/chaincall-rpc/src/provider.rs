//! `RpcProvider`: the [`Provider`] trait over standard `eth_*` methods.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chaincall_core::{
    codec::{from_hex, to_hex},
    CallError, Driver, FeeData, Provider, TxHandle, TxReceipt, TxRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::TransportError;
use crate::http::{HttpClientConfig, HttpRpcClient};
use crate::request::JsonRpcRequest;
use crate::transport::RpcTransport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcProviderConfig {
    /// Pause between `eth_getTransactionReceipt` polls.
    pub receipt_poll_interval_ms: u64,
    /// Give up on a receipt (reporting "no receipt") after this long.
    pub receipt_timeout_ms: u64,
}

impl Default for RpcProviderConfig {
    fn default() -> Self {
        Self {
            receipt_poll_interval_ms: 1_000,
            receipt_timeout_ms: 120_000,
        }
    }
}

pub struct RpcProvider {
    transport: Arc<dyn RpcTransport>,
    config: RpcProviderConfig,
    next_id: AtomicU64,
}

impl RpcProvider {
    pub fn new(transport: Arc<dyn RpcTransport>, config: RpcProviderConfig) -> Self {
        Self {
            transport,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Provider over an HTTP endpoint with default retry and polling.
    pub fn http(url: impl Into<String>) -> Result<Self, CallError> {
        let client = HttpRpcClient::new(url, HttpClientConfig::default())?;
        Ok(Self::new(Arc::new(client), RpcProviderConfig::default()))
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    /// Read-only driver backed by this provider.
    pub fn into_driver(self) -> Driver {
        Driver::Provider(Arc::new(self))
    }

    /// Call `method` and deserialize its result.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .transport
            .send(JsonRpcRequest::new(id, method, params))
            .await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        Ok(serde_json::from_value(result)?)
    }

    async fn quantity(&self, method: &str, params: Vec<Value>) -> Result<u128, TransportError> {
        let raw: String = self.request(method, params).await?;
        parse_quantity(&raw)
    }

    async fn receipt(&self, hash: &str) -> Result<Option<TxReceipt>, TransportError> {
        let raw: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", vec![json!(hash)])
            .await?;
        raw.map(RpcReceipt::into_receipt).transpose()
    }
}

#[async_trait]
impl Provider for RpcProvider {
    async fn call(&self, tx: &TxRequest) -> Result<Vec<u8>, CallError> {
        let raw: String = self
            .request("eth_call", vec![tx_object(tx), json!("latest")])
            .await?;
        from_hex(&raw)
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u128, CallError> {
        Ok(self.quantity("eth_estimateGas", vec![tx_object(tx)]).await?)
    }

    /// `maxPriorityFeePerGas` from the node's tip suggestion, `maxFeePerGas`
    /// as gas price plus that tip.
    async fn fee_data(&self) -> Result<FeeData, CallError> {
        let gas_price = self.quantity("eth_gasPrice", vec![]).await?;
        let tip = self.quantity("eth_maxPriorityFeePerGas", vec![]).await?;
        Ok(FeeData {
            max_fee_per_gas: gas_price.saturating_add(tip),
            max_priority_fee_per_gas: tip,
        })
    }

    async fn chain_id(&self) -> Result<u64, CallError> {
        let id = self.quantity("eth_chainId", vec![]).await?;
        u64::try_from(id).map_err(|_| CallError::Transport(format!("chain id out of range: {id}")))
    }

    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<Option<TxReceipt>, CallError> {
        let poll = Duration::from_millis(self.config.receipt_poll_interval_ms);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(self.config.receipt_timeout_ms);
        loop {
            if let Some(receipt) = self.receipt(&tx.hash).await? {
                return Ok(Some(receipt));
            }
            if tokio::time::Instant::now() + poll > deadline {
                tracing::warn!(tx = %tx.hash, "no receipt before timeout");
                return Ok(None);
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn transaction_count(&self, address: &str, pending: bool) -> Result<u64, CallError> {
        let block = if pending { "pending" } else { "latest" };
        let count = self
            .quantity("eth_getTransactionCount", vec![json!(address), json!(block)])
            .await?;
        u64::try_from(count).map_err(|_| CallError::Transport(format!("nonce out of range: {count}")))
    }
}

impl std::fmt::Debug for RpcProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcProvider")
            .field("url", &self.transport.url())
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    gas_used: String,
    /// Absent on pre-Byzantium receipts.
    status: Option<String>,
}

impl RpcReceipt {
    fn into_receipt(self) -> Result<TxReceipt, TransportError> {
        let block_number = self
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .map(|n| n as u64);
        let status = match self.status.as_deref() {
            Some(s) => parse_quantity(s)? == 1,
            None => true,
        };
        Ok(TxReceipt {
            transaction_hash: self.transaction_hash,
            block_number,
            gas_used: parse_quantity(&self.gas_used)?,
            status,
        })
    }
}

/// `0x`-prefixed hex quantity → integer.
pub fn parse_quantity(raw: &str) -> Result<u128, TransportError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| TransportError::Unexpected(format!("quantity without 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| TransportError::Unexpected(format!("bad quantity {raw}: {e}")))
}

/// Integer → minimal `0x` hex quantity.
pub fn quantity(value: u128) -> String {
    format!("{value:#x}")
}

/// JSON-RPC transaction object (camelCase keys, hex quantities).
pub fn tx_object(tx: &TxRequest) -> Value {
    let mut obj = Map::new();
    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            obj.insert(key.to_string(), value);
        }
    };
    put("from", tx.from.clone().map(Value::String));
    put("to", tx.to.clone().map(Value::String));
    put("data", tx.data.as_deref().map(|d| Value::String(to_hex(d))));
    put("value", tx.value.map(|v| json!(quantity(v))));
    put("gas", tx.gas_limit.map(|v| json!(quantity(v))));
    put("maxFeePerGas", tx.max_fee_per_gas.map(|v| json!(quantity(v))));
    put(
        "maxPriorityFeePerGas",
        tx.max_priority_fee_per_gas.map(|v| json!(quantity(v))),
    );
    put("chainId", tx.chain_id.map(|v| json!(quantity(v as u128))));
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert_eq!(quantity(0), "0x0");
        assert_eq!(quantity(436), "0x1b4");
    }

    #[test]
    fn tx_object_uses_rpc_field_names() {
        let tx = TxRequest {
            gas_limit: Some(120_000),
            max_fee_per_gas: Some(12),
            chain_id: Some(5),
            ..TxRequest::call("0x01", vec![0xab, 0xcd])
        };
        assert_eq!(
            tx_object(&tx),
            json!({
                "to": "0x01",
                "data": "0xabcd",
                "gas": "0x1d4c0",
                "maxFeePerGas": "0xc",
                "chainId": "0x5"
            })
        );
    }

    #[test]
    fn receipt_status_and_legacy_receipts() {
        let failed: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": "0xaa",
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "status": "0x0"
        }))
        .unwrap();
        let receipt = failed.into_receipt().unwrap();
        assert!(!receipt.status);
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.gas_used, 21_000);

        let legacy: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": "0xbb",
            "blockNumber": null,
            "gasUsed": "0x1"
        }))
        .unwrap();
        let receipt = legacy.into_receipt().unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.block_number, None);
    }
}
