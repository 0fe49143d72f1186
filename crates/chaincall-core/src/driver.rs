//! Network-facing collaborators: `Provider` (reads) and `Signer` (writes).
//!
//! Implementations must be `Send + Sync` and are stored as
//! `Arc<dyn Provider>` / `Arc<dyn Signer>`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CallError;

/// A transaction (or static call) request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_hex_bytes")]
    pub data: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl TxRequest {
    pub fn call(to: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            to: Some(to.into()),
            data: Some(data),
            ..Default::default()
        }
    }
}

/// Reference to a submitted, not yet confirmed, transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: String,
}

impl TxHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// Confirmed execution record of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: u128,
    /// `true` when the transaction executed without reverting.
    pub status: bool,
}

/// Current network fee parameters (EIP-1559).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeData {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Read side of a remote endpoint.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Execute a static call and return the raw return data.
    async fn call(&self, tx: &TxRequest) -> Result<Vec<u8>, CallError>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u128, CallError>;

    async fn fee_data(&self) -> Result<FeeData, CallError>;

    async fn chain_id(&self) -> Result<u64, CallError>;

    /// Wait until `tx` is mined. `None` if the endpoint gives up without a receipt.
    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<Option<TxReceipt>, CallError>;

    /// Nonce of `address`, counting pool transactions when `pending` is set.
    async fn transaction_count(&self, address: &str, pending: bool) -> Result<u64, CallError>;
}

/// Write side: submits transactions from one account.
#[async_trait]
pub trait Signer: Send + Sync + 'static {
    fn address(&self) -> &str;

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHandle, CallError>;
}

/// What a contract is connected through: read-only, or read + sign.
#[derive(Clone)]
pub enum Driver {
    Provider(Arc<dyn Provider>),
    Signer {
        provider: Arc<dyn Provider>,
        signer: Arc<dyn Signer>,
    },
}

impl Driver {
    pub fn provider(&self) -> &Arc<dyn Provider> {
        match self {
            Self::Provider(provider) | Self::Signer { provider, .. } => provider,
        }
    }

    pub fn signer(&self) -> Option<&Arc<dyn Signer>> {
        match self {
            Self::Provider(_) => None,
            Self::Signer { signer, .. } => Some(signer),
        }
    }

    pub fn is_signer(&self) -> bool {
        matches!(self, Self::Signer { .. })
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(_) => f.write_str("Driver::Provider"),
            Self::Signer { signer, .. } => f
                .debug_struct("Driver::Signer")
                .field("address", &signer.address())
                .finish(),
        }
    }
}

mod opt_hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => s.serialize_str(&crate::codec::to_hex(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| crate::codec::from_hex(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_request_serializes_data_as_hex() {
        let tx = TxRequest::call("0xabc", vec![0xa9, 0x05]);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["data"], "0xa905");
        assert!(json.get("from").is_none());

        let back: TxRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }
}
