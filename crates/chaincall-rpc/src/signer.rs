//! `NodeSigner`: transactions signed by an account the node manages.

use std::sync::Arc;

use async_trait::async_trait;
use chaincall_core::{CallError, Driver, Signer, TxHandle, TxRequest};

use crate::provider::{tx_object, RpcProvider};

/// Submits through `eth_sendTransaction` with `from` set to `address`.
/// Works against dev nodes (anvil, hardhat) and clef-style signers.
#[derive(Debug, Clone)]
pub struct NodeSigner {
    address: String,
    provider: Arc<RpcProvider>,
}

impl NodeSigner {
    pub fn new(provider: Arc<RpcProvider>, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            provider,
        }
    }

    /// Read + sign driver: reads through the provider, writes through `self`.
    pub fn into_driver(self) -> Driver {
        let provider = self.provider.clone();
        Driver::Signer {
            provider,
            signer: Arc::new(self),
        }
    }
}

#[async_trait]
impl Signer for NodeSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send_transaction(&self, mut tx: TxRequest) -> Result<TxHandle, CallError> {
        tx.from = Some(self.address.clone());
        let hash: String = self
            .provider
            .request("eth_sendTransaction", vec![tx_object(&tx)])
            .await?;
        tracing::debug!(tx = %hash, from = %self.address, "transaction submitted");
        Ok(TxHandle::new(hash))
    }
}
