//! `Multicall3`: the [`RemoteInvoker`] backed by the `aggregate3` contract.

use async_trait::async_trait;
use chaincall_abi::{multicall3::call3, AGGREGATE3, MULTICALL3_ABI};
use chaincall_core::{
    codec::from_hex, AggregateResult, CallDescriptor, CallError, CallMutability, CallOptions,
    Driver, MulticallConfig, RemoteInvoker, TxHandle, TxReceipt,
};
use serde_json::Value;

use crate::contract::Contract;
use crate::outcome::CallOutput;

/// Aggregates calls through a deployed Multicall3 contract.
#[derive(Debug, Clone)]
pub struct Multicall3 {
    contract: Contract,
}

impl Multicall3 {
    /// Bind to the Multicall3 deployment at `config.address`.
    pub fn new(driver: Driver, config: &MulticallConfig) -> Result<Self, CallError> {
        let contract = Contract::from_abi(MULTICALL3_ABI, Some(config.address.as_str()), Some(driver))?
            .with_config(config.clone());
        Ok(Self { contract })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    fn args(calls: &[CallDescriptor]) -> Vec<Value> {
        let entries = calls
            .iter()
            .map(|c| call3(c.target(), c.allow_failure(), &c.payload_hex()))
            .collect();
        vec![Value::Array(entries)]
    }

    fn forced(options: &CallOptions, mutability: CallMutability) -> CallOptions {
        CallOptions {
            force_mutability: Some(mutability),
            ..options.clone()
        }
    }
}

#[async_trait]
impl RemoteInvoker for Multicall3 {
    async fn static_aggregate(
        &self,
        calls: &[CallDescriptor],
        options: &CallOptions,
    ) -> Result<Vec<AggregateResult>, CallError> {
        let out = self
            .contract
            .call(
                AGGREGATE3,
                &Self::args(calls),
                Self::forced(options, CallMutability::Static),
            )
            .await?;
        match out {
            CallOutput::Value(value) => parse_results(&value),
            CallOutput::Tx(_) => Err(CallError::Codec("aggregate3 static call produced a transaction".into())),
        }
    }

    async fn aggregate(
        &self,
        calls: &[CallDescriptor],
        options: &CallOptions,
    ) -> Result<TxHandle, CallError> {
        let out = self
            .contract
            .call(
                AGGREGATE3,
                &Self::args(calls),
                Self::forced(options, CallMutability::Mutable),
            )
            .await?;
        out.into_tx()
            .ok_or_else(|| CallError::Codec("aggregate3 submission produced no transaction".into()))
    }

    async fn estimate_aggregate(
        &self,
        calls: &[CallDescriptor],
        options: &CallOptions,
    ) -> Result<u128, CallError> {
        self.contract
            .estimate(
                AGGREGATE3,
                &Self::args(calls),
                Self::forced(options, CallMutability::Mutable),
            )
            .await
    }

    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<Option<TxReceipt>, CallError> {
        let provider = self.contract.provider().ok_or(CallError::NonCallable)?;
        provider.wait_for_receipt(tx).await
    }
}

/// `[[success, "0x…"], …]` → aggregate results.
fn parse_results(value: &Value) -> Result<Vec<AggregateResult>, CallError> {
    let entries = value
        .as_array()
        .ok_or_else(|| CallError::Codec(format!("aggregate3 result is not an array: {value}")))?;
    entries
        .iter()
        .map(|entry| match entry.as_array().map(Vec::as_slice) {
            Some([Value::Bool(success), Value::String(data)]) => Ok(AggregateResult {
                success: *success,
                data: from_hex(data)?,
            }),
            _ => Err(CallError::Codec(format!("malformed aggregate3 entry: {entry}"))),
        })
        .collect()
}
