//! Shared test doubles for the integration suites.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chaincall_core::{
    AggregateResult, CallDescriptor, CallError, CallOptions, RemoteInvoker, TxHandle, TxReceipt,
};

/// Payload marking a call the fake aggregate reports as reverted.
pub const REVERTING: u8 = 0xff;

/// One aggregate round trip seen by [`RecordingInvoker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Static(Vec<Vec<u8>>),
    Mutable(Vec<Vec<u8>>),
}

/// Echoes payloads back as return data (unless a canned return is
/// registered for the payload) and records every chunk.
///
/// Mutable chunk `n` (0-based) is submitted as tx `0x{n}`; hashes listed in
/// `missing_receipts` never confirm.
#[derive(Default)]
pub struct RecordingInvoker {
    pub chunks: Mutex<Vec<Chunk>>,
    pub returns: HashMap<Vec<u8>, Vec<u8>>,
    pub missing_receipts: HashSet<String>,
    pub latency: Duration,
    pub fail_transport: bool,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_return(mut self, payload: &[u8], data: Vec<u8>) -> Self {
        self.returns.insert(payload.to_vec(), data);
        self
    }

    pub fn without_receipt(mut self, hash: &str) -> Self {
        self.missing_receipts.insert(hash.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        self.chunks.lock().unwrap().clone()
    }

    async fn round_trip(&self) -> Result<(), CallError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_transport {
            return Err(CallError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

fn payloads(calls: &[CallDescriptor]) -> Vec<Vec<u8>> {
    calls.iter().map(|c| c.payload().to_vec()).collect()
}

#[async_trait]
impl RemoteInvoker for RecordingInvoker {
    async fn static_aggregate(
        &self,
        calls: &[CallDescriptor],
        _options: &CallOptions,
    ) -> Result<Vec<AggregateResult>, CallError> {
        self.chunks.lock().unwrap().push(Chunk::Static(payloads(calls)));
        self.round_trip().await?;
        Ok(calls
            .iter()
            .map(|c| match (self.returns.get(c.payload()), c.payload()) {
                (Some(data), _) => AggregateResult::ok(data.clone()),
                (None, [REVERTING, ..]) => AggregateResult::failed(vec![]),
                (None, data) => AggregateResult::ok(data.to_vec()),
            })
            .collect())
    }

    async fn aggregate(
        &self,
        calls: &[CallDescriptor],
        _options: &CallOptions,
    ) -> Result<TxHandle, CallError> {
        let index = {
            let mut chunks = self.chunks.lock().unwrap();
            chunks.push(Chunk::Mutable(payloads(calls)));
            chunks.iter().filter(|c| matches!(c, Chunk::Mutable(_))).count() - 1
        };
        self.round_trip().await?;
        Ok(TxHandle::new(format!("0x{index}")))
    }

    async fn estimate_aggregate(
        &self,
        calls: &[CallDescriptor],
        _options: &CallOptions,
    ) -> Result<u128, CallError> {
        Ok(21_000 * calls.len() as u128)
    }

    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<Option<TxReceipt>, CallError> {
        if self.missing_receipts.contains(&tx.hash) {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            transaction_hash: tx.hash.clone(),
            block_number: Some(1),
            gas_used: 50_000,
            status: true,
        }))
    }
}

pub fn read(byte: u8) -> CallDescriptor {
    CallDescriptor::read("0x0000000000000000000000000000000000000001", vec![byte])
}

pub fn write(byte: u8) -> CallDescriptor {
    CallDescriptor::write("0x0000000000000000000000000000000000000002", vec![byte])
}

/// Big-endian 32-byte ABI words.
pub fn words(values: &[u64]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| {
            let mut word = [0u8; 32];
            word[24..].copy_from_slice(&v.to_be_bytes());
            word
        })
        .collect()
}
