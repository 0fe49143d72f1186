//! `MulticallProvider`: calls issued in the same scheduler turn share one
//! aggregate round trip.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chaincall_core::{
    CallError, Driver, FeeData, MulticallConfig, MulticallOptions, Provider, Signer, TxHandle,
    TxReceipt, TxRequest,
};
use chaincall_multicall::MulticallProvider;
use common::{Chunk, RecordingInvoker, REVERTING};

const TARGET: &str = "0x0000000000000000000000000000000000000001";

/// Answers the non-batched provider surface.
struct StubNode;

#[async_trait]
impl Provider for StubNode {
    async fn call(&self, _tx: &TxRequest) -> Result<Vec<u8>, CallError> {
        Err(CallError::Transport("direct call bypassed batching".into()))
    }
    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u128, CallError> {
        Ok(60_000)
    }
    async fn fee_data(&self) -> Result<FeeData, CallError> {
        Ok(FeeData {
            max_fee_per_gas: 30,
            max_priority_fee_per_gas: 2,
        })
    }
    async fn chain_id(&self) -> Result<u64, CallError> {
        Ok(10)
    }
    async fn wait_for_receipt(&self, _tx: &TxHandle) -> Result<Option<TxReceipt>, CallError> {
        Ok(None)
    }
    async fn transaction_count(&self, _address: &str, pending: bool) -> Result<u64, CallError> {
        Ok(if pending { 4 } else { 3 })
    }
}

#[async_trait]
impl Signer for StubNode {
    fn address(&self) -> &str {
        "0x00000000000000000000000000000000000000aa"
    }
    async fn send_transaction(&self, _tx: TxRequest) -> Result<TxHandle, CallError> {
        Err(CallError::Transport("direct send bypassed batching".into()))
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn read_only() -> Driver {
    Driver::Provider(Arc::new(StubNode))
}

fn signing() -> Driver {
    let node = Arc::new(StubNode);
    Driver::Signer {
        provider: node.clone(),
        signer: node,
    }
}

fn front(
    invoker: &Arc<RecordingInvoker>,
    driver: Driver,
    window: Duration,
) -> Arc<MulticallProvider> {
    MulticallProvider::with_invoker(
        invoker.clone(),
        driver,
        MulticallConfig::default(),
        MulticallOptions::default(),
        window,
    )
}

fn tx(byte: u8) -> TxRequest {
    TxRequest::call(TARGET, vec![byte])
}

// ─── Reads ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn same_turn_calls_share_one_aggregate() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, read_only(), Duration::ZERO);

    let (t1, t2, t3) = (tx(1), tx(2), tx(3));
    let (a, b, c) = tokio::join!(provider.call(&t1), provider.call(&t2), provider.call(&t3));

    assert_eq!(a.unwrap(), vec![1]);
    assert_eq!(b.unwrap(), vec![2]);
    assert_eq!(c.unwrap(), vec![3]);
    assert_eq!(
        invoker.chunks(),
        vec![Chunk::Static(vec![vec![1], vec![2], vec![3]])]
    );
    assert_eq!(provider.pending(), 0);
}

#[tokio::test]
async fn sequential_calls_flush_separately() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, read_only(), Duration::ZERO);

    provider.call(&tx(1)).await.unwrap();
    provider.call(&tx(2)).await.unwrap();

    assert_eq!(invoker.chunks().len(), 2);
}

#[tokio::test]
async fn batch_window_collects_late_arrivals() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, read_only(), Duration::from_millis(30));

    let (t1, t2) = (tx(1), tx(2));
    let late = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        provider.call(&t2).await
    };
    let (a, b) = tokio::join!(provider.call(&t1), late);

    assert_eq!(a.unwrap(), vec![1]);
    assert_eq!(b.unwrap(), vec![2]);
    assert_eq!(invoker.chunks(), vec![Chunk::Static(vec![vec![1], vec![2]])]);
}

#[tokio::test]
async fn failed_call_surfaces_as_revert() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, read_only(), Duration::ZERO);

    let (good, reverting) = (tx(1), tx(REVERTING));
    let (ok, bad) = tokio::join!(provider.call(&good), provider.call(&reverting));

    assert_eq!(ok.unwrap(), vec![1]);
    assert_eq!(bad.unwrap_err(), CallError::Reverted { data: "0x".into() });
}

#[tokio::test]
async fn transport_failure_reaches_every_caller() {
    let invoker = Arc::new(RecordingInvoker::new().failing());
    let provider = front(&invoker, read_only(), Duration::ZERO);

    let (t1, t2) = (tx(1), tx(2));
    let (a, b) = tokio::join!(provider.call(&t1), provider.call(&t2));

    assert!(matches!(a.unwrap_err(), CallError::Transport(_)));
    assert!(matches!(b.unwrap_err(), CallError::Transport(_)));
}

#[tokio::test]
async fn call_without_target_or_data_is_rejected() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, read_only(), Duration::ZERO);

    let no_data = TxRequest {
        to: Some(TARGET.into()),
        ..Default::default()
    };
    assert_eq!(provider.call(&no_data).await.unwrap_err(), CallError::MissingCallData);
    assert_eq!(
        provider.call(&TxRequest::default()).await.unwrap_err(),
        CallError::MissingCallData
    );
    assert!(invoker.chunks().is_empty());
}

// ─── Writes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn same_turn_sends_share_one_transaction() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, signing(), Duration::ZERO);

    let (a, b) = tokio::join!(
        provider.send_transaction(tx(7)),
        provider.send_transaction(tx(8))
    );

    assert_eq!(a.unwrap(), TxHandle::new("0x0"));
    assert_eq!(b.unwrap(), TxHandle::new("0x0"));
    assert_eq!(invoker.chunks(), vec![Chunk::Mutable(vec![vec![7], vec![8]])]);
    assert_eq!(provider.address(), "0x00000000000000000000000000000000000000aa");
}

#[tokio::test]
async fn read_only_front_refuses_sends() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, read_only(), Duration::ZERO);

    let err = provider.send_transaction(tx(1)).await.unwrap_err();
    assert_eq!(err, CallError::ReadOnlyMutation);
    assert_eq!(provider.address(), "");
}

// ─── Delegation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_batched_methods_delegate_to_the_driver() {
    let invoker = Arc::new(RecordingInvoker::new());
    let provider = front(&invoker, read_only(), Duration::ZERO);

    assert_eq!(provider.chain_id().await.unwrap(), 10);
    assert_eq!(provider.estimate_gas(&tx(1)).await.unwrap(), 60_000);
    assert_eq!(provider.fee_data().await.unwrap().max_fee_per_gas, 30);
    assert_eq!(provider.transaction_count("0xaa", true).await.unwrap(), 4);
    assert!(invoker.chunks().is_empty());
}
