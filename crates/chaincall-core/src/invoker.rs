//! The `RemoteInvoker` trait: the aggregate-call primitive batches run on.

use async_trait::async_trait;

use crate::call::CallDescriptor;
use crate::config::CallOptions;
use crate::driver::{TxHandle, TxReceipt};
use crate::error::CallError;

/// Outcome of one call inside a static aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub success: bool,
    /// Return data on success, revert data on failure.
    pub data: Vec<u8>,
}

impl AggregateResult {
    pub fn ok(data: Vec<u8>) -> Self {
        Self {
            success: true,
            data,
        }
    }

    pub fn failed(data: Vec<u8>) -> Self {
        Self {
            success: false,
            data,
        }
    }
}

/// Executes many calls in one round trip.
///
/// Errors returned from these methods are transport-level: they abort the
/// whole batch run. Per-call failures are reported through
/// [`AggregateResult::success`] or a missing receipt instead.
#[async_trait]
pub trait RemoteInvoker: Send + Sync + 'static {
    /// Read-only aggregate; one result per call, in order.
    async fn static_aggregate(
        &self,
        calls: &[CallDescriptor],
        options: &CallOptions,
    ) -> Result<Vec<AggregateResult>, CallError>;

    /// State-changing aggregate; one transaction for the whole slice.
    async fn aggregate(
        &self,
        calls: &[CallDescriptor],
        options: &CallOptions,
    ) -> Result<TxHandle, CallError>;

    /// Gas estimate of the state-changing aggregate of `calls`.
    async fn estimate_aggregate(
        &self,
        calls: &[CallDescriptor],
        options: &CallOptions,
    ) -> Result<u128, CallError>;

    /// Await confirmation of a submitted aggregate.
    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<Option<TxReceipt>, CallError>;
}
