//! Auto-batching front: a [`Provider`] + [`Signer`] that coalesces calls.
//!
//! Every `call` / `send_transaction` issued within one batch window is queued
//! into the current [`MulticallUnit`]. The first call of a window schedules
//! exactly one flush; the flush swaps in a fresh unit (so calls arriving
//! mid-execution start the next batch) and runs the old one. Each caller
//! observes its own outcome through the unit's per-tag waiters, so the
//! flush itself discards run errors.
//!
//! # Usage
//! ```rust,no_run
//! # async fn demo(driver: chaincall_core::Driver) -> Result<(), chaincall_core::CallError> {
//! use chaincall_core::{MulticallConfig, MulticallOptions, Provider, TxRequest};
//! use chaincall_multicall::MulticallProvider;
//!
//! let provider = MulticallProvider::new(driver, MulticallConfig::default(), MulticallOptions::default())?;
//! let tx = TxRequest::call("0x0000000000000000000000000000000000000001", vec![0x18, 0x16, 0x0d, 0xdd]);
//! let (a, b) = futures::join!(provider.call(&tx), provider.call(&tx)); // one aggregate read
//! # let _ = (a, b);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chaincall_core::{
    CallDescriptor, CallError, Driver, FeeData, MulticallConfig, MulticallOptions, Provider,
    RemoteInvoker, Signer, TagKey, TxHandle, TxReceipt, TxRequest,
};

use crate::invoker::Multicall3;
use crate::outcome::RawOutcome;
use crate::unit::MulticallUnit;

struct Shared {
    driver: Driver,
    invoker: Arc<dyn RemoteInvoker>,
    config: MulticallConfig,
    options: MulticallOptions,
    unit: Mutex<Arc<MulticallUnit>>,
    scheduled: AtomicBool,
    batch_window: Duration,
}

impl Shared {
    fn fresh_unit(&self) -> Arc<MulticallUnit> {
        Arc::new(
            MulticallUnit::new(Arc::clone(&self.invoker))
                .with_config(self.config.clone())
                .with_options(self.options.clone()),
        )
    }

    async fn flush(&self) {
        let unit = {
            let mut current = self.unit.lock().unwrap_or_else(PoisonError::into_inner);
            let fresh = self.fresh_unit();
            self.scheduled.store(false, Ordering::Release);
            std::mem::replace(&mut *current, fresh)
        };
        tracing::debug!(calls = unit.len(), "flushing multicall batch");
        if let Err(e) = unit.run(None).await {
            tracing::debug!(error = %e, "multicall batch failed");
        }
    }
}

/// Transparent batching wrapper around a driver.
pub struct MulticallProvider {
    shared: Arc<Shared>,
}

impl MulticallProvider {
    /// Batch through Multicall3 at `config.address`, flushing on the next
    /// scheduler turn.
    pub fn new(
        driver: Driver,
        config: MulticallConfig,
        options: MulticallOptions,
    ) -> Result<Arc<Self>, CallError> {
        Self::with_batch_window(driver, config, options, Duration::ZERO)
    }

    /// Like [`new`](Self::new), collecting calls for `window` before flushing.
    pub fn with_batch_window(
        driver: Driver,
        config: MulticallConfig,
        options: MulticallOptions,
        window: Duration,
    ) -> Result<Arc<Self>, CallError> {
        let invoker = Arc::new(Multicall3::new(driver.clone(), &config)?);
        Ok(Self::with_invoker(invoker, driver, config, options, window))
    }

    /// Batch through an arbitrary aggregate-call primitive.
    pub fn with_invoker(
        invoker: Arc<dyn RemoteInvoker>,
        driver: Driver,
        config: MulticallConfig,
        options: MulticallOptions,
        window: Duration,
    ) -> Arc<Self> {
        let unit = Arc::new(
            MulticallUnit::new(Arc::clone(&invoker))
                .with_config(config.clone())
                .with_options(options.clone()),
        );
        Arc::new(Self {
            shared: Arc::new(Shared {
                driver,
                invoker,
                config,
                options,
                unit: Mutex::new(unit),
                scheduled: AtomicBool::new(false),
                batch_window: window,
            }),
        })
    }

    /// Number of calls waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.current().len()
    }

    fn current(&self) -> Arc<MulticallUnit> {
        Arc::clone(&self.shared.unit.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn base(&self) -> &Arc<dyn Provider> {
        self.shared.driver.provider()
    }

    /// Queue `call` into the current unit and make sure a flush is pending.
    fn enqueue(&self, call: CallDescriptor) -> (Arc<MulticallUnit>, TagKey) {
        let queued = {
            let current = self.shared.unit.lock().unwrap_or_else(PoisonError::into_inner);
            let key = current.add(call, None);
            (Arc::clone(&current), key)
        };
        self.schedule();
        queued
    }

    fn schedule(&self) {
        if self.shared.scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            if shared.batch_window.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(shared.batch_window).await;
            }
            shared.flush().await;
        });
    }

    fn call_data(tx: &TxRequest) -> Result<(&str, &[u8]), CallError> {
        match (tx.to.as_deref(), tx.data.as_deref()) {
            (Some(to), Some(data)) => Ok((to, data)),
            _ => Err(CallError::MissingCallData),
        }
    }
}

#[async_trait]
impl Provider for MulticallProvider {
    /// Batched static call; a failed call surfaces as `Reverted`.
    async fn call(&self, tx: &TxRequest) -> Result<Vec<u8>, CallError> {
        let (to, data) = Self::call_data(tx)?;
        let call = CallDescriptor::read(to, data.to_vec())
            .with_allow_failure(self.shared.config.allow_failure);
        let (unit, key) = self.enqueue(call);

        let outcome = unit.wait(&key, &[]).await?;
        match (outcome.success, outcome.raw) {
            (true, RawOutcome::Bytes(bytes)) => Ok(bytes),
            (_, raw) => Err(CallError::Reverted {
                data: raw.hex().unwrap_or_else(|| "0x".to_string()),
            }),
        }
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u128, CallError> {
        self.base().estimate_gas(tx).await
    }

    async fn fee_data(&self) -> Result<FeeData, CallError> {
        self.base().fee_data().await
    }

    async fn chain_id(&self) -> Result<u64, CallError> {
        self.base().chain_id().await
    }

    async fn wait_for_receipt(&self, tx: &TxHandle) -> Result<Option<TxReceipt>, CallError> {
        self.base().wait_for_receipt(tx).await
    }

    async fn transaction_count(&self, address: &str, pending: bool) -> Result<u64, CallError> {
        self.base().transaction_count(address, pending).await
    }
}

#[async_trait]
impl Signer for MulticallProvider {
    fn address(&self) -> &str {
        self.shared.driver.signer().map(|s| s.address()).unwrap_or_default()
    }

    /// Batched submission; resolves with the handle of the aggregate
    /// transaction the call was bundled into. Per-call `value` and fee
    /// fields are not forwarded.
    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHandle, CallError> {
        if !self.shared.driver.is_signer() {
            return Err(CallError::ReadOnlyMutation);
        }
        let (to, data) = Self::call_data(&tx)?;
        let call = CallDescriptor::write(to, data.to_vec())
            .with_allow_failure(self.shared.config.allow_failure);
        let (unit, key) = self.enqueue(call);
        unit.wait_tx(&key, &[]).await
    }
}

impl std::fmt::Debug for MulticallProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MulticallProvider")
            .field("driver", &self.shared.driver)
            .field("batch_window", &self.shared.batch_window)
            .finish()
    }
}
