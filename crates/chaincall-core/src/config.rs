//! Configuration types: global defaults and per-unit / per-call overrides.
//!
//! Every struct derives `Deserialize` with `#[serde(default)]`, so an
//! embedding application can load any subset of fields from its own config
//! source. Abort signals are runtime-only and never (de)serialized.

use serde::{Deserialize, Serialize};

use crate::call::DEFAULT_ALLOW_FAILURE;
use crate::schema::CallMutability;
use crate::signal::AbortSignal;

/// Canonical Multicall3 deployment address.
pub const MULTICALL_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

/// Default fee/gas bump applied by priority submission.
pub const DEFAULT_PRIORITY_MULTIPLIER: f64 = 1.2;

/// Global defaults for batching and dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MulticallConfig {
    /// Address of the aggregate-call contract.
    pub address: String,
    /// Default partial-failure tolerance for descriptors built by contracts.
    pub allow_failure: bool,
    /// Await a receipt for every mutable chunk.
    pub wait_for_txs: bool,
    pub max_static_calls_stack: usize,
    pub max_mutable_calls_stack: usize,
    pub static_calls_timeout_ms: u64,
    pub mutable_calls_timeout_ms: u64,
    /// Default timeout for per-tag waiters.
    pub wait_calls_timeout_ms: u64,
    /// Cooperative pause between consecutive chunks.
    pub batch_delay_ms: u64,
    pub priority_multiplier: f64,
}

impl Default for MulticallConfig {
    fn default() -> Self {
        Self {
            address: MULTICALL_ADDRESS.to_string(),
            allow_failure: DEFAULT_ALLOW_FAILURE,
            wait_for_txs: true,
            max_static_calls_stack: 50,
            max_mutable_calls_stack: 10,
            static_calls_timeout_ms: 10_000,
            mutable_calls_timeout_ms: 20_000,
            wait_calls_timeout_ms: 30_000,
            batch_delay_ms: 0,
            priority_multiplier: DEFAULT_PRIORITY_MULTIPLIER,
        }
    }
}

/// Tuning for fee/gas-bumped submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityOptions {
    /// Fetch fee data and the gas estimate concurrently.
    pub asynchronous: bool,
    /// Explicit chain id to stamp on the transaction.
    pub chain_id: Option<u64>,
    /// Query the chain id from the network (takes precedence over `chain_id`).
    pub provide_chain_id: bool,
    /// Fee and gas-limit multiplier; falls back to the configured default.
    pub multiplier: Option<f64>,
    pub timeout_ms: Option<u64>,
    #[serde(skip)]
    pub signals: Vec<AbortSignal>,
}

/// Per-unit or per-run batching options. `None` falls through to the next
/// layer (unit options, then [`MulticallConfig`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MulticallOptions {
    /// Route every descriptor to one group regardless of its own mutability.
    pub force_mutability: Option<CallMutability>,
    pub wait_for_txs: Option<bool>,
    pub high_priority_txs: Option<bool>,
    pub priority_options: Option<PriorityOptions>,
    pub max_static_calls_stack: Option<usize>,
    pub max_mutable_calls_stack: Option<usize>,
    pub static_calls_timeout_ms: Option<u64>,
    pub mutable_calls_timeout_ms: Option<u64>,
    pub wait_calls_timeout_ms: Option<u64>,
    pub batch_delay_ms: Option<u64>,
    #[serde(skip)]
    pub signals: Vec<AbortSignal>,
}

impl MulticallOptions {
    /// Layer `over` on top of `self`: set fields in `over` win, signals from
    /// both layers apply.
    pub fn overlay(&self, over: &MulticallOptions) -> MulticallOptions {
        let mut signals = self.signals.clone();
        signals.extend(over.signals.iter().cloned());
        MulticallOptions {
            force_mutability: over.force_mutability.or(self.force_mutability),
            wait_for_txs: over.wait_for_txs.or(self.wait_for_txs),
            high_priority_txs: over.high_priority_txs.or(self.high_priority_txs),
            priority_options: over
                .priority_options
                .clone()
                .or_else(|| self.priority_options.clone()),
            max_static_calls_stack: over.max_static_calls_stack.or(self.max_static_calls_stack),
            max_mutable_calls_stack: over
                .max_mutable_calls_stack
                .or(self.max_mutable_calls_stack),
            static_calls_timeout_ms: over
                .static_calls_timeout_ms
                .or(self.static_calls_timeout_ms),
            mutable_calls_timeout_ms: over
                .mutable_calls_timeout_ms
                .or(self.mutable_calls_timeout_ms),
            wait_calls_timeout_ms: over.wait_calls_timeout_ms.or(self.wait_calls_timeout_ms),
            batch_delay_ms: over.batch_delay_ms.or(self.batch_delay_ms),
            signals,
        }
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signals.push(signal);
        self
    }
}

/// Per-dispatcher defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractOptions {
    pub force_mutability: Option<CallMutability>,
    pub high_priority_txs: bool,
    pub priority_options: PriorityOptions,
    pub static_calls_timeout_ms: Option<u64>,
    pub mutable_calls_timeout_ms: Option<u64>,
    /// Partial-failure tolerance stamped on descriptors built by `get_call`.
    pub allow_failure: Option<bool>,
}

/// Per-call overrides for the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub force_mutability: Option<CallMutability>,
    pub high_priority_tx: Option<bool>,
    pub priority_options: Option<PriorityOptions>,
    /// Overrides the static/mutable default timeout.
    pub timeout_ms: Option<u64>,
    pub signals: Vec<AbortSignal>,
}

impl CallOptions {
    pub fn forced(mutability: CallMutability) -> Self {
        Self {
            force_mutability: Some(mutability),
            ..Default::default()
        }
    }

    pub fn with_signals(mut self, signals: impl IntoIterator<Item = AbortSignal>) -> Self {
        self.signals.extend(signals);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}
