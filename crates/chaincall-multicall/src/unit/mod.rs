//! Batch aggregator: tagged calls in, per-tag outcomes out.
//!
//! A [`MulticallUnit`] queues [`CallDescriptor`]s under normalized tags and
//! executes them with [`run`](MulticallUnit::run):
//!
//! 1. mutable calls first, in add-order, `max_mutable_calls_stack` per
//!    aggregate transaction, each optionally awaited for its receipt;
//! 2. then static calls, `max_static_calls_stack` per aggregate read.
//!
//! A failed chunk marks the run unsuccessful but does not stop it. Transport
//! errors and fired signals abort the whole run and reject every waiter
//! still parked on an unresolved tag. Each chunk's outcomes are recorded and
//! announced under one lock acquisition, so a waiter never observes a
//! half-written chunk.

mod broker;
mod split;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chaincall_core::{
    call::ResultSchema,
    signal::{check_signals, race_with_signals, timeout_signal, wait_with_signals},
    AbortSignal, CallDescriptor, CallError, CallMutability, CallOptions, Driver, MulticallConfig,
    MulticallOptions, PriorityOptions, RemoteInvoker, Tag, TagKey, TxHandle, TxReceipt,
};
use indexmap::IndexMap;
use serde_json::Value;

use crate::invoker::Multicall3;
use crate::outcome::{CallOutput, ExecutionOutcome, RawOutcome};
use broker::Broker;
use split::{chunk, split_calls, Entry};

struct Queued {
    tag: Tag,
    call: CallDescriptor,
}

#[derive(Default)]
struct UnitState {
    units: IndexMap<TagKey, Queued>,
    outcomes: HashMap<TagKey, ExecutionOutcome>,
    /// Result schemas of the calls the last run executed.
    schemas: HashMap<TagKey, ResultSchema>,
    last_success: Option<bool>,
    broker: Broker,
}

impl UnitState {
    fn reject_unresolved(&mut self, keys: &[TagKey], err: &CallError) {
        for key in keys {
            if !self.outcomes.contains_key(key) {
                self.broker.reject(key, err);
            }
        }
    }
}

/// Options of one run, resolved against unit options and global defaults.
struct RunSettings {
    force_mutability: Option<CallMutability>,
    wait_for_txs: bool,
    high_priority_txs: bool,
    priority_options: Option<PriorityOptions>,
    max_static: usize,
    max_mutable: usize,
    static_timeout_ms: u64,
    mutable_timeout_ms: u64,
    batch_delay: Duration,
    signals: Vec<AbortSignal>,
}

impl RunSettings {
    fn call_options(&self, mutability: CallMutability) -> CallOptions {
        let (timeout_ms, high_priority) = match mutability {
            CallMutability::Static => (self.static_timeout_ms, false),
            CallMutability::Mutable => (self.mutable_timeout_ms, self.high_priority_txs),
        };
        CallOptions {
            force_mutability: Some(mutability),
            high_priority_tx: Some(high_priority),
            priority_options: self.priority_options.clone(),
            timeout_ms: Some(timeout_ms),
            signals: self.signals.clone(),
        }
    }
}

/// Accumulates tagged calls and executes them as aggregate calls.
pub struct MulticallUnit {
    invoker: Arc<dyn RemoteInvoker>,
    config: MulticallConfig,
    options: MulticallOptions,
    executing: AtomicBool,
    state: Mutex<UnitState>,
}

impl MulticallUnit {
    pub fn new(invoker: Arc<dyn RemoteInvoker>) -> Self {
        Self {
            invoker,
            config: MulticallConfig::default(),
            options: MulticallOptions::default(),
            executing: AtomicBool::new(false),
            state: Mutex::new(UnitState::default()),
        }
    }

    /// A unit aggregating through Multicall3 at the default address.
    pub fn connect(driver: Driver) -> Result<Self, CallError> {
        Self::connect_with(driver, MulticallConfig::default(), MulticallOptions::default())
    }

    pub fn connect_with(
        driver: Driver,
        config: MulticallConfig,
        options: MulticallOptions,
    ) -> Result<Self, CallError> {
        let invoker = Multicall3::new(driver, &config)?;
        Ok(Self::new(Arc::new(invoker))
            .with_config(config)
            .with_options(options))
    }

    pub fn with_config(mut self, config: MulticallConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_options(mut self, options: MulticallOptions) -> Self {
        self.options = options;
        self
    }

    fn state(&self) -> MutexGuard<'_, UnitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── queue ────────────────────────────────────────────────────────────

    /// Queue `call` under `tag` (a fresh tag when `None`). Returns the
    /// normalized key the outcome will be stored under.
    ///
    /// A tag that normalizes to an already queued key replaces that entry
    /// in place.
    pub fn add(&self, call: CallDescriptor, tag: Option<Tag>) -> TagKey {
        let tag = tag.unwrap_or_else(Tag::generate);
        let key = tag.normalize();
        let replaced = self
            .state()
            .units
            .insert(key.clone(), Queued { tag, call })
            .is_some();
        if replaced {
            tracing::warn!(tag = %key, "tag collision: queued call replaced");
        }
        key
    }

    pub fn add_batch<I>(&self, calls: I) -> Vec<TagKey>
    where
        I: IntoIterator<Item = (CallDescriptor, Option<Tag>)>,
    {
        calls
            .into_iter()
            .map(|(call, tag)| self.add(call, tag))
            .collect()
    }

    /// Drop every queued call and recorded outcome. Parked waiters are
    /// rejected.
    pub fn clear(&self) -> Result<(), CallError> {
        if self.is_executing() {
            return Err(CallError::SimultaneousInvocation);
        }
        let mut state = self.state();
        state.broker.reject_all(&CallError::aborted("multicall unit cleared"));
        *state = UnitState::default();
        Ok(())
    }

    // ── views ────────────────────────────────────────────────────────────

    pub fn tags(&self) -> Vec<Tag> {
        self.state().units.values().map(|q| q.tag.clone()).collect()
    }

    pub fn calls(&self) -> Vec<CallDescriptor> {
        self.state().units.values().map(|q| q.call.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state().units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().units.is_empty()
    }

    /// Outcomes of the last run, in add-order.
    pub fn response(&self) -> Vec<(TagKey, ExecutionOutcome)> {
        let state = self.state();
        state
            .units
            .keys()
            .filter_map(|k| state.outcomes.get(k).map(|o| (k.clone(), o.clone())))
            .collect()
    }

    /// Overall success of the last run; `None` before the first one.
    pub fn success(&self) -> Option<bool> {
        self.state().last_success
    }

    /// No mutable call is queued.
    pub fn is_static(&self) -> bool {
        self.state().units.values().all(|q| q.call.is_static())
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    // ── execution ────────────────────────────────────────────────────────

    /// Execute every queued call. `options` override the unit's options for
    /// this run only.
    ///
    /// Returns `false` when any call or chunk failed. Fails with
    /// `SimultaneousInvocation` if another run is in progress.
    pub async fn run(&self, options: Option<MulticallOptions>) -> Result<bool, CallError> {
        let mut guard = ExecutionGuard::acquire(self)?;
        let settings = self.settings(options.as_ref());

        let snapshot: Vec<Entry> = {
            let mut state = self.state();
            state.outcomes.clear();
            state.last_success = None;
            let snapshot: Vec<Entry> = state
                .units
                .iter()
                .map(|(k, q)| (k.clone(), q.call.clone()))
                .collect();
            state.schemas = snapshot
                .iter()
                .filter_map(|(k, call)| call.result().map(|r| (k.clone(), r.clone())))
                .collect();
            snapshot
        };
        guard.keys = snapshot.iter().map(|(k, _)| k.clone()).collect();
        let total = snapshot.len();

        let result = self.execute(snapshot, &settings).await;

        guard.completed = true;
        let mut state = self.state();
        match result {
            Ok(success) => {
                state.last_success = Some(success);
                tracing::info!(calls = total, success, "multicall run finished");
                Ok(success)
            }
            Err(err) => {
                state.last_success = Some(false);
                state.reject_unresolved(&guard.keys, &err);
                tracing::warn!(calls = total, error = %err, "multicall run failed");
                Err(err)
            }
        }
    }

    /// Gas estimate per mutable chunk, split exactly as `run` would.
    pub async fn estimate_run(&self, options: Option<MulticallOptions>) -> Result<Vec<u128>, CallError> {
        let settings = self.settings(options.as_ref());
        check_signals(&settings.signals)?;

        let snapshot: Vec<Entry> = self
            .state()
            .units
            .iter()
            .map(|(k, q)| (k.clone(), q.call.clone()))
            .collect();
        let split = split_calls(snapshot, settings.force_mutability);
        let call_options = settings.call_options(CallMutability::Mutable);

        let mut estimates = Vec::new();
        for entries in chunk(&split.mutables, settings.max_mutable) {
            check_signals(&settings.signals)?;
            let calls = descriptors(entries);
            let estimate = race_with_signals(
                self.invoker.estimate_aggregate(&calls, &call_options),
                &settings.signals,
            )
            .await?;
            estimates.push(estimate);
        }
        Ok(estimates)
    }

    fn settings(&self, run: Option<&MulticallOptions>) -> RunSettings {
        let merged = match run {
            Some(run) => self.options.overlay(run),
            None => self.options.clone(),
        };
        let defaults = &self.config;
        RunSettings {
            force_mutability: merged.force_mutability,
            wait_for_txs: merged.wait_for_txs.unwrap_or(defaults.wait_for_txs),
            high_priority_txs: merged.high_priority_txs.unwrap_or(false),
            priority_options: merged.priority_options,
            max_static: merged
                .max_static_calls_stack
                .unwrap_or(defaults.max_static_calls_stack),
            max_mutable: merged
                .max_mutable_calls_stack
                .unwrap_or(defaults.max_mutable_calls_stack),
            static_timeout_ms: merged
                .static_calls_timeout_ms
                .unwrap_or(defaults.static_calls_timeout_ms),
            mutable_timeout_ms: merged
                .mutable_calls_timeout_ms
                .unwrap_or(defaults.mutable_calls_timeout_ms),
            batch_delay: Duration::from_millis(
                merged.batch_delay_ms.unwrap_or(defaults.batch_delay_ms),
            ),
            signals: merged.signals,
        }
    }

    async fn execute(&self, snapshot: Vec<Entry>, settings: &RunSettings) -> Result<bool, CallError> {
        check_signals(&settings.signals)?;
        let split = split_calls(snapshot, settings.force_mutability);
        let mut success = true;
        let mut started = false;

        // Mutable chunks run strictly in add-order, one at a time.
        for (index, entries) in chunk(&split.mutables, settings.max_mutable).enumerate() {
            between_chunks(settings, &mut started).await?;
            success &= self.run_mutable_chunk(index, entries, settings).await?;
        }
        for (index, entries) in chunk(&split.statics, settings.max_static).enumerate() {
            between_chunks(settings, &mut started).await?;
            success &= self.run_static_chunk(index, entries, settings).await?;
        }
        Ok(success)
    }

    async fn run_mutable_chunk(
        &self,
        index: usize,
        entries: &[Entry],
        settings: &RunSettings,
    ) -> Result<bool, CallError> {
        let calls = descriptors(entries);
        let options = settings.call_options(CallMutability::Mutable);
        tracing::debug!(chunk = index, size = calls.len(), "submitting mutable chunk");

        let tx = race_with_signals(self.invoker.aggregate(&calls, &options), &settings.signals).await?;

        let outcome = if settings.wait_for_txs {
            check_signals(&settings.signals)?;
            match race_with_signals(self.invoker.wait_for_receipt(&tx), &settings.signals).await? {
                Some(receipt) => ExecutionOutcome::new(receipt.status, RawOutcome::Receipt(receipt)),
                None => ExecutionOutcome::new(false, RawOutcome::Tx(tx)),
            }
        } else {
            ExecutionOutcome::new(true, RawOutcome::Tx(tx))
        };

        let success = outcome.success;
        if !success {
            tracing::warn!(chunk = index, size = calls.len(), "mutable chunk failed");
        }
        self.record(entries.iter().map(|(key, _)| (key.clone(), outcome.clone())));
        Ok(success)
    }

    async fn run_static_chunk(
        &self,
        index: usize,
        entries: &[Entry],
        settings: &RunSettings,
    ) -> Result<bool, CallError> {
        let calls = descriptors(entries);
        let options = settings.call_options(CallMutability::Static);
        tracing::debug!(chunk = index, size = calls.len(), "executing static chunk");

        let results =
            race_with_signals(self.invoker.static_aggregate(&calls, &options), &settings.signals).await?;
        if results.len() != calls.len() {
            tracing::warn!(
                chunk = index,
                expected = calls.len(),
                got = results.len(),
                "aggregate result count mismatch"
            );
        }

        let mut success = true;
        let mut results = results.into_iter();
        let mut outcomes = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            let outcome = match results.next() {
                Some(r) => ExecutionOutcome::new(r.success, RawOutcome::Bytes(r.data)),
                None => ExecutionOutcome::new(false, RawOutcome::None),
            };
            success &= outcome.success;
            outcomes.push((key.clone(), outcome));
        }
        self.record(outcomes);
        Ok(success)
    }

    /// Store one chunk's outcomes and wake their waiters in a single step.
    fn record(&self, outcomes: impl IntoIterator<Item = (TagKey, ExecutionOutcome)>) {
        let mut state = self.state();
        for (key, outcome) in outcomes {
            state.outcomes.insert(key.clone(), outcome);
            state.broker.resolve(&key);
        }
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn outcome(&self, tag: impl Into<TagKey>) -> Option<ExecutionOutcome> {
        self.state().outcomes.get(&tag.into()).cloned()
    }

    pub fn is_success(&self, tag: impl Into<TagKey>) -> Option<bool> {
        self.outcome(tag).map(|o| o.success)
    }

    pub fn get_raw(&self, tag: impl Into<TagKey>) -> Option<RawOutcome> {
        self.outcome(tag).map(|o| o.raw)
    }

    pub fn get_tx(&self, tag: impl Into<TagKey>) -> Option<TxHandle> {
        self.outcome(tag).and_then(|o| o.raw.tx())
    }

    pub fn get_tx_or_throw(&self, tag: impl Into<TagKey>) -> Result<TxHandle, CallError> {
        self.get_tx(tag).ok_or(CallError::ResponseNotFound)
    }

    pub fn get_receipt(&self, tag: impl Into<TagKey>) -> Option<TxReceipt> {
        self.outcome(tag).and_then(|o| o.raw.receipt().cloned())
    }

    pub fn get_receipt_or_throw(&self, tag: impl Into<TagKey>) -> Result<TxReceipt, CallError> {
        self.get_receipt(tag).ok_or(CallError::ReceiptNotFound)
    }

    /// Decoded result of a static call (shaped per its outputs), or the
    /// submission handle of a mutable call not awaited for its receipt.
    pub fn get(&self, tag: impl Into<TagKey>) -> Option<CallOutput> {
        let key = tag.into();
        match self.outcome(&key)?.raw {
            RawOutcome::Tx(tx) => Some(CallOutput::Tx(tx)),
            RawOutcome::Bytes(_) => self
                .decode_with(&key, |result, data| result.decode_shaped(data))
                .map(CallOutput::Value),
            RawOutcome::Receipt(_) | RawOutcome::None => None,
        }
    }

    pub fn get_or_throw(&self, tag: impl Into<TagKey>) -> Result<CallOutput, CallError> {
        self.get(tag).ok_or(CallError::ResultNotFound)
    }

    /// First decoded output.
    pub fn get_single(&self, tag: impl Into<TagKey>) -> Option<Value> {
        self.decode_with(&tag.into(), |result, data| {
            Ok(result.decode(data)?.into_iter().next().unwrap_or(Value::Null))
        })
    }

    pub fn get_single_or_throw(&self, tag: impl Into<TagKey>) -> Result<Value, CallError> {
        self.get_single(tag).ok_or(CallError::ResultNotFound)
    }

    /// Decoded outputs as a positional array.
    pub fn get_array(&self, tag: impl Into<TagKey>) -> Option<Value> {
        self.decode_with(&tag.into(), |result, data| Ok(Value::Array(result.decode(data)?)))
    }

    pub fn get_array_or_throw(&self, tag: impl Into<TagKey>) -> Result<Value, CallError> {
        self.get_array(tag).ok_or(CallError::ResultNotFound)
    }

    /// Decoded outputs keyed by name (position for unnamed outputs).
    pub fn get_object(&self, tag: impl Into<TagKey>) -> Option<Value> {
        self.decode_with(&tag.into(), |result, data| {
            let values = result.decode(data)?;
            Ok(Value::Object(result.function().named_outputs(values)))
        })
    }

    pub fn get_object_or_throw(&self, tag: impl Into<TagKey>) -> Result<Value, CallError> {
        self.get_object(tag).ok_or(CallError::ResultNotFound)
    }

    /// [`get`](Self::get) for several tags, in the given order.
    pub fn get_all<K, I>(&self, tags: I) -> Vec<Option<CallOutput>>
    where
        K: Into<TagKey>,
        I: IntoIterator<Item = K>,
    {
        tags.into_iter().map(|tag| self.get(tag)).collect()
    }

    pub fn get_all_or_throw<K, I>(&self, tags: I) -> Result<Vec<CallOutput>, CallError>
    where
        K: Into<TagKey>,
        I: IntoIterator<Item = K>,
    {
        tags.into_iter().map(|tag| self.get_or_throw(tag)).collect()
    }

    /// Apply `decode` to the successful return data of `key`, if its call
    /// carries a result schema.
    fn decode_with<F>(&self, key: &TagKey, decode: F) -> Option<Value>
    where
        F: FnOnce(&ResultSchema, &[u8]) -> Result<Value, CallError>,
    {
        let (result, data) = {
            let state = self.state();
            let outcome = state.outcomes.get(key)?;
            if !outcome.success {
                return None;
            }
            let data = outcome.raw.bytes()?.to_vec();
            let result = state.schemas.get(key)?.clone();
            (result, data)
        };
        match decode(&result, &data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(tag = %key, error = %e, "result decode failed");
                None
            }
        }
    }

    // ── waiters ──────────────────────────────────────────────────────────

    /// Resolve once `tag` has an outcome.
    ///
    /// Rejects when the run fails before reaching the tag, or when one of
    /// `signals` fires. Without signals the configured wait timeout applies.
    pub async fn wait(
        &self,
        tag: impl Into<TagKey>,
        signals: &[AbortSignal],
    ) -> Result<ExecutionOutcome, CallError> {
        let key = tag.into();
        let rx = {
            let mut state = self.state();
            if let Some(outcome) = state.outcomes.get(&key) {
                return Ok(outcome.clone());
            }
            state.broker.subscribe(key.clone())
        };
        let _subscription = Subscription { unit: self, key: &key };

        let mut signals = signals.to_vec();
        if signals.is_empty() {
            let timeout_ms = self
                .options
                .wait_calls_timeout_ms
                .unwrap_or(self.config.wait_calls_timeout_ms);
            signals.push(timeout_signal(Duration::from_millis(timeout_ms)));
        }

        race_with_signals(
            async move {
                match rx.await {
                    Ok(notified) => notified,
                    Err(_) => Err(CallError::aborted("multicall unit dropped")),
                }
            },
            &signals,
        )
        .await?;
        self.outcome(&key).ok_or(CallError::ResultNotFound)
    }

    /// Wait, then [`get_or_throw`](Self::get_or_throw).
    pub async fn wait_for(
        &self,
        tag: impl Into<TagKey>,
        signals: &[AbortSignal],
    ) -> Result<CallOutput, CallError> {
        let key = tag.into();
        self.wait(&key, signals).await?;
        self.get_or_throw(&key)
    }

    pub async fn wait_raw(
        &self,
        tag: impl Into<TagKey>,
        signals: &[AbortSignal],
    ) -> Result<RawOutcome, CallError> {
        Ok(self.wait(tag, signals).await?.raw)
    }

    pub async fn wait_tx(
        &self,
        tag: impl Into<TagKey>,
        signals: &[AbortSignal],
    ) -> Result<TxHandle, CallError> {
        self.wait(tag, signals)
            .await?
            .raw
            .tx()
            .ok_or(CallError::ResponseNotFound)
    }

    pub async fn wait_receipt(
        &self,
        tag: impl Into<TagKey>,
        signals: &[AbortSignal],
    ) -> Result<TxReceipt, CallError> {
        self.wait(tag, signals)
            .await?
            .raw
            .receipt()
            .cloned()
            .ok_or(CallError::ReceiptNotFound)
    }
}

impl fmt::Debug for MulticallUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("MulticallUnit")
            .field("queued", &state.units.len())
            .field("resolved", &state.outcomes.len())
            .field("waiters", &state.broker.pending())
            .field("executing", &self.is_executing())
            .field("success", &state.last_success)
            .finish()
    }
}

fn descriptors(entries: &[Entry]) -> Vec<CallDescriptor> {
    entries.iter().map(|(_, call)| call.clone()).collect()
}

/// Cooperative pause before every chunk but the first, then a signal check.
async fn between_chunks(settings: &RunSettings, started: &mut bool) -> Result<(), CallError> {
    if *started && !settings.batch_delay.is_zero() {
        wait_with_signals(settings.batch_delay, &settings.signals).await?;
    }
    *started = true;
    check_signals(&settings.signals)
}

/// Single-flight guard: holds the `executing` flag for one run.
///
/// Dropped without `completed` (the run future was cancelled), it rejects
/// the run's unresolved waiters with `Aborted`.
struct ExecutionGuard<'a> {
    unit: &'a MulticallUnit,
    keys: Vec<TagKey>,
    completed: bool,
}

/// Drops a waiter's sender once its receiver is gone, whatever way `wait`
/// exits.
struct Subscription<'a> {
    unit: &'a MulticallUnit,
    key: &'a TagKey,
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.unit.state().broker.prune(self.key);
    }
}

impl<'a> ExecutionGuard<'a> {
    fn acquire(unit: &'a MulticallUnit) -> Result<Self, CallError> {
        unit.executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CallError::SimultaneousInvocation)?;
        Ok(Self {
            unit,
            keys: Vec::new(),
            completed: false,
        })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let mut state = self.unit.state();
            state.last_success = Some(false);
            state.reject_unresolved(&self.keys, &CallError::aborted("multicall run cancelled"));
        }
        self.unit.executing.store(false, Ordering::Release);
    }
}
