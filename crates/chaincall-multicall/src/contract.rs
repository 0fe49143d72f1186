//! Call dispatcher: executes one contract operation against a driver.
//!
//! A [`Contract`] pairs an address with a [`ContractSchema`] (the capability
//! map built once from the ABI) and a [`Codec`]. Static operations go out as
//! `eth_call`-style reads; mutable ones are submitted through the signer,
//! optionally with [`priority_call`] bumping.

use std::sync::Arc;
use std::time::Duration;

use chaincall_abi::{parse_abi, AbiCodec};
use chaincall_core::{
    call::ResultSchema,
    signal::{race_with_signals, timeout_signal},
    AbortSignal, CallDescriptor, CallError, CallMutability, CallOptions, Codec, ContractOptions,
    ContractSchema, Driver, FunctionSchema, MulticallConfig, PriorityOptions, Provider,
    SchemaRegistry, Signer, TxRequest,
};
use serde_json::Value;

use crate::outcome::CallOutput;
use crate::priority::priority_call;

/// A contract bound to an optional address and driver.
#[derive(Clone)]
pub struct Contract {
    address: Option<String>,
    schema: Arc<ContractSchema>,
    codec: Arc<dyn Codec>,
    driver: Option<Driver>,
    options: ContractOptions,
    config: MulticallConfig,
}

impl Contract {
    pub fn new(schema: Arc<ContractSchema>, codec: Arc<dyn Codec>) -> Self {
        Self {
            address: None,
            schema,
            codec,
            driver: None,
            options: ContractOptions::default(),
            config: MulticallConfig::default(),
        }
    }

    /// Build a contract from standard ABI JSON using the EVM codec.
    pub fn from_abi(
        abi_json: &str,
        address: Option<&str>,
        driver: Option<Driver>,
    ) -> Result<Self, CallError> {
        let mut contract = Self::new(Arc::new(parse_abi(abi_json)?), Arc::new(AbiCodec::new()));
        contract.address = address.map(str::to_string);
        contract.driver = driver;
        Ok(contract)
    }

    pub fn at(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn connect(mut self, driver: Driver) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_options(mut self, options: ContractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_config(mut self, config: MulticallConfig) -> Self {
        self.config = config;
        self
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn schema(&self) -> &ContractSchema {
        &self.schema
    }

    pub fn driver(&self) -> Option<&Driver> {
        self.driver.as_ref()
    }

    pub fn provider(&self) -> Option<&Arc<dyn Provider>> {
        self.driver.as_ref().map(Driver::provider)
    }

    pub fn signer(&self) -> Option<&Arc<dyn Signer>> {
        self.driver.as_ref().and_then(Driver::signer)
    }

    /// Both an address and a driver are present.
    pub fn is_callable(&self) -> bool {
        self.address.is_some() && self.driver.is_some()
    }

    /// Not callable, or connected without a signer.
    pub fn is_readonly(&self) -> bool {
        !self.is_callable() || self.signer().is_none()
    }

    /// Capability handle for one operation of the schema.
    pub fn method(&self, name: &str) -> Result<Method<'_>, CallError> {
        let function = Arc::clone(self.schema.require(name)?);
        Ok(Method {
            contract: self,
            function,
        })
    }

    /// Execute `method` with `args`.
    ///
    /// Static operations return the decoded result shaped per the output
    /// policy; mutable operations return the submission handle.
    pub async fn call(
        &self,
        method: &str,
        args: &[Value],
        options: CallOptions,
    ) -> Result<CallOutput, CallError> {
        let (address, driver) = self.callable()?;
        let function = self.schema.require(method)?;
        let payload = self.codec.encode(function, args)?;

        let mutability = options
            .force_mutability
            .or(self.options.force_mutability)
            .unwrap_or_else(|| function.mutability());
        let signals = self.signals(mutability, &options);
        let tx = TxRequest::call(address, payload);

        match mutability {
            CallMutability::Static => {
                tracing::debug!(method, address, "static call");
                let data = race_with_signals(driver.provider().call(&tx), &signals).await?;
                let decoded = ResultSchema::new(Arc::clone(function), Arc::clone(&self.codec))
                    .decode_shaped(&data)?;
                Ok(CallOutput::Value(decoded))
            }
            CallMutability::Mutable => {
                let signer = driver.signer().ok_or(CallError::ReadOnlyMutation)?;
                let high_priority = options
                    .high_priority_tx
                    .unwrap_or(self.options.high_priority_txs);
                tracing::debug!(method, address, high_priority, "mutable call");

                let handle = if high_priority {
                    let priority = self.priority_options(&options, &signals);
                    race_with_signals(
                        priority_call(
                            driver.provider().as_ref(),
                            signer.as_ref(),
                            tx,
                            &priority,
                            self.config.priority_multiplier,
                        ),
                        &signals,
                    )
                    .await?
                } else {
                    race_with_signals(signer.send_transaction(tx), &signals).await?
                };
                Ok(CallOutput::Tx(handle))
            }
        }
    }

    /// A batchable descriptor for `method(args)`.
    pub fn get_call(&self, method: &str, args: &[Value]) -> Result<CallDescriptor, CallError> {
        let address = self.address.as_deref().ok_or(CallError::MissingAddress)?;
        let function = self.schema.require(method)?;
        self.descriptor(address, function, args)
    }

    /// Gas estimate of the mutable operation `method(args)`.
    pub async fn estimate(
        &self,
        method: &str,
        args: &[Value],
        options: CallOptions,
    ) -> Result<u128, CallError> {
        let (address, driver) = self.callable()?;
        let function = self.schema.require(method)?;
        let mutability = options
            .force_mutability
            .or(self.options.force_mutability)
            .unwrap_or_else(|| function.mutability());
        if mutability.is_static() {
            return Err(CallError::EstimateStaticCall {
                method: method.to_string(),
            });
        }

        let mut tx = TxRequest::call(address, self.codec.encode(function, args)?);
        tx.from = driver.signer().map(|s| s.address().to_string());
        let signals = self.signals(mutability, &options);
        race_with_signals(driver.provider().estimate_gas(&tx), &signals).await
    }

    fn callable(&self) -> Result<(&str, &Driver), CallError> {
        match (self.address.as_deref(), self.driver.as_ref()) {
            (Some(address), Some(driver)) => Ok((address, driver)),
            _ => Err(CallError::NonCallable),
        }
    }

    fn descriptor(
        &self,
        address: &str,
        function: &Arc<FunctionSchema>,
        args: &[Value],
    ) -> Result<CallDescriptor, CallError> {
        let payload = self.codec.encode(function, args)?;
        let mutability = self
            .options
            .force_mutability
            .unwrap_or_else(|| function.mutability());
        let allow_failure = self.options.allow_failure.unwrap_or(self.config.allow_failure);
        Ok(CallDescriptor::new(address, payload, mutability)
            .with_allow_failure(allow_failure)
            .with_result(ResultSchema::new(Arc::clone(function), Arc::clone(&self.codec))))
    }

    /// Caller signals plus a timeout for the resolved mutability.
    fn signals(&self, mutability: CallMutability, options: &CallOptions) -> Vec<AbortSignal> {
        let default_ms = match mutability {
            CallMutability::Static => self
                .options
                .static_calls_timeout_ms
                .unwrap_or(self.config.static_calls_timeout_ms),
            CallMutability::Mutable => self
                .options
                .mutable_calls_timeout_ms
                .unwrap_or(self.config.mutable_calls_timeout_ms),
        };
        let timeout_ms = options.timeout_ms.unwrap_or(default_ms);

        let mut signals = options.signals.clone();
        signals.push(timeout_signal(Duration::from_millis(timeout_ms)));
        signals
    }

    fn priority_options(&self, options: &CallOptions, signals: &[AbortSignal]) -> PriorityOptions {
        let mut priority = options
            .priority_options
            .clone()
            .unwrap_or_else(|| self.options.priority_options.clone());
        let mut all = signals.to_vec();
        all.append(&mut priority.signals);
        priority.signals = all;
        priority
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("address", &self.address)
            .field("functions", &self.schema.len())
            .field("driver", &self.driver)
            .finish()
    }
}

/// One operation of a [`Contract`], resolved from its capability map.
pub struct Method<'a> {
    contract: &'a Contract,
    function: Arc<FunctionSchema>,
}

impl Method<'_> {
    pub fn schema(&self) -> &FunctionSchema {
        &self.function
    }

    pub fn mutability(&self) -> CallMutability {
        self.function.mutability()
    }

    pub async fn call(&self, args: &[Value], options: CallOptions) -> Result<CallOutput, CallError> {
        self.contract.call(&self.function.name, args, options).await
    }

    pub fn descriptor(&self, args: &[Value]) -> Result<CallDescriptor, CallError> {
        let address = self.contract.address().ok_or(CallError::MissingAddress)?;
        self.contract.descriptor(address, &self.function, args)
    }

    pub async fn estimate(&self, args: &[Value], options: CallOptions) -> Result<u128, CallError> {
        self.contract.estimate(&self.function.name, args, options).await
    }
}
