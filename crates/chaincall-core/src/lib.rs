//! chaincall-core: foundation types and traits for ChainCall.
//!
//! # Overview
//!
//! ChainCall batches independent contract reads and writes into aggregate
//! calls. The core crate defines:
//!
//! - [`CallDescriptor`]: one invocation: target, calldata, mutability
//! - [`Tag`] / [`TagKey`]: caller-chosen correlation keys and their canonical form
//! - [`signal`] module: abort controllers, timeouts, racing and cancellable delays
//! - [`FunctionSchema`] / [`ContractSchema`]: the per-contract capability map
//! - [`Codec`], [`Provider`], [`Signer`], [`RemoteInvoker`]: collaborator traits
//! - [`CallError`]: structured error type
//! - [`config`] module: global defaults and per-unit / per-call options
//! - [`logging`] module: tracing subscriber bootstrap

pub mod call;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod schema;
pub mod signal;
pub mod tag;

pub use call::{CallDescriptor, ResultSchema};
pub use codec::Codec;
pub use config::{CallOptions, ContractOptions, MulticallConfig, MulticallOptions, PriorityOptions};
pub use driver::{Driver, FeeData, Provider, Signer, TxHandle, TxReceipt, TxRequest};
pub use error::CallError;
pub use invoker::{AggregateResult, RemoteInvoker};
pub use schema::{
    CallMutability, ContractSchema, FunctionSchema, OutputShape, ParamSchema, SchemaRegistry,
    StateMutability,
};
pub use signal::{AbortController, AbortSignal};
pub use tag::{Tag, TagKey, TagValue};
