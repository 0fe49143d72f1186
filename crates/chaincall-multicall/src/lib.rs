//! chaincall-multicall: batching, correlation and dispatch.
//!
//! # Overview
//!
//! - [`MulticallUnit`]: queue tagged calls, run them as aggregate calls,
//!   read or await each tag's outcome
//! - [`Contract`]: schema-driven dispatcher producing call descriptors and
//!   executing single calls (static reads, plain or priority submissions)
//! - [`Multicall3`]: [`RemoteInvoker`](chaincall_core::RemoteInvoker) over
//!   the `aggregate3` deployment
//! - [`MulticallProvider`]: drop-in provider that batches every call issued
//!   within one scheduler turn
//! - [`priority_call`] and [`wait_for_address_txs`]: transaction helpers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # async fn demo(driver: chaincall_core::Driver, abi: &str) -> Result<(), chaincall_core::CallError> {
//! use chaincall_multicall::{Contract, MulticallUnit};
//! use serde_json::json;
//!
//! let token = Contract::from_abi(abi, Some("0x0000000000000000000000000000000000000001"), Some(driver.clone()))?;
//! let unit = MulticallUnit::connect(driver)?;
//! unit.add(token.get_call("balanceOf", &[json!("0x00000000000000000000000000000000000000aa")])?, Some("balance".into()));
//! unit.add(token.get_call("totalSupply", &[])?, Some("supply".into()));
//!
//! unit.run(None).await?;
//! let balance = unit.get_single_or_throw("balance")?;
//! # let _ = balance;
//! # Ok(())
//! # }
//! ```

pub mod contract;
pub mod helpers;
pub mod invoker;
pub mod outcome;
pub mod priority;
pub mod provider;
pub mod unit;

pub use contract::{Contract, Method};
pub use helpers::wait_for_address_txs;
pub use invoker::Multicall3;
pub use outcome::{CallOutput, ExecutionOutcome, RawOutcome};
pub use priority::priority_call;
pub use provider::MulticallProvider;
pub use unit::MulticallUnit;
