//! chaincall-rpc: JSON-RPC collaborators for ChainCall.
//!
//! [`RpcProvider`] implements [`chaincall_core::Provider`] over any
//! [`RpcTransport`]; [`NodeSigner`] implements [`chaincall_core::Signer`] for
//! node-managed accounts. [`HttpRpcClient`] is the bundled transport.
//!
//! ```rust,no_run
//! # fn demo() -> Result<(), chaincall_core::CallError> {
//! use std::sync::Arc;
//! use chaincall_rpc::{NodeSigner, RpcProvider};
//!
//! let provider = Arc::new(RpcProvider::http("http://127.0.0.1:8545")?);
//! let driver = NodeSigner::new(provider, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").into_driver();
//! # let _ = driver;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod provider;
pub mod request;
pub mod retry;
pub mod signer;
pub mod transport;

pub use error::TransportError;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use provider::{RpcProvider, RpcProviderConfig};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use signer::NodeSigner;
pub use transport::RpcTransport;
