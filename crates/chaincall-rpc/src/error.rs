//! Transport-level error types.

use chaincall_core::CallError;
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors raised while talking to a JSON-RPC node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP round trip failed (connection refused, timeout, non-2xx).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Response (or result) could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The node returned a value that is well-formed JSON but not what the
    /// method promises (e.g. a malformed quantity).
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl TransportError {
    /// `true` for transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// `true` when the node itself rejected the request.
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

impl From<TransportError> for CallError {
    /// Execution reverts that carry revert data become `Reverted`; everything
    /// else is a transport failure.
    fn from(err: TransportError) -> Self {
        match &err {
            TransportError::Rpc(rpc) => match rpc.revert_data() {
                Some(data) => CallError::Reverted {
                    data: data.to_string(),
                },
                None => CallError::Transport(err.to_string()),
            },
            _ => CallError::Transport(err.to_string()),
        }
    }
}
