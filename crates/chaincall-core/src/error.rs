//! Call-level error types.

use thiserror::Error;

/// Errors that can occur while building, dispatching or batching a call.
///
/// `CallError` is `Clone` so a single triggering error can be delivered to
/// every waiter parked on an unresolved tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The contract has no address or no driver.
    #[error("contract was created as non-callable, but an attempt was made to call it")]
    NonCallable,

    /// A mutating call was attempted without a signer.
    #[error("contract was created as read-only, but an attempt was made to call a mutable method")]
    ReadOnlyMutation,

    /// A call descriptor was requested from a contract without an address.
    #[error("contract address was not provided")]
    MissingAddress,

    /// The operation name is not part of the target's schema.
    #[error("method \"{method}\" was not found on the contract")]
    MethodNotFound { method: String },

    /// The operation exists but its fragment could not be resolved.
    #[error("fragment for method \"{method}\" was not found on the contract")]
    FragmentNotFound { method: String },

    /// Gas estimation was requested for a static method.
    #[error("cannot estimate gas for static method \"{method}\"")]
    EstimateStaticCall { method: String },

    /// `run()` was invoked while another run was executing.
    #[error("another execution was triggered during processing")]
    SimultaneousInvocation,

    /// The tag is unresolved or its result cannot be decoded.
    #[error("multicall result not found")]
    ResultNotFound,

    /// The tag holds no transaction handle.
    #[error("multicall transaction response not found")]
    ResponseNotFound,

    /// The tag holds no transaction receipt.
    #[error("multicall transaction receipt not found")]
    ReceiptNotFound,

    /// An abort signal or timeout fired.
    #[error("operation aborted: {reason}")]
    Aborted { reason: String },

    /// The call executed but reported failure; `data` is the 0x-hex revert payload.
    #[error("call reverted: {data}")]
    Reverted { data: String },

    /// A request reached the batching front without a target or calldata.
    #[error("provider call is missing target or calldata")]
    MissingCallData,

    /// Encoding or decoding through the codec failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Schema parsing or resolution failed.
    #[error("schema error: {0}")]
    Schema(String),

    /// The remote endpoint failed (connection, RPC error, malformed response).
    #[error("transport error: {0}")]
    Transport(String),
}

impl CallError {
    /// Shorthand for an `Aborted` error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error was produced by a signal or timeout.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::SimultaneousInvocation)
    }
}

impl From<serde_json::Error> for CallError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_is_classified() {
        let err = CallError::aborted("Timeout exceeded");
        assert!(err.is_abort());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "operation aborted: Timeout exceeded");
    }

    #[test]
    fn method_not_found_names_the_method() {
        let err = CallError::MethodNotFound {
            method: "balanceOf".into(),
        };
        assert!(err.to_string().contains("balanceOf"));
    }
}
