//! Call descriptors: immutable values describing one invocation.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::codec::{to_hex, Codec};
use crate::error::CallError;
use crate::schema::{CallMutability, FunctionSchema};

/// Default partial-failure tolerance for new descriptors.
pub const DEFAULT_ALLOW_FAILURE: bool = true;

/// How to decode a call's return data: the function schema plus the codec
/// that understands it.
#[derive(Clone)]
pub struct ResultSchema {
    function: Arc<FunctionSchema>,
    codec: Arc<dyn Codec>,
}

impl ResultSchema {
    pub fn new(function: Arc<FunctionSchema>, codec: Arc<dyn Codec>) -> Self {
        Self { function, codec }
    }

    pub fn function(&self) -> &FunctionSchema {
        &self.function
    }

    /// Decode into one value per declared output.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<Value>, CallError> {
        self.codec.decode(&self.function, data)
    }

    /// Decode and apply the output-shape policy.
    pub fn decode_shaped(&self, data: &[u8]) -> Result<Value, CallError> {
        Ok(self.function.shape_outputs(self.decode(data)?))
    }
}

impl fmt::Debug for ResultSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSchema")
            .field("function", &self.function.name)
            .finish()
    }
}

/// One invocation: target, encoded payload, mutability and failure policy.
///
/// Descriptors are built once (usually by `Contract::get_call`) and never
/// change afterwards; the builder methods consume `self`.
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    target: String,
    payload: Vec<u8>,
    mutability: CallMutability,
    allow_failure: bool,
    result: Option<ResultSchema>,
}

impl CallDescriptor {
    pub fn new(target: impl Into<String>, payload: Vec<u8>, mutability: CallMutability) -> Self {
        Self {
            target: target.into(),
            payload,
            mutability,
            allow_failure: DEFAULT_ALLOW_FAILURE,
            result: None,
        }
    }

    /// A read-only call.
    pub fn read(target: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(target, payload, CallMutability::Static)
    }

    /// A state-changing call.
    pub fn write(target: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(target, payload, CallMutability::Mutable)
    }

    pub fn with_allow_failure(mut self, allow_failure: bool) -> Self {
        self.allow_failure = allow_failure;
        self
    }

    pub fn with_result(mut self, result: ResultSchema) -> Self {
        self.result = Some(result);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_hex(&self) -> String {
        to_hex(&self.payload)
    }

    pub fn mutability(&self) -> CallMutability {
        self.mutability
    }

    pub fn is_static(&self) -> bool {
        self.mutability.is_static()
    }

    pub fn allow_failure(&self) -> bool {
        self.allow_failure
    }

    pub fn result(&self) -> Option<&ResultSchema> {
        self.result.as_ref()
    }

    /// Name of the decoded operation, when a result schema is attached.
    pub fn method(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.function().name.as_str())
    }
}
