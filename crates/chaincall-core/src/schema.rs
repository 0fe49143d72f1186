//! Function schemas and the per-contract capability map.
//!
//! A [`ContractSchema`] is built once from an ABI (see `chaincall-abi`) and
//! answers two questions for every operation name: is it static or mutable,
//! and what shape do its outputs have.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CallError;

/// State mutability as declared by the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl StateMutability {
    /// The call capability implied by this mutability.
    pub fn call_mutability(self) -> CallMutability {
        match self {
            Self::Pure | Self::View => CallMutability::Static,
            Self::NonPayable | Self::Payable => CallMutability::Mutable,
        }
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pure => write!(f, "pure"),
            Self::View => write!(f, "view"),
            Self::NonPayable => write!(f, "nonpayable"),
            Self::Payable => write!(f, "payable"),
        }
    }
}

/// Whether a call reads state or mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMutability {
    /// Read-only; executed as a static call.
    Static,
    /// State-changing; requires a signer and produces a transaction.
    Mutable,
}

impl CallMutability {
    pub fn is_static(self) -> bool {
        matches!(self, Self::Static)
    }
}

impl fmt::Display for CallMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Mutable => write!(f, "mutable"),
        }
    }
}

/// One input or output parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSchema {
    /// Parameter name; empty when the ABI leaves it unnamed.
    pub name: String,
    /// Canonical type string, e.g. `uint256` or `(bool,bytes)[]`.
    pub ty: String,
}

impl ParamSchema {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

/// How decoded outputs are presented to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// No outputs.
    Empty,
    /// Exactly one output: returned as a scalar.
    Single,
    /// Several outputs, all named: returned as a keyed map.
    Named,
    /// Several outputs, at least one unnamed: returned as an array.
    Positional,
}

/// Schema of a single contract function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub inputs: Vec<ParamSchema>,
    pub outputs: Vec<ParamSchema>,
    pub state_mutability: StateMutability,
}

impl FunctionSchema {
    pub fn mutability(&self) -> CallMutability {
        self.state_mutability.call_mutability()
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn output_shape(&self) -> OutputShape {
        match self.outputs.len() {
            0 => OutputShape::Empty,
            1 => OutputShape::Single,
            _ if self.outputs.iter().all(ParamSchema::is_named) => OutputShape::Named,
            _ => OutputShape::Positional,
        }
    }

    /// Apply the decoding policy to decoded output values.
    ///
    /// One output → that value; all outputs named → object; otherwise an
    /// array. No outputs → `Null`.
    pub fn shape_outputs(&self, mut values: Vec<Value>) -> Value {
        match self.output_shape() {
            OutputShape::Empty => Value::Null,
            OutputShape::Single => values.pop().unwrap_or(Value::Null),
            OutputShape::Named => Value::Object(self.named_outputs(values)),
            OutputShape::Positional => Value::Array(values),
        }
    }

    /// Key decoded outputs by name; unnamed outputs are keyed by position.
    pub fn named_outputs(&self, values: Vec<Value>) -> Map<String, Value> {
        self.outputs
            .iter()
            .enumerate()
            .zip(values)
            .map(|((i, param), value)| {
                let key = if param.is_named() {
                    param.name.clone()
                } else {
                    i.to_string()
                };
                (key, value)
            })
            .collect()
    }
}

/// Resolves operation names to function schemas.
pub trait SchemaRegistry: Send + Sync {
    fn function(&self, name: &str) -> Option<&Arc<FunctionSchema>>;

    /// Like [`function`](Self::function) but fails with `MethodNotFound`.
    fn require(&self, name: &str) -> Result<&Arc<FunctionSchema>, CallError> {
        self.function(name).ok_or_else(|| CallError::MethodNotFound {
            method: name.to_string(),
        })
    }
}

/// Capability map of a contract: operation name → schema, built once.
///
/// Overloaded functions keep the first declaration under the bare name;
/// every declaration is also reachable by its full signature.
#[derive(Debug, Clone, Default)]
pub struct ContractSchema {
    functions: HashMap<String, Arc<FunctionSchema>>,
    order: Vec<String>,
}

impl ContractSchema {
    pub fn new(functions: impl IntoIterator<Item = FunctionSchema>) -> Self {
        let mut schema = Self::default();
        for function in functions {
            let function = Arc::new(function);
            let signature = function.signature();
            if !schema.functions.contains_key(&function.name) {
                schema.order.push(function.name.clone());
                schema
                    .functions
                    .insert(function.name.clone(), Arc::clone(&function));
            }
            schema.functions.entry(signature).or_insert(function);
        }
        schema
    }

    /// Function names in declaration order (overloads listed once).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl SchemaRegistry for ContractSchema {
    fn function(&self, name: &str) -> Option<&Arc<FunctionSchema>> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn func(name: &str, outputs: &[(&str, &str)], sm: StateMutability) -> FunctionSchema {
        FunctionSchema {
            name: name.into(),
            inputs: vec![],
            outputs: outputs
                .iter()
                .map(|(n, t)| ParamSchema::new(*n, *t))
                .collect(),
            state_mutability: sm,
        }
    }

    #[test]
    fn mutability_is_closed_over_two_values() {
        assert_eq!(StateMutability::View.call_mutability(), CallMutability::Static);
        assert_eq!(StateMutability::Pure.call_mutability(), CallMutability::Static);
        assert_eq!(StateMutability::Payable.call_mutability(), CallMutability::Mutable);
        assert_eq!(
            StateMutability::NonPayable.call_mutability(),
            CallMutability::Mutable
        );
    }

    #[test]
    fn single_output_is_returned_as_scalar() {
        let f = func("getFirst", &[("", "uint256")], StateMutability::View);
        assert_eq!(f.shape_outputs(vec![json!(9)]), json!(9));
    }

    #[test]
    fn named_outputs_become_an_object() {
        let f = func(
            "getBoth",
            &[("first", "uint256"), ("second", "uint256")],
            StateMutability::View,
        );
        assert_eq!(f.output_shape(), OutputShape::Named);
        assert_eq!(
            f.shape_outputs(vec![json!(1), json!(2)]),
            json!({"first": 1, "second": 2})
        );
    }

    #[test]
    fn partially_named_outputs_stay_positional() {
        let f = func(
            "pair",
            &[("a", "uint256"), ("", "bool")],
            StateMutability::View,
        );
        assert_eq!(f.shape_outputs(vec![json!(1), json!(true)]), json!([1, true]));
    }

    #[test]
    fn overloads_resolve_by_name_and_signature() {
        let mut a = func("set", &[], StateMutability::NonPayable);
        a.inputs = vec![ParamSchema::new("v", "uint256")];
        let mut b = func("set", &[], StateMutability::NonPayable);
        b.inputs = vec![ParamSchema::new("v", "uint256"), ParamSchema::new("w", "uint256")];
        let schema = ContractSchema::new([a, b]);

        assert_eq!(schema.len(), 1);
        assert_eq!(schema.function("set").unwrap().inputs.len(), 1);
        assert_eq!(
            schema.function("set(uint256,uint256)").unwrap().inputs.len(),
            2
        );
        assert!(matches!(
            schema.require("missing"),
            Err(CallError::MethodNotFound { .. })
        ));
    }
}
