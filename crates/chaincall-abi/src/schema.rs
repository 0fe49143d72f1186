//! ABI JSON → [`ContractSchema`].

use alloy_dyn_abi::Specifier;
use alloy_json_abi::{JsonAbi, Param, StateMutability as AbiMutability};
use chaincall_core::{
    error::CallError,
    schema::{ContractSchema, FunctionSchema, ParamSchema, StateMutability},
};

/// Build the capability map of a contract from a standard Ethereum ABI JSON
/// string. Only `function` entries are kept; events, errors and the
/// constructor are ignored.
pub fn parse_abi(abi_json: &str) -> Result<ContractSchema, CallError> {
    let abi: JsonAbi = serde_json::from_str(abi_json)
        .map_err(|e| CallError::Schema(format!("invalid ABI JSON: {e}")))?;
    schema_from_abi(&abi)
}

/// Build the capability map from an already-parsed ABI.
pub fn schema_from_abi(abi: &JsonAbi) -> Result<ContractSchema, CallError> {
    let mut functions = Vec::new();
    for func in abi.functions() {
        functions.push(FunctionSchema {
            name: func.name.clone(),
            inputs: params(&func.name, &func.inputs)?,
            outputs: params(&func.name, &func.outputs)?,
            state_mutability: mutability(func.state_mutability),
        });
    }
    Ok(ContractSchema::new(functions))
}

fn params(function: &str, params: &[Param]) -> Result<Vec<ParamSchema>, CallError> {
    params
        .iter()
        .map(|p| {
            let ty = p
                .resolve()
                .map_err(|e| CallError::Schema(format!("{function}: param '{}': {e}", p.name)))?;
            Ok(ParamSchema::new(p.name.clone(), ty.sol_type_name()))
        })
        .collect()
}

fn mutability(sm: AbiMutability) -> StateMutability {
    match sm {
        AbiMutability::Pure => StateMutability::Pure,
        AbiMutability::View => StateMutability::View,
        AbiMutability::NonPayable => StateMutability::NonPayable,
        AbiMutability::Payable => StateMutability::Payable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaincall_core::schema::{CallMutability, OutputShape, SchemaRegistry};

    const TEST_ABI: &str = r#"[
        {
            "name": "getBoth",
            "type": "function",
            "inputs": [],
            "outputs": [
                {"name": "first", "type": "uint256"},
                {"name": "second", "type": "uint256"}
            ],
            "stateMutability": "view"
        },
        {
            "name": "setFirst",
            "type": "function",
            "inputs": [{"name": "value", "type": "uint256"}],
            "outputs": [],
            "stateMutability": "nonpayable"
        },
        {
            "name": "Transfer",
            "type": "event",
            "inputs": [],
            "anonymous": false
        }
    ]"#;

    #[test]
    fn functions_become_schemas() {
        let schema = parse_abi(TEST_ABI).unwrap();
        assert_eq!(schema.len(), 2);

        let get_both = schema.require("getBoth").unwrap();
        assert_eq!(get_both.mutability(), CallMutability::Static);
        assert_eq!(get_both.output_shape(), OutputShape::Named);

        let set_first = schema.require("setFirst").unwrap();
        assert_eq!(set_first.mutability(), CallMutability::Mutable);
        assert_eq!(set_first.signature(), "setFirst(uint256)");
    }

    #[test]
    fn tuple_params_resolve_to_canonical_types() {
        let schema = parse_abi(crate::multicall3::MULTICALL3_ABI).unwrap();
        let agg = schema.require(crate::multicall3::AGGREGATE3).unwrap();
        assert_eq!(agg.signature(), "aggregate3((address,bool,bytes)[])");
        assert_eq!(agg.outputs[0].ty, "(bool,bytes)[]");
    }

    #[test]
    fn invalid_json_is_a_schema_error() {
        assert!(matches!(parse_abi("not json"), Err(CallError::Schema(_))));
    }
}
