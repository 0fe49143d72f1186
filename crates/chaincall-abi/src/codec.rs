//! `AbiCodec`: the EVM implementation of [`Codec`].
//!
//! Calldata is `selector ++ abi_encode_params(args...)`, the selector being
//! the first four bytes of `keccak256(signature)`.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::keccak256;
use chaincall_core::{codec::Codec, error::CallError, schema::FunctionSchema, ParamSchema};
use serde_json::Value;

use crate::{encoder::json_to_dyn_value, normalizer};

/// Stateless EVM ABI codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiCodec;

impl AbiCodec {
    pub fn new() -> Self {
        Self
    }

    /// 4-byte selector of `function`.
    pub fn selector(function: &FunctionSchema) -> [u8; 4] {
        let hash = keccak256(function.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }
}

impl Codec for AbiCodec {
    fn encode(&self, function: &FunctionSchema, args: &[Value]) -> Result<Vec<u8>, CallError> {
        if args.len() != function.inputs.len() {
            return Err(CallError::Codec(format!(
                "{}: argument count mismatch: ABI has {}, got {}",
                function.name,
                function.inputs.len(),
                args.len()
            )));
        }

        let types = resolve_all(&function.inputs)?;
        let mut dyn_values = Vec::with_capacity(args.len());
        for ((param, ty), arg) in function.inputs.iter().zip(&types).zip(args) {
            let dyn_val = json_to_dyn_value(arg, ty).map_err(|e| {
                CallError::Codec(format!("{}: param '{}': {e}", function.name, param.name))
            })?;
            dyn_values.push(dyn_val);
        }

        let mut calldata = Self::selector(function).to_vec();
        calldata.extend_from_slice(&DynSolValue::Tuple(dyn_values).abi_encode_params());
        Ok(calldata)
    }

    fn decode(&self, function: &FunctionSchema, data: &[u8]) -> Result<Vec<Value>, CallError> {
        if function.outputs.is_empty() {
            return Ok(vec![]);
        }

        let tuple_type = DynSolType::Tuple(resolve_all(&function.outputs)?);
        let decoded = tuple_type
            .abi_decode_params(data)
            .map_err(|e| CallError::Codec(format!("{} output decode: {e}", function.name)))?;

        let values = match decoded {
            DynSolValue::Tuple(vals) => vals,
            other => vec![other],
        };
        Ok(values.into_iter().map(normalizer::normalize).collect())
    }
}

fn resolve_all(params: &[ParamSchema]) -> Result<Vec<DynSolType>, CallError> {
    params
        .iter()
        .map(|p| {
            DynSolType::parse(&p.ty).map_err(|e| CallError::Codec(format!("type '{}': {e}", p.ty)))
        })
        .collect()
}
