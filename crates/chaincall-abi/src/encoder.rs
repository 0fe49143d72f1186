//! JSON argument values → alloy `DynSolValue`, following the value
//! convention documented on [`chaincall_core::codec`].

use std::str::FromStr;

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, B256, I256, U256};
use chaincall_core::codec::from_hex;
use serde_json::Value;

/// Convert a JSON argument to the alloy value for the expected type.
pub fn json_to_dyn_value(val: &Value, expected: &DynSolType) -> Result<DynSolValue, String> {
    match (val, expected) {
        (Value::Bool(b), DynSolType::Bool) => Ok(DynSolValue::Bool(*b)),

        (Value::Number(n), DynSolType::Uint(bits)) => {
            let u = n
                .as_u64()
                .ok_or_else(|| format!("uint{bits}: {n} is not an unsigned integer"))?;
            Ok(DynSolValue::Uint(U256::from(u), *bits))
        }
        (Value::String(s), DynSolType::Uint(bits)) => {
            let u = U256::from_str(s).map_err(|e| format!("uint{bits} parse '{s}': {e}"))?;
            Ok(DynSolValue::Uint(u, *bits))
        }

        (Value::Number(n), DynSolType::Int(bits)) => {
            let i = n
                .as_i64()
                .ok_or_else(|| format!("int{bits}: {n} is not an integer"))?;
            Ok(DynSolValue::Int(I256::try_from(i).map_err(|e| e.to_string())?, *bits))
        }
        (Value::String(s), DynSolType::Int(bits)) => {
            let i = I256::from_str(s).map_err(|e| format!("int{bits} parse '{s}': {e}"))?;
            Ok(DynSolValue::Int(i, *bits))
        }

        (Value::String(s), DynSolType::Address) => {
            let addr = Address::from_str(s).map_err(|e| format!("address parse: {e}"))?;
            Ok(DynSolValue::Address(addr))
        }

        (Value::String(s), DynSolType::Bytes) => Ok(DynSolValue::Bytes(bytes(s)?)),

        (Value::String(s), DynSolType::FixedBytes(n)) => {
            let b = bytes(s)?;
            if b.len() > *n {
                return Err(format!("bytes{n}: got {} bytes", b.len()));
            }
            let mut word = [0u8; 32];
            word[..b.len()].copy_from_slice(&b);
            Ok(DynSolValue::FixedBytes(B256::from(word), *n))
        }

        (Value::String(s), DynSolType::String) => Ok(DynSolValue::String(s.clone())),

        (Value::Array(elems), DynSolType::Array(inner)) => {
            let dyn_elems: Result<Vec<_>, _> =
                elems.iter().map(|e| json_to_dyn_value(e, inner)).collect();
            Ok(DynSolValue::Array(dyn_elems?))
        }

        (Value::Array(elems), DynSolType::FixedArray(inner, len)) => {
            if elems.len() != *len {
                return Err(format!(
                    "fixed array length mismatch: expected {len}, got {}",
                    elems.len()
                ));
            }
            let dyn_elems: Result<Vec<_>, _> =
                elems.iter().map(|e| json_to_dyn_value(e, inner)).collect();
            Ok(DynSolValue::FixedArray(dyn_elems?))
        }

        (Value::Array(fields), DynSolType::Tuple(types)) => {
            if fields.len() != types.len() {
                return Err(format!(
                    "tuple arity mismatch: expected {}, got {}",
                    types.len(),
                    fields.len()
                ));
            }
            let dyn_elems: Result<Vec<_>, _> = fields
                .iter()
                .zip(types.iter())
                .map(|(v, t)| json_to_dyn_value(v, t))
                .collect();
            Ok(DynSolValue::Tuple(dyn_elems?))
        }

        _ => Err(format!("cannot convert {val} to {}", expected.sol_type_name())),
    }
}

fn bytes(s: &str) -> Result<Vec<u8>, String> {
    from_hex(s).map_err(|e| e.to_string())
}
