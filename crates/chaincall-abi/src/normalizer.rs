//! Converts alloy-core `DynSolValue` → JSON result values.

use alloy_core::dyn_abi::DynSolValue;
use chaincall_core::codec::to_hex;
use serde_json::Value;

/// Convert a decoded `DynSolValue` into its JSON form.
pub fn normalize(val: DynSolValue) -> Value {
    match val {
        DynSolValue::Bool(b) => Value::Bool(b),

        // Numbers that fit 64 bits stay numbers, anything wider is a decimal string
        DynSolValue::Int(i, _bits) => match i64::try_from(i) {
            Ok(v) => Value::from(v),
            Err(_) => Value::String(i.to_string()),
        },
        DynSolValue::Uint(u, _bits) => match u64::try_from(u) {
            Ok(v) => Value::from(v),
            Err(_) => Value::String(u.to_string()),
        },

        DynSolValue::FixedBytes(word, size) => Value::String(to_hex(&word[..size])),

        DynSolValue::Bytes(b) => Value::String(to_hex(&b)),

        DynSolValue::String(s) => Value::String(s),

        // EIP-55 checksum encoding
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) | DynSolValue::Tuple(vals) => {
            Value::Array(vals.into_iter().map(normalize).collect())
        }

        DynSolValue::Function(f) => Value::String(to_hex(f.as_slice())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use serde_json::json;

    #[test]
    fn normalize_uint_small_and_large() {
        assert_eq!(normalize(DynSolValue::Uint(U256::from(42u64), 256)), json!(42));
        assert_eq!(
            normalize(DynSolValue::Uint(U256::MAX, 256)),
            json!(U256::MAX.to_string())
        );
    }

    #[test]
    fn normalize_address_is_checksummed() {
        let addr: Address = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045".parse().unwrap();
        assert_eq!(
            normalize(DynSolValue::Address(addr)),
            json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
        );
    }

    #[test]
    fn tuples_are_positional() {
        let v = DynSolValue::Tuple(vec![
            DynSolValue::Bool(true),
            DynSolValue::Bytes(vec![0x01, 0x02]),
        ]);
        assert_eq!(normalize(v), json!([true, "0x0102"]));
    }
}
