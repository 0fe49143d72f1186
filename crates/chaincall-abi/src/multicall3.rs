//! Multicall3 interface: the `aggregate3` entry point batches run through.
//!
//! `aggregate3` takes `(address target, bool allowFailure, bytes callData)[]`
//! and returns `(bool success, bytes returnData)[]`. It is declared payable
//! so the same fragment serves both static and state-changing batches.

use serde_json::{json, Value};

/// Name of the aggregate entry point.
pub const AGGREGATE3: &str = "aggregate3";

pub const MULTICALL3_ABI: &str = r#"[
    {
        "name": "aggregate3",
        "type": "function",
        "inputs": [
            {
                "name": "calls",
                "type": "tuple[]",
                "components": [
                    {"name": "target", "type": "address"},
                    {"name": "allowFailure", "type": "bool"},
                    {"name": "callData", "type": "bytes"}
                ]
            }
        ],
        "outputs": [
            {
                "name": "returnData",
                "type": "tuple[]",
                "components": [
                    {"name": "success", "type": "bool"},
                    {"name": "returnData", "type": "bytes"}
                ]
            }
        ],
        "stateMutability": "payable"
    }
]"#;

/// One `aggregate3` input entry in the codec's JSON convention.
pub fn call3(target: &str, allow_failure: bool, call_data_hex: &str) -> Value {
    json!([target, allow_failure, call_data_hex])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AbiCodec;
    use alloy_core::dyn_abi::DynSolValue;
    use chaincall_core::{codec::Codec, schema::SchemaRegistry};

    #[test]
    fn aggregate3_encodes_and_decodes() {
        let schema = crate::parse_abi(MULTICALL3_ABI).unwrap();
        let agg = schema.require(AGGREGATE3).unwrap();

        let calldata = AbiCodec
            .encode(
                agg,
                &[json!([
                    call3("0x0000000000000000000000000000000000000001", true, "0x1234"),
                    call3("0x0000000000000000000000000000000000000002", false, "0x"),
                ])],
            )
            .unwrap();
        // aggregate3((address,bool,bytes)[]) = 0x82ad56cb
        assert_eq!(hex::encode(&calldata[..4]), "82ad56cb");

        let returned = DynSolValue::Tuple(vec![DynSolValue::Array(vec![
            DynSolValue::Tuple(vec![DynSolValue::Bool(true), DynSolValue::Bytes(vec![0xaa])]),
            DynSolValue::Tuple(vec![DynSolValue::Bool(false), DynSolValue::Bytes(vec![])]),
        ])])
        .abi_encode_params();
        let decoded = agg.shape_outputs(AbiCodec.decode(agg, &returned).unwrap());
        assert_eq!(decoded, json!([[true, "0xaa"], [false, "0x"]]));
    }
}
