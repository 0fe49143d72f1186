//! The `Codec` trait: argument encoding and result decoding.
//!
//! Values cross the codec boundary as `serde_json::Value` with a fixed
//! convention that every implementation follows:
//!
//! | ABI type            | JSON value                                           |
//! |---------------------|------------------------------------------------------|
//! | `address`           | `"0x…"` string                                       |
//! | `bool`              | boolean                                              |
//! | `uintN` / `intN`    | number when it fits 64 bits, else decimal string     |
//! | `bytes` / `bytesN`  | `"0x…"` string                                       |
//! | `string`            | string                                               |
//! | arrays, tuples      | array (tuples positional)                            |
//!
//! When encoding, integers are also accepted as decimal or `0x` strings.

use serde_json::Value;

use crate::error::CallError;
use crate::schema::FunctionSchema;

/// Encodes call arguments and decodes call results for one schema family.
pub trait Codec: Send + Sync + 'static {
    /// Encode `args` into calldata (selector included) for `function`.
    fn encode(&self, function: &FunctionSchema, args: &[Value]) -> Result<Vec<u8>, CallError>;

    /// Decode the raw return data of `function` into its output values,
    /// one per declared output.
    fn decode(&self, function: &FunctionSchema, data: &[u8]) -> Result<Vec<Value>, CallError>;
}

/// `"0x…"` rendering of raw bytes.
pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Parse a `"0x…"` (or bare) hex string into bytes.
pub fn from_hex(s: &str) -> Result<Vec<u8>, CallError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| CallError::Codec(format!("bad hex '{s}': {e}")))
}
