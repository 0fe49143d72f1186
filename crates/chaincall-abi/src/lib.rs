//! # chaincall-abi
//!
//! EVM ABI support for ChainCall, built on alloy-rs.
//!
//! - [`parse_abi`] turns standard ABI JSON into a [`ContractSchema`](chaincall_core::ContractSchema)
//! - [`AbiCodec`] implements [`Codec`](chaincall_core::Codec): JSON args → calldata, return data → JSON
//! - [`multicall3`] carries the `aggregate3` interface batches execute through

pub mod codec;
pub mod encoder;
pub mod multicall3;
pub mod normalizer;
pub mod schema;

pub use codec::AbiCodec;
pub use multicall3::{AGGREGATE3, MULTICALL3_ABI};
pub use schema::{parse_abi, schema_from_abi};
