//! Per-call results: what a dispatcher returns and what a batch records.

use chaincall_core::{codec::to_hex, TxHandle, TxReceipt};
use serde_json::Value;

/// Result of dispatching one call: decoded return data for static calls,
/// a submission handle for mutable ones.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    Value(Value),
    Tx(TxHandle),
}

impl CallOutput {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Tx(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Tx(_) => None,
        }
    }

    pub fn into_tx(self) -> Option<TxHandle> {
        match self {
            Self::Tx(tx) => Some(tx),
            Self::Value(_) => None,
        }
    }
}

/// Undecoded per-tag payload as stored by a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    /// Return data (or revert data) of a static call.
    Bytes(Vec<u8>),
    /// Submission handle of the mutable chunk the call was part of.
    Tx(TxHandle),
    /// Receipt of the mutable chunk the call was part of.
    Receipt(TxReceipt),
    /// The aggregate returned no entry for this call.
    None,
}

impl RawOutcome {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// `"0x…"` of the stored bytes.
    pub fn hex(&self) -> Option<String> {
        self.bytes().map(to_hex)
    }

    pub fn tx(&self) -> Option<TxHandle> {
        match self {
            Self::Tx(tx) => Some(tx.clone()),
            Self::Receipt(r) => Some(TxHandle::new(r.transaction_hash.clone())),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            Self::Receipt(r) => Some(r),
            _ => None,
        }
    }
}

/// What `run()` recorded for one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub raw: RawOutcome,
}

impl ExecutionOutcome {
    pub fn new(success: bool, raw: RawOutcome) -> Self {
        Self { success, raw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipts_expose_their_transaction() {
        let raw = RawOutcome::Receipt(TxReceipt {
            transaction_hash: "0xabc".into(),
            block_number: Some(1),
            gas_used: 21_000,
            status: true,
        });
        assert_eq!(raw.tx(), Some(TxHandle::new("0xabc")));
        assert!(raw.bytes().is_none());
        assert_eq!(RawOutcome::Bytes(vec![1]).hex().as_deref(), Some("0x01"));
    }
}
