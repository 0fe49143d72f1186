//! Priority submission: fee- and gas-bumped transactions.
//!
//! The transaction's fee caps and gas limit are the network's current values
//! multiplied by `multiplier` and rounded up. Gas is estimated as the signer;
//! `from` is stripped from the submitted request so the signer stamps its own
//! address.

use std::time::Duration;

use chaincall_core::{
    signal::{check_signals, race_with_signals, timeout_signal},
    CallError, FeeData, PriorityOptions, Provider, Signer, TxHandle, TxRequest,
};

/// Submit `tx` through `signer` with bumped fee and gas parameters.
///
/// `default_multiplier` applies when `options.multiplier` is unset. Every
/// step checks `options.signals` (plus a timeout signal when
/// `options.timeout_ms` is set) before touching the network.
pub async fn priority_call(
    provider: &dyn Provider,
    signer: &dyn Signer,
    mut tx: TxRequest,
    options: &PriorityOptions,
    default_multiplier: f64,
) -> Result<TxHandle, CallError> {
    let multiplier = options.multiplier.unwrap_or(default_multiplier);
    let mut signals = options.signals.clone();
    if let Some(ms) = options.timeout_ms {
        signals.push(timeout_signal(Duration::from_millis(ms)));
    }

    check_signals(&signals)?;
    let estimate_tx = TxRequest {
        from: Some(signer.address().to_string()).filter(|a| !a.is_empty()),
        ..tx.clone()
    };
    let (fee_data, gas_limit) =
        gather_original_data(provider, &estimate_tx, options.asynchronous, &signals).await?;

    tx.max_fee_per_gas = Some(bump(fee_data.max_fee_per_gas, multiplier));
    tx.max_priority_fee_per_gas = Some(bump(fee_data.max_priority_fee_per_gas, multiplier));
    tx.gas_limit = Some(bump(gas_limit, multiplier));
    tx.from = None;

    if options.provide_chain_id {
        check_signals(&signals)?;
        tx.chain_id = Some(race_with_signals(provider.chain_id(), &signals).await?);
    } else if let Some(chain_id) = options.chain_id {
        tx.chain_id = Some(chain_id);
    }

    tracing::debug!(
        multiplier,
        gas_limit = ?tx.gas_limit,
        max_fee_per_gas = ?tx.max_fee_per_gas,
        chain_id = ?tx.chain_id,
        "submitting priority transaction"
    );

    check_signals(&signals)?;
    race_with_signals(signer.send_transaction(tx), &signals).await
}

async fn gather_original_data(
    provider: &dyn Provider,
    tx: &TxRequest,
    asynchronous: bool,
    signals: &[chaincall_core::AbortSignal],
) -> Result<(FeeData, u128), CallError> {
    if asynchronous {
        return race_with_signals(
            futures::future::try_join(provider.fee_data(), provider.estimate_gas(tx)),
            signals,
        )
        .await;
    }
    let fee_data = race_with_signals(provider.fee_data(), signals).await?;
    check_signals(signals)?;
    let gas_limit = race_with_signals(provider.estimate_gas(tx), signals).await?;
    Ok((fee_data, gas_limit))
}

/// `ceil(multiplier × value)`.
pub fn bump(value: u128, multiplier: f64) -> u128 {
    (value as f64 * multiplier).ceil() as u128
}
