use std::time::Duration;

use chaincall_core::{CallError, Provider};

/// Default poll interval of [`wait_for_address_txs`].
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(1000);

/// Block until every transaction sent from `address` has been mined, i.e.
/// the pending nonce no longer runs ahead of the latest one.
///
/// Sleeps `delay` between polls (including before the first one).
pub async fn wait_for_address_txs(
    provider: &dyn Provider,
    address: &str,
    delay: Option<Duration>,
) -> Result<(), CallError> {
    let delay = delay.unwrap_or(DEFAULT_POLL_DELAY);
    loop {
        tokio::time::sleep(delay).await;
        let pending = provider.transaction_count(address, true).await?;
        let latest = provider.transaction_count(address, false).await?;
        if pending <= latest {
            return Ok(());
        }
        tracing::trace!(address, pending, latest, "waiting for in-flight transactions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chaincall_core::{FeeData, TxHandle, TxReceipt, TxRequest};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Latest nonce catches up by one on every "latest" query.
    struct DrainingNode {
        pending: u64,
        latest: AtomicU64,
    }

    #[async_trait]
    impl Provider for DrainingNode {
        async fn call(&self, _tx: &TxRequest) -> Result<Vec<u8>, CallError> {
            Ok(vec![])
        }
        async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u128, CallError> {
            Ok(0)
        }
        async fn fee_data(&self) -> Result<FeeData, CallError> {
            Ok(FeeData::default())
        }
        async fn chain_id(&self) -> Result<u64, CallError> {
            Ok(1)
        }
        async fn wait_for_receipt(&self, _tx: &TxHandle) -> Result<Option<TxReceipt>, CallError> {
            Ok(None)
        }
        async fn transaction_count(&self, _address: &str, pending: bool) -> Result<u64, CallError> {
            if pending {
                Ok(self.pending)
            } else {
                Ok(self.latest.fetch_add(1, Ordering::SeqCst))
            }
        }
    }

    #[tokio::test]
    async fn returns_once_latest_catches_up() {
        let node = DrainingNode {
            pending: 3,
            latest: AtomicU64::new(0),
        };
        wait_for_address_txs(&node, "0x01", Some(Duration::from_millis(1)))
            .await
            .unwrap();
        // Polled latest = 0, 1, 2, 3.
        assert_eq!(node.latest.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn idle_address_returns_after_one_poll() {
        let node = DrainingNode {
            pending: 0,
            latest: AtomicU64::new(0),
        };
        wait_for_address_txs(&node, "0x01", Some(Duration::from_millis(1)))
            .await
            .unwrap();
        assert_eq!(node.latest.load(Ordering::SeqCst), 1);
    }
}
