//! Abort signals: explicit cancellation, timeouts and signal composition.
//!
//! An [`AbortSignal`] is a cheap, clonable view of an [`AbortController`].
//! Once a controller aborts, every clone of its signal observes the same
//! reason forever. A signal whose controller is dropped without aborting
//! never fires.
//!
//! Functions that spawn helper tasks ([`timeout_signal`], [`AbortSignal::any`])
//! must be called from within a Tokio runtime.

use std::future::Future;
use std::time::Duration;

use futures::future;
use tokio::sync::watch;

use crate::error::CallError;

/// Reason attached to signals created by [`timeout_signal`].
pub const TIMEOUT_REASON: &str = "Timeout exceeded";

const DEFAULT_REASON: &str = "Operation aborted";

/// The owning side of an abort signal.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<Option<String>>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// A signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Abort with `reason`. Only the first abort is recorded.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(move |current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn is_aborted(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// A cancellation signal that can be checked synchronously or awaited.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<Option<String>>,
}

impl AbortSignal {
    /// Returns `true` once the controller has aborted.
    pub fn is_aborted(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The abort reason, if aborted.
    pub fn reason(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// `Err(Aborted)` if the signal has already fired.
    pub fn throw_if_aborted(&self) -> Result<(), CallError> {
        match self.reason() {
            Some(reason) => Err(CallError::aborted(reason)),
            None => Ok(()),
        }
    }

    /// Resolves with an `Aborted` error when the signal fires.
    ///
    /// Never resolves if the controller is dropped without aborting.
    pub async fn aborted(&self) -> CallError {
        CallError::aborted(self.wait_reason().await)
    }

    async fn wait_reason(&self) -> String {
        let mut rx = self.rx.clone();
        let reason = match rx.wait_for(|r| r.is_some()).await {
            Ok(current) => current.clone(),
            Err(_) => None,
        };
        match reason {
            Some(reason) => reason,
            None => future::pending().await,
        }
    }

    /// A signal that fires as soon as any of `signals` fires, carrying that
    /// signal's reason. An empty slice yields a signal that never fires.
    pub fn any(signals: &[AbortSignal]) -> AbortSignal {
        let controller = AbortController::new();
        let signal = controller.signal();

        if let Some(reason) = signals.iter().find_map(AbortSignal::reason) {
            controller.abort(reason);
            return signal;
        }
        if signals.is_empty() {
            return signal;
        }

        let inputs = signals.to_vec();
        tokio::spawn(async move {
            tokio::select! {
                reason = first_reason(&inputs) => controller.abort(reason),
                _ = controller.tx.closed() => {}
            }
        });
        signal
    }
}

/// A signal that aborts with [`TIMEOUT_REASON`] after `duration`.
pub fn timeout_signal(duration: Duration) -> AbortSignal {
    let controller = AbortController::new();
    let signal = controller.signal();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(duration) => controller.abort(TIMEOUT_REASON),
            // Every observer is gone; nothing left to notify.
            _ = controller.tx.closed() => {}
        }
    });
    signal
}

/// Fails with the first already-fired signal, if any.
pub fn check_signals(signals: &[AbortSignal]) -> Result<(), CallError> {
    signals.iter().try_for_each(AbortSignal::throw_if_aborted)
}

/// Drive `fut` to completion unless one of `signals` fires first.
///
/// Signals are checked before `fut` is first polled, so an already-aborted
/// signal rejects without starting the work.
pub async fn race_with_signals<F, T>(fut: F, signals: &[AbortSignal]) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    check_signals(signals)?;
    if signals.is_empty() {
        return fut.await;
    }
    tokio::select! {
        biased;
        reason = first_reason(signals) => Err(CallError::aborted(reason)),
        res = fut => res,
    }
}

/// Sleep for `duration`, rejecting early if any of `signals` fires.
pub async fn wait_with_signals(duration: Duration, signals: &[AbortSignal]) -> Result<(), CallError> {
    race_with_signals(
        async {
            tokio::time::sleep(duration).await;
            Ok(())
        },
        signals,
    )
    .await
}

async fn first_reason(signals: &[AbortSignal]) -> String {
    if signals.is_empty() {
        return future::pending().await;
    }
    let waits = signals.iter().map(|s| Box::pin(s.wait_reason()));
    let (reason, _, _) = future::select_all(waits).await;
    if reason.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_records_first_reason_only() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());
        controller.abort("first");
        controller.abort("second");
        assert_eq!(signal.reason().as_deref(), Some("first"));
        assert!(controller.is_aborted());
    }

    #[test]
    fn check_signals_fails_on_fired_signal() {
        let idle = AbortController::new();
        let fired = AbortController::new();
        fired.abort("stop");
        assert!(check_signals(&[idle.signal()]).is_ok());
        let err = check_signals(&[idle.signal(), fired.signal()]).unwrap_err();
        assert_eq!(err, CallError::aborted("stop"));
    }

    #[tokio::test]
    async fn race_rejects_before_polling_when_already_aborted() {
        let controller = AbortController::new();
        controller.abort("early");
        let polled = std::sync::atomic::AtomicBool::new(false);
        let res = race_with_signals(
            async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, CallError>(1)
            },
            &[controller.signal()],
        )
        .await;
        assert!(res.unwrap_err().is_abort());
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn race_rejects_when_signal_fires_mid_flight() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let handle = tokio::spawn(async move {
            race_with_signals(
                async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, CallError>(())
                },
                &[signal],
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.abort("cancelled");
        let res = handle.await.unwrap();
        assert_eq!(res.unwrap_err(), CallError::aborted("cancelled"));
    }

    #[tokio::test]
    async fn race_without_signals_passes_through() {
        let res = race_with_signals(async { Ok::<_, CallError>(7) }, &[]).await;
        assert_eq!(res.unwrap(), 7);
    }

    #[tokio::test]
    async fn timeout_signal_fires() {
        let signal = timeout_signal(Duration::from_millis(5));
        let err = signal.aborted().await;
        assert_eq!(err, CallError::aborted(TIMEOUT_REASON));
    }

    #[tokio::test]
    async fn any_follows_first_input() {
        let a = AbortController::new();
        let b = AbortController::new();
        let combined = AbortSignal::any(&[a.signal(), b.signal()]);
        assert!(!combined.is_aborted());
        b.abort("b fired");
        let err = combined.aborted().await;
        assert_eq!(err, CallError::aborted("b fired"));
    }

    #[tokio::test]
    async fn wait_with_signals_completes_or_aborts() {
        assert!(wait_with_signals(Duration::from_millis(1), &[]).await.is_ok());

        let timeout = timeout_signal(Duration::from_millis(5));
        let err = wait_with_signals(Duration::from_secs(30), &[timeout])
            .await
            .unwrap_err();
        assert!(err.is_abort());
    }
}
