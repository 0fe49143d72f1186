//! Per-tag notification broker: normalized tag → pending waiters.

use std::collections::HashMap;

use chaincall_core::{CallError, TagKey};
use tokio::sync::oneshot;

type Notifier = oneshot::Sender<Result<(), CallError>>;

/// Waiters parked on tags whose outcome is not recorded yet.
///
/// Every sender is consumed exactly once, by `resolve`, `reject` or
/// `reject_all`, or pruned once its receiver is dropped.
#[derive(Debug, Default)]
pub(crate) struct Broker {
    waiters: HashMap<TagKey, Vec<Notifier>>,
}

impl Broker {
    pub fn subscribe(&mut self, key: TagKey) -> oneshot::Receiver<Result<(), CallError>> {
        let (tx, rx) = oneshot::channel();
        let senders = self.waiters.entry(key).or_default();
        senders.retain(|tx| !tx.is_closed());
        senders.push(tx);
        rx
    }

    /// Forget waiters on `key` whose receiver was dropped.
    pub fn prune(&mut self, key: &TagKey) {
        if let Some(senders) = self.waiters.get_mut(key) {
            senders.retain(|tx| !tx.is_closed());
            if senders.is_empty() {
                self.waiters.remove(key);
            }
        }
    }

    pub fn resolve(&mut self, key: &TagKey) {
        for tx in self.waiters.remove(key).unwrap_or_default() {
            let _ = tx.send(Ok(()));
        }
    }

    pub fn reject(&mut self, key: &TagKey, err: &CallError) {
        for tx in self.waiters.remove(key).unwrap_or_default() {
            let _ = tx.send(Err(err.clone()));
        }
    }

    pub fn reject_all(&mut self, err: &CallError) {
        for (_, senders) in self.waiters.drain() {
            for tx in senders {
                let _ = tx.send(Err(err.clone()));
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.waiters.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaincall_core::Tag;

    #[tokio::test]
    async fn resolve_and_reject_consume_waiters() {
        let mut broker = Broker::default();
        let a = Tag::from("a").normalize();
        let b = Tag::from("b").normalize();

        let ra1 = broker.subscribe(a.clone());
        let ra2 = broker.subscribe(a.clone());
        let rb = broker.subscribe(b.clone());
        assert_eq!(broker.pending(), 3);

        broker.resolve(&a);
        broker.reject(&b, &CallError::aborted("stop"));
        assert_eq!(broker.pending(), 0);

        assert!(ra1.await.unwrap().is_ok());
        assert!(ra2.await.unwrap().is_ok());
        assert!(rb.await.unwrap().unwrap_err().is_abort());
    }

    #[test]
    fn prune_forgets_dropped_receivers_only() {
        let mut broker = Broker::default();
        let key = Tag::from("k").normalize();
        drop(broker.subscribe(key.clone()));
        let live = broker.subscribe(key.clone());
        assert_eq!(broker.pending(), 1);

        drop(live);
        broker.prune(&key);
        assert_eq!(broker.pending(), 0);
    }

    #[test]
    fn dropped_receivers_are_ignored() {
        let mut broker = Broker::default();
        let key = Tag::from(1).normalize();
        drop(broker.subscribe(key.clone()));
        broker.reject_all(&CallError::ResultNotFound);
        assert_eq!(broker.pending(), 0);
    }
}
