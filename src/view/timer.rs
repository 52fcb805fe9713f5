//! Fire-once deferred reset. The callback is a message on a channel owned by
//! the view's event loop; a cancelled, re-armed or dropped timer never delivers
//! a message that the view will act on.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expired {
    pub generation: u64,
}

pub struct AutoReset {
    tx: mpsc::Sender<Expired>,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl AutoReset {
    pub fn new(tx: mpsc::Sender<Expired>) -> Self {
        Self { tx, generation: 0, handle: None }
    }

    /// Schedule expiry after `after`, replacing any pending schedule.
    /// Must be called inside a tokio runtime.
    pub fn arm(&mut self, after: Duration) -> u64 {
        self.cancel();
        let generation = self.generation;
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the view was torn down; nothing to do.
            let _ = tx.send(Expired { generation }).await;
        }));
        generation
    }

    /// Abort the pending task and invalidate anything it may already have sent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    /// True when `expired` belongs to the current schedule. Consumes the schedule.
    pub fn accept(&mut self, expired: Expired) -> bool {
        if self.handle.is_some() && expired.generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for AutoReset {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_once_after_delay() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = AutoReset::new(tx);
        timer.arm(Duration::from_millis(20));
        assert!(timer.is_armed());

        let expired = rx.recv().await.unwrap();
        assert!(timer.accept(expired));
        assert!(!timer.is_armed());
        assert!(!timer.accept(expired), "a second delivery is stale");
    }

    #[tokio::test]
    async fn rearming_makes_the_old_schedule_stale() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = AutoReset::new(tx);
        let first = timer.arm(Duration::from_millis(5));
        let second = timer.arm(Duration::from_millis(30));
        assert_ne!(first, second);

        let expired = rx.recv().await.unwrap();
        assert_eq!(expired.generation, second);
        assert!(!timer.accept(Expired { generation: first }));
        assert!(timer.accept(expired));
    }

    #[tokio::test]
    async fn dropping_the_owner_cancels_delivery() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = AutoReset::new(tx);
        timer.arm(Duration::from_millis(10));
        drop(timer);

        let outcome = tokio::time::timeout(Duration::from_millis(60), rx.recv()).await;
        // All senders are gone once the aborted task is dropped.
        assert!(matches!(outcome, Ok(None)) || outcome.is_err());
    }

    #[tokio::test]
    async fn cancel_ignores_a_message_already_in_flight() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = AutoReset::new(tx);
        timer.arm(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(30)).await;
        timer.cancel();

        let expired = rx.recv().await.unwrap();
        assert!(!timer.accept(expired));
    }
}
