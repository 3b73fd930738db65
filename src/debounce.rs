//! Trailing-edge debounce for the search input.
//!
//! Collapses a burst of keystrokes into a single dispatch: a timer is armed
//! on every input and cancelled by the next one, so only the final text of a
//! burst fires after the quiet period. Firings carry a sequence number that
//! the consumer checks against [`Debouncer::is_current`], covering the
//! window where an aborted timer's message was already in flight.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

/// A debounce timer that elapsed without being superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceFired {
    pub seq: u64,
    pub text: String,
}

/// Trailing-edge debouncer. No leading-edge fire: the first keystroke of a
/// burst never dispatches immediately.
pub struct Debouncer {
    delay: Duration,
    seq: u64,
    pending: Option<AbortHandle>,
    tx: mpsc::UnboundedSender<DebounceFired>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<DebounceFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                seq: 0,
                pending: None,
                tx,
            },
            rx,
        )
    }

    /// Record a keystroke. Resets the pending timer; arms a new one unless
    /// the text is empty (empty input is the caller's synchronous clear
    /// path, never a dispatch).
    pub fn on_input(&mut self, text: &str) {
        self.cancel();
        if text.is_empty() {
            return;
        }

        self.seq += 1;
        let seq = self.seq;
        let delay = self.delay;
        let tx = self.tx.clone();
        let text = text.to_owned();

        debug!(seq, text = %text, delay_ms = delay.as_millis(), "Arming debounce timer");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(DebounceFired { seq, text });
        });
        self.pending = Some(handle.abort_handle());
    }

    /// Drop the pending timer and invalidate any firing already in flight.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.seq += 1;
    }

    /// Whether a firing with this sequence number is still the latest input.
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_final_text() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(300));

        debouncer.on_input("L");
        debouncer.on_input("La");
        debouncer.on_input("Lag");

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.text, "Lag");
        assert!(debouncer.is_current(fired.seq));

        // Let any stray timers run out; nothing else may fire.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_never_arms_timer() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(300));

        debouncer.on_input("");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_cancels_pending_burst() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(300));

        debouncer.on_input("Lag");
        debouncer.on_input("");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_invalidates_in_flight_firing() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(300));

        debouncer.on_input("Lag");
        let armed_seq = {
            // The fired seq will equal the debouncer's current seq until
            // something else advances it.
            tokio::time::sleep(Duration::from_millis(301)).await;
            rx.recv().await.unwrap().seq
        };
        assert!(debouncer.is_current(armed_seq));

        debouncer.cancel();
        assert!(!debouncer.is_current(armed_seq));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(300));

        debouncer.on_input("Lag");
        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, "Lag");

        debouncer.on_input("Lagos");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.text, "Lagos");
        assert!(second.seq > first.seq);
    }
}
