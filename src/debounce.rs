//! Cancel-and-reschedule debounce utility.
//!
//! Contract: last write wins within the debounce window. Each
//! `schedule` call aborts whatever was pending and arms a fresh timer,
//! so a burst of triggers runs the task once, for the final state.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Debounces a unit of async work behind a fixed delay.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer with `task`, cancelling any pending run.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Drop whatever is pending without running it. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// True while a scheduled run has neither fired nor been cancelled.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for value in 1..=3 {
            let fired = Arc::clone(&fired);
            debouncer.schedule(async move {
                fired.store(value, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        tokio::time::advance(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;

        // Only the final schedule ran.
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        {
            let fired = Arc::clone(&fired);
            debouncer.schedule(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        debouncer.cancel();
        debouncer.cancel(); // idempotent

        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(200));

        {
            let fired = Arc::clone(&fired);
            debouncer.schedule(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        // Let the spawned task register its timer before advancing.
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
