//! Scoped Timers
//!
//! A [`TickGuard`] owns a spawned timer task and aborts it when dropped.
//! Replacing or clearing the guard is the only way to stop a timer, so a
//! phase transition can never leave a stale ticker running.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Handle to a running timer task. Dropping it cancels the task.
#[derive(Debug, Default)]
pub struct TickGuard {
    handle: Option<JoinHandle<()>>,
}

impl TickGuard {
    /// Call `on_tick` every `period` until it returns `false` or the guard drops.
    ///
    /// The first call happens one full period after spawning.
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval fires immediately; skip that one
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !on_tick() {
                    break;
                }
            }
        });
        Self { handle: Some(handle) }
    }

    /// Call `fire` once after `delay` unless the guard drops first.
    pub fn once<F>(delay: Duration, fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            fire();
        });
        Self { handle: Some(handle) }
    }

    /// Guard with no task behind it.
    pub fn inert() -> Self {
        Self { handle: None }
    }

    /// Task still scheduled or running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_spawn_ticks_until_dropped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let guard = TickGuard::spawn(Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert!(guard.is_active());

        sleep(Duration::from_millis(60)).await;
        drop(guard);
        let after_drop = count.load(Ordering::SeqCst);
        assert!(after_drop >= 1);

        sleep(Duration::from_millis(40)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_spawn_stops_when_callback_declines() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let guard = TickGuard::spawn(Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst) < 2
        });

        sleep(Duration::from_millis(80)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!guard.is_active());
    }

    #[tokio::test]
    async fn test_once_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let _guard = TickGuard::once(Duration::from_millis(10), move || {
            flag.store(true, Ordering::SeqCst);
        });

        sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_once_cancelled_by_drop() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let guard = TickGuard::once(Duration::from_millis(30), move || {
            flag.store(true, Ordering::SeqCst);
        });
        drop(guard);

        sleep(Duration::from_millis(60)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_inert_guard() {
        let guard = TickGuard::inert();
        assert!(!guard.is_active());
    }
}
