//! Per-path reader/writer lock: FIFO fairness with writer priority
//! (spec.md §4.4).
//!
//! Maintains `readers`, `writing` and `pending_writers` counters under
//! a short-held `tokio::sync::Mutex`, and wakes waiters through a
//! `tokio::sync::Notify`. Every wait loop re-registers interest with
//! `Notified::enable()` before re-checking the condition, which is the
//! race-free pattern for condition variables built on `Notify`:
//! `notify_waiters()` only reaches waiters that are already
//! registered, so a waiter must enable itself before it re-reads state.

use tokio::sync::{Mutex, Notify};

#[derive(Default)]
struct State {
    readers: u64,
    writing: bool,
    pending_writers: u64,
}

/// A single path's reader/writer lock. Lazily created by the directory
/// tree on first use (spec.md §4.5); unique per path for the lifetime
/// of the process.
pub struct PathLock {
    state: Mutex<State>,
    notify: Notify,
}

impl Default for PathLock {
    fn default() -> Self {
        Self::new()
    }
}

impl PathLock {
    pub fn new() -> Self {
        PathLock { state: Mutex::new(State::default()), notify: Notify::new() }
    }

    /// Acquires the lock in the requested mode.
    pub async fn acquire(&self, exclusive: bool) {
        if exclusive {
            self.acquire_exclusive().await;
        } else {
            self.acquire_shared().await;
        }
    }

    /// Releases a lock previously acquired in the given mode. Must
    /// mirror a prior `acquire` of the same mode; need not run on the
    /// same task.
    pub async fn release(&self, exclusive: bool) {
        if exclusive {
            self.release_exclusive().await;
        } else {
            self.release_shared().await;
        }
    }

    async fn acquire_shared(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if !state.writing && state.pending_writers == 0 {
                    state.readers += 1;
                    return;
                }
            }

            notified.await;
        }
    }

    async fn acquire_exclusive(&self) {
        {
            let mut state = self.state.lock().await;
            state.pending_writers += 1;
        }

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if !state.writing && state.readers == 0 {
                    state.pending_writers -= 1;
                    state.writing = true;
                    return;
                }
            }

            notified.await;
        }
    }

    async fn release_shared(&self) {
        {
            let mut state = self.state.lock().await;
            debug_assert!(state.readers > 0, "release_shared without a matching acquire");
            state.readers = state.readers.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    async fn release_exclusive(&self) {
        {
            let mut state = self.state.lock().await;
            debug_assert!(state.writing, "release_exclusive without a matching acquire");
            state.writing = false;
        }
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn shared_locks_are_concurrent() {
        let lock = Arc::new(PathLock::new());
        lock.acquire(false).await;
        lock.acquire(false).await;
        // Both shared acquisitions succeeded without blocking each other.
        lock.release(false).await;
        lock.release(false).await;
    }

    #[tokio::test]
    async fn exclusive_excludes_shared() {
        let lock = Arc::new(PathLock::new());
        lock.acquire(true).await;

        let lock2 = Arc::clone(&lock);
        let order = Arc::new(AtomicUsize::new(0));
        let order2 = Arc::clone(&order);
        let handle = tokio::spawn(async move {
            lock2.acquire(false).await;
            order2.fetch_add(1, Ordering::SeqCst);
            lock2.release(false).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(order.load(Ordering::SeqCst), 0, "reader must wait for the writer");
        lock.release(true).await;
        handle.await.unwrap();
        assert_eq!(order.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writer_priority_blocks_late_readers() {
        let lock = Arc::new(PathLock::new());
        lock.acquire(false).await; // reader 1 holds the lock

        let events = Arc::new(Mutex::new(Vec::<&'static str>::new()));

        // A writer queues while the lock is held shared.
        let writer_lock = Arc::clone(&lock);
        let writer_events = Arc::clone(&events);
        let writer = tokio::spawn(async move {
            writer_lock.acquire(true).await;
            writer_events.lock().await.push("writer");
            writer_lock.release(true).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A second reader arrives after the writer is already queued:
        // it must wait behind the writer even though the lock is
        // currently held shared.
        let reader_lock = Arc::clone(&lock);
        let reader_events = Arc::clone(&events);
        let reader = tokio::spawn(async move {
            reader_lock.acquire(false).await;
            reader_events.lock().await.push("reader");
            reader_lock.release(false).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(events.lock().await.is_empty(), "neither waiter should proceed yet");
        lock.release(false).await; // reader 1 releases

        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(*events.lock().await, vec!["writer", "reader"]);
    }
}
