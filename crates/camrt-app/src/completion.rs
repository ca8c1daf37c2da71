//! Completion handles for asynchronous lifecycle operations
//!
//! A [`Completion`] is the read side of a value that gets produced exactly
//! once. It can be waited on from a plain thread ([`Completion::wait`]), from
//! async code ([`Completion::wait_async`]), polled ([`Completion::try_get`]) or
//! given continuations ([`Completion::on_complete`]). Every clone observes the
//! same value. The write side is the [`Completer`].
//!
//! Handles carry the lifecycle epoch they were created in, so callers can tell
//! a handle of a previous configure/shutdown cycle from a current one.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::error;

type Continuation<T> = Box<dyn FnOnce(T) + Send + 'static>;

struct Slot<T> {
    value: Option<T>,
    continuations: Vec<Continuation<T>>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    cond: Condvar,
    notify: Notify,
}

/// Read side of a once-produced value
pub struct Completion<T> {
    epoch: u64,
    shared: Arc<Shared<T>>,
}

/// Write side of a [`Completion`]
pub struct Completer<T> {
    epoch: u64,
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> Completion<T> {
    /// Create a linked completer/completion pair for `epoch`
    pub fn pair(epoch: u64) -> (Completer<T>, Completion<T>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                value: None,
                continuations: Vec::new(),
            }),
            cond: Condvar::new(),
            notify: Notify::new(),
        });
        (
            Completer {
                epoch,
                shared: Arc::clone(&shared),
            },
            Completion { epoch, shared },
        )
    }

    /// A completion that already holds `value`
    pub fn completed(epoch: u64, value: T) -> Self {
        let (completer, completion) = Self::pair(epoch);
        completer.complete(value);
        completion
    }

    /// Epoch this handle was issued in
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_complete(&self) -> bool {
        self.shared.slot.lock().value.is_some()
    }

    /// Non-blocking poll
    pub fn try_get(&self) -> Option<T> {
        self.shared.slot.lock().value.clone()
    }

    /// Block the calling thread until the value is available
    ///
    /// Do not call this from inside an async task; use [`wait_async`](Self::wait_async).
    pub fn wait(&self) -> T {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.value.as_ref() {
                return value.clone();
            }
            self.shared.cond.wait(&mut slot);
        }
    }

    /// Block for at most `timeout`; `None` when the deadline passed first
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.value.as_ref() {
                return Some(value.clone());
            }
            if self
                .shared
                .cond
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return slot.value.clone();
            }
        }
    }

    /// Wait for the value without blocking the async runtime
    pub async fn wait_async(&self) -> T {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_get() {
                return value;
            }
            notified.await;
        }
    }

    /// Run `f` with the value once it is available
    ///
    /// Runs immediately on the calling thread when already complete, otherwise
    /// on the thread that completes the handle.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let ready = {
            let mut slot = self.shared.slot.lock();
            match slot.value.as_ref() {
                Some(value) => Some(value.clone()),
                None => {
                    slot.continuations.push(Box::new(f));
                    return;
                }
            }
        };
        if let Some(value) = ready {
            f(value);
        }
    }

    /// Whether both handles refer to the same underlying operation
    pub fn same_as(&self, other: &Completion<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone + Send + 'static> Completer<T> {
    /// Another read handle for this completer
    pub fn handle(&self) -> Completion<T> {
        Completion {
            epoch: self.epoch,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Store `value` and wake every waiter. Returns false if already completed.
    ///
    /// Continuations registered earlier run on this thread. A panicking
    /// continuation is logged and skipped; the remaining ones still run.
    pub fn complete(&self, value: T) -> bool {
        let continuations = {
            let mut slot = self.shared.slot.lock();
            if slot.value.is_some() {
                return false;
            }
            slot.value = Some(value.clone());
            std::mem::take(&mut slot.continuations)
        };

        self.shared.cond.notify_all();
        self.shared.notify.notify_waiters();
        for continuation in continuations {
            let value = value.clone();
            if catch_unwind(AssertUnwindSafe(move || continuation(value))).is_err() {
                error!(epoch = self.epoch, "Completion continuation panicked");
            }
        }
        true
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            epoch: self.epoch,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("epoch", &self.epoch)
            .field("complete", &self.shared.slot.lock().value.is_some())
            .finish()
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("epoch", &self.epoch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_completed_handle_is_ready() {
        let handle = Completion::completed(3, 7u32);
        assert!(handle.is_complete());
        assert_eq!(handle.try_get(), Some(7));
        assert_eq!(handle.wait(), 7);
        assert_eq!(handle.epoch(), 3);
    }

    #[test]
    fn test_complete_only_once() {
        let (completer, handle) = Completion::pair(0);
        assert!(completer.complete(1));
        assert!(!completer.complete(2));
        assert_eq!(handle.wait(), 1);
    }

    #[test]
    fn test_wait_blocks_until_completed_from_other_thread() {
        let (completer, handle) = Completion::<String>::pair(0);
        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            completer.complete("done".to_string());
        });

        assert_eq!(handle.wait(), "done");
        worker.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_expires() {
        let (_completer, handle) = Completion::<u8>::pair(0);
        assert_eq!(handle.wait_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_continuations_run_once_each() {
        let (completer, handle) = Completion::pair(0);
        let calls = Arc::new(AtomicUsize::new(0));

        let before = Arc::clone(&calls);
        handle.on_complete(move |v: usize| {
            before.fetch_add(v, Ordering::SeqCst);
        });
        completer.complete(10);

        let after = Arc::clone(&calls);
        handle.on_complete(move |v| {
            after.fetch_add(v, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_panicking_continuation_does_not_stop_others() {
        let (completer, handle) = Completion::pair(0);
        let calls = Arc::new(AtomicUsize::new(0));

        handle.on_complete(|_: usize| panic!("observer bug"));
        let counter = Arc::clone(&calls);
        handle.on_complete(move |v| {
            counter.fetch_add(v, Ordering::SeqCst);
        });

        assert!(completer.complete(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(handle.try_get(), Some(4));
    }

    #[test]
    fn test_clones_share_outcome() {
        let (completer, handle) = Completion::pair(0);
        let other = handle.clone();
        assert!(handle.same_as(&other));
        assert!(handle.same_as(&completer.handle()));
        assert!(!handle.same_as(&Completion::completed(0, 0u8)));

        completer.complete(5u8);
        assert_eq!(other.try_get(), Some(5));
    }

    #[tokio::test]
    async fn test_wait_async() {
        let (completer, handle) = Completion::pair(1);
        let waiter = tokio::spawn(async move { handle.wait_async().await });

        tokio::task::yield_now().await;
        completer.complete(99u64);

        assert_eq!(waiter.await.unwrap(), 99);
    }
}
