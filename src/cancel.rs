//! Shared cancellation signal observed at every blocking point of the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Cloneable handle to a one-shot cancellation signal.
///
/// The listener channel never carries a message; it becomes ready (disconnected) once
/// [`CancelToken::cancel`] drops the only sender, which lets blocking channel operations
/// wait on it through `crossbeam_channel::select!`.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    listener: Receiver<()>,
}

impl CancelToken {
    /// Creates a token in the non-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        let (trigger, listener) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                listener,
            }),
        }
    }

    /// Broadcasts cancellation to every holder of the token. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let mut trigger = match self.inner.trigger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        trigger.take();
    }

    /// Returns true once [`CancelToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Channel that becomes ready when the token is cancelled.
    #[must_use]
    pub fn listener(&self) -> &Receiver<()> {
        &self.inner.listener
    }

    /// Returns a guard that cancels the token if the owning thread unwinds.
    #[must_use]
    pub fn cancel_on_panic(&self) -> PanicGuard<'_> {
        PanicGuard { token: self }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop guard returned by [`CancelToken::cancel_on_panic`].
#[derive(Debug)]
pub struct PanicGuard<'a> {
    token: &'a CancelToken,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::select;
    use std::time::Duration;

    #[test]
    fn listener_becomes_ready_after_cancel() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token
            .listener()
            .recv_timeout(Duration::from_millis(10))
            .is_err_and(|err| err.is_timeout()));

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.listener().recv().is_err());
    }

    #[test]
    fn cancel_unblocks_a_pending_receive() {
        let token = CancelToken::new();
        let (_tx, rx) = bounded::<u32>(1);
        let waiter = token.clone();
        let handle = thread::spawn(move || {
            select! {
                recv(rx) -> _ => false,
                recv(waiter.listener()) -> _ => true,
            }
        });
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(handle.join().expect("waiter thread"));
    }

    #[test]
    fn panic_guard_cancels_on_unwind() {
        let token = CancelToken::new();
        let inner = token.clone();
        let result = thread::spawn(move || {
            let _guard = inner.cancel_on_panic();
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert!(token.is_cancelled());
    }

    #[test]
    fn panic_guard_is_inert_on_normal_exit() {
        let token = CancelToken::new();
        {
            let _guard = token.cancel_on_panic();
        }
        assert!(!token.is_cancelled());
    }
}
