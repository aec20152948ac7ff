// One-shot waiter list backing long-polling

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::time::{Duration, Sleep};

/// How a [`WaitHandle`] resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Notified,
    TimedOut,
}

/// Registered waiters. `notify_all` drains the list under the lock, so a waiter is
/// either taken by that drain (and released) or registered after it (and untouched).
#[derive(Debug, Default)]
pub(crate) struct WaitList {
    waiters: Mutex<Vec<oneshot::Sender<()>>>,
}

impl WaitList {
    pub(crate) fn register(&self, timeout: Duration) -> WaitHandle {
        let (tx, rx) = oneshot::channel();
        {
            let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
            // Handles that already resolved by timeout and were dropped.
            waiters.retain(|w| !w.is_closed());
            waiters.push(tx);
        }
        WaitHandle {
            rx,
            sleep: Box::pin(tokio::time::sleep(timeout)),
        }
    }

    pub(crate) fn notify_all(&self) -> usize {
        let drained = {
            let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *waiters)
        };
        drained.into_iter().filter(|tx| !tx.is_closed()).fold(0, |n, tx| {
            if tx.send(()).is_ok() { n + 1 } else { n }
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Resolves on the next broadcast or when its timeout elapses, whichever is first.
///
/// Must be created inside a Tokio runtime (it owns a timer).
#[derive(Debug)]
#[must_use = "a wait handle does nothing unless awaited"]
pub struct WaitHandle {
    rx: oneshot::Receiver<()>,
    sleep: Pin<Box<Sleep>>,
}

impl Future for WaitHandle {
    type Output = WaitOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        // A dropped sender means the store itself is gone; release the waiter.
        if Pin::new(&mut this.rx).poll(cx).is_ready() {
            return Poll::Ready(WaitOutcome::Notified);
        }
        if this.sleep.as_mut().poll(cx).is_ready() {
            return Poll::Ready(WaitOutcome::TimedOut);
        }
        Poll::Pending
    }
}
