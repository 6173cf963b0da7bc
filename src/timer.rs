//! Cancellable one-shot timer.
//!
//! Arming returns an opaque handle; canceling is idempotent and safe after
//! the timer has already fired or the handle was never armed. A canceled
//! timer's callback does not run.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Handle to an armed timer. Dropping the handle cancels the timer too.
pub(crate) struct TimerHandle {
    cancel: mpsc::Sender<()>,
}

impl TimerHandle {
    /// Cancels the timer. A timer that has not yet fired will not fire.
    pub(crate) fn cancel(&self) {
        let _ = self.cancel.send(());
    }
}

/// Arms a one-shot timer that runs `callback` after `delay` unless canceled.
pub(crate) fn schedule<F>(delay: Duration, callback: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    // detached; the thread exits on fire or cancel
    let _ = thread::spawn(move || match rx.recv_timeout(delay) {
        Err(RecvTimeoutError::Timeout) => callback(),
        // cancel signal or handle dropped
        Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
    });

    TimerHandle { cancel: tx }
}
