//! Cooperative cancellation
//!
//! A [`CancelHandle`] flips a shared flag; every [`CancelSignal`] cloned from
//! it observes the flip. Cancelling only detaches local waits. Nothing is
//! sent to the remote service.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Creates a connected handle/signal pair
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// Creates a pair that also cancels on Ctrl-C when `on_signal` is set
///
/// Must be called inside a tokio runtime.
pub fn signal_pair(on_signal: bool) -> (CancelHandle, CancelSignal) {
    let (handle, signal) = cancel_pair();
    if on_signal {
        handle.cancel_on_ctrl_c();
    }
    (handle, signal)
}

/// Sending side of a cancellation channel
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation of every wait observing this handle
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns another signal bound to this handle
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancels when the process receives Ctrl-C
    ///
    /// The returned task ends after the first signal; abort it to stop
    /// listening.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, detaching from remote job");
                handle.cancel();
            }
        })
    }
}

/// Receiving side of a cancellation channel
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    ///
    /// Pends forever if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_reaches_every_signal() {
        let (handle, signal) = cancel_pair();
        let other = handle.signal();
        assert!(!signal.is_cancelled());

        handle.cancel();

        assert!(signal.is_cancelled());
        assert!(other.is_cancelled());
        assert!(handle.is_cancelled());
        signal.cancelled().await;
    }

    #[tokio::test]
    async fn test_signal_pair_without_ctrl_c_still_cancels() {
        let (handle, signal) = signal_pair(false);
        assert!(!signal.is_cancelled());

        handle.cancel();
        assert!(signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_does_not_fire() {
        let signal = CancelSignal::never();
        let fired = tokio::time::timeout(Duration::from_secs(3600), signal.cancelled()).await;
        assert!(fired.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wakes_waiter() {
        let (handle, signal) = cancel_pair();

        let waiter = tokio::spawn(async move { signal.cancelled().await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();

        waiter.await.unwrap();
    }
}
