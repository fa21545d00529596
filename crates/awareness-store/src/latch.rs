//! Single-fire signal used to coalesce concurrent loads of one record

use tokio::sync::watch;

/// Fires once with a value; any number of waiters observe it
pub(crate) struct Latch<T: Clone> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Latch<T> {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub(crate) fn waiter(&self) -> LatchWaiter<T> {
        LatchWaiter {
            rx: self.tx.subscribe(),
        }
    }

    /// Release every current and future waiter with `value`
    pub(crate) fn fire(self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

pub(crate) struct LatchWaiter<T: Clone> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> LatchWaiter<T> {
    /// Wait for the latch to fire
    ///
    /// Returns `None` if the latch was dropped without firing.
    pub(crate) async fn wait(mut self) -> Option<T> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        }
    }
}
